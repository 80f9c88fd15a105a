//! Question bank providers.
//!
//! A bank is validated once at the boundary, then shared read-only by every
//! session that draws from it.

mod remote;

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use exam_core::model::{Difficulty, Question, QuestionId, QuestionRecord};

use crate::error::BankError;

pub use remote::{RemoteBankConfig, RemoteSource};

//
// ─── BANK ──────────────────────────────────────────────────────────────────────
//

/// Immutable, cheaply clonable collection of validated questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    questions: Arc<[Question]>,
}

impl QuestionBank {
    /// Builds a bank from validated questions.
    ///
    /// An empty bank is allowed; selection simply yields nothing from it.
    ///
    /// # Errors
    ///
    /// Returns `BankError::DuplicateId` if two questions share an id.
    pub fn new(questions: Vec<Question>) -> Result<Self, BankError> {
        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(BankError::DuplicateId(question.id()));
            }
        }
        Ok(Self {
            questions: questions.into(),
        })
    }

    /// Validates wire records into a bank.
    ///
    /// # Errors
    ///
    /// Returns `BankError::Invalid` with the index of the first bad record,
    /// or `BankError::DuplicateId`.
    pub fn from_records(records: Vec<QuestionRecord>) -> Result<Self, BankError> {
        let questions = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                record
                    .into_question()
                    .map_err(|source| BankError::Invalid { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(questions)
    }

    /// Validates an already-parsed JSON array, one element at a time, so a
    /// malformed record is reported by position.
    ///
    /// # Errors
    ///
    /// Returns `BankError::Shape` for an element that is not a question
    /// record, plus everything `from_records` returns.
    pub fn from_values(values: Vec<serde_json::Value>) -> Result<Self, BankError> {
        let records = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                serde_json::from_value::<QuestionRecord>(value)
                    .map_err(|source| BankError::Shape { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_records(records)
    }

    /// Parses a JSON array of question records.
    ///
    /// # Errors
    ///
    /// Returns `BankError::Json` if the document is not a JSON array.
    pub fn from_json(json: &str) -> Result<Self, BankError> {
        let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
        Self::from_values(values)
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    /// Category labels in first-seen order.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.questions
            .iter()
            .filter_map(Question::category)
            .filter(|c| seen.insert(*c))
            .collect()
    }

    #[must_use]
    pub fn stats(&self) -> BankStats {
        let mut stats = BankStats {
            total: self.questions.len(),
            ..BankStats::default()
        };
        for question in self.questions.iter() {
            match question.difficulty() {
                Some(d) => *stats.by_difficulty.entry(d).or_default() += 1,
                None => stats.unrated += 1,
            }
            if let Some(category) = question.category() {
                *stats.by_category.entry(category.to_owned()).or_default() += 1;
            }
            if let Some(section) = question.section() {
                *stats.by_section.entry(section.to_owned()).or_default() += 1;
            }
        }
        stats
    }

    /// Logs the bank composition at `info`.
    pub fn log_stats(&self, name: &str) {
        let stats = self.stats();
        info!(
            bank = name,
            total = stats.total,
            basic = stats.count(Difficulty::Basic),
            intermediate = stats.count(Difficulty::Intermediate),
            advanced = stats.count(Difficulty::Advanced),
            categories = stats.by_category.len(),
            sections = stats.by_section.len(),
            "question bank loaded"
        );
        for (section, count) in &stats.by_section {
            debug!(bank = name, section = %section, count, "section distribution");
        }
    }
}

/// Composition of a bank by difficulty, category and section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankStats {
    pub total: usize,
    pub by_difficulty: BTreeMap<Difficulty, usize>,
    pub unrated: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_section: BTreeMap<String, usize>,
}

impl BankStats {
    #[must_use]
    pub fn count(&self, difficulty: Difficulty) -> usize {
        self.by_difficulty.get(&difficulty).copied().unwrap_or(0)
    }

    /// Share of the bank at `difficulty`, rounded to a whole percent.
    #[must_use]
    pub fn percentage(&self, difficulty: Difficulty) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = (200 * self.count(difficulty) + self.total) / (2 * self.total);
        u8::try_from(pct).unwrap_or(100)
    }
}

//
// ─── SOURCES ───────────────────────────────────────────────────────────────────
//

/// Anything that can produce a question bank.
///
/// Loading happens once, before a session starts; sessions never call back
/// into a source.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Load and validate the bank.
    ///
    /// # Errors
    ///
    /// Returns `BankError` if the bank cannot be fetched or fails validation.
    async fn load(&self) -> Result<QuestionBank, BankError>;
}

/// Bundled, in-memory bank.
#[derive(Debug, Clone)]
pub struct StaticSource {
    bank: QuestionBank,
}

impl StaticSource {
    #[must_use]
    pub fn new(bank: QuestionBank) -> Self {
        Self { bank }
    }

    /// # Errors
    ///
    /// Returns `BankError` if the bundled JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, BankError> {
        QuestionBank::from_json(json).map(Self::new)
    }
}

#[async_trait]
impl QuestionSource for StaticSource {
    async fn load(&self) -> Result<QuestionBank, BankError> {
        Ok(self.bank.clone())
    }
}

/// Tries `primary` and falls back to `fallback` on any error.
///
/// Typical use is a remote bank with the bundled copy behind it.
pub struct FallbackSource {
    primary: Arc<dyn QuestionSource>,
    fallback: Arc<dyn QuestionSource>,
}

impl FallbackSource {
    #[must_use]
    pub fn new(primary: Arc<dyn QuestionSource>, fallback: Arc<dyn QuestionSource>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl QuestionSource for FallbackSource {
    async fn load(&self) -> Result<QuestionBank, BankError> {
        match self.primary.load().await {
            Ok(bank) => Ok(bank),
            Err(err) => {
                warn!(error = %err, "primary question source failed, using fallback");
                self.fallback.load().await
            }
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: u64, category: &str, difficulty: Difficulty) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Q{id}"),
            vec!["a".into(), "b".into()],
            0,
            "",
        )
        .unwrap()
        .with_category(category)
        .with_difficulty(difficulty)
    }

    struct FailingSource;

    #[async_trait]
    impl QuestionSource for FailingSource {
        async fn load(&self) -> Result<QuestionBank, BankError> {
            Err(BankError::Disabled)
        }
    }

    #[test]
    fn bank_rejects_duplicate_ids() {
        let err = QuestionBank::new(vec![
            question(1, "A", Difficulty::Basic),
            question(1, "B", Difficulty::Basic),
        ])
        .unwrap_err();
        assert!(matches!(err, BankError::DuplicateId(id) if id == QuestionId::new(1)));
    }

    #[test]
    fn empty_bank_is_allowed() {
        let bank = QuestionBank::new(Vec::new()).unwrap();
        assert!(bank.is_empty());
        assert_eq!(bank.stats().percentage(Difficulty::Basic), 0);
    }

    #[test]
    fn from_json_reports_malformed_record_index() {
        let json = r#"[
            {"id": 1, "question": "Q1", "options": ["a", "b"], "correctAnswer": 0},
            {"id": 2, "question": "Q2", "options": ["a", "b"]}
        ]"#;
        let err = QuestionBank::from_json(json).unwrap_err();
        assert!(matches!(err, BankError::Shape { index: 1, .. }));
    }

    #[test]
    fn from_json_reports_invalid_record_index() {
        let json = r#"[
            {"id": 1, "question": "Q1", "options": ["a", "b"], "correctAnswer": 0},
            {"id": 2, "question": "Q2", "options": ["a", "b"], "correctAnswer": 0},
            {"id": 3, "question": "Q3", "options": ["a", "b"], "correctAnswer": 5}
        ]"#;
        let err = QuestionBank::from_json(json).unwrap_err();
        assert!(matches!(err, BankError::Invalid { index: 2, .. }));
    }

    #[test]
    fn from_json_rejects_non_array() {
        let err = QuestionBank::from_json(r#"{"questions": []}"#).unwrap_err();
        assert!(matches!(err, BankError::Json(_)));
    }

    #[test]
    fn stats_count_difficulty_and_category() {
        let bank = QuestionBank::new(vec![
            question(1, "Fire", Difficulty::Basic),
            question(2, "Fire", Difficulty::Basic),
            question(3, "Law", Difficulty::Advanced),
            question(4, "Law", Difficulty::Intermediate),
        ])
        .unwrap();

        let stats = bank.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.count(Difficulty::Basic), 2);
        assert_eq!(stats.percentage(Difficulty::Basic), 50);
        assert_eq!(stats.by_category.get("Law"), Some(&2));
        assert!(stats.by_section.is_empty());
        assert_eq!(bank.categories(), vec!["Fire", "Law"]);
        assert!(bank.get(QuestionId::new(3)).is_some());
    }

    #[test]
    fn stats_count_sections() {
        let bank = QuestionBank::from_json(
            r#"[
                {"id": 1, "question": "Q1", "options": ["a", "b"], "correctAnswer": 0, "section": "Detection"},
                {"id": 2, "question": "Q2", "options": ["a", "b"], "correctAnswer": 0, "section": "Detection"},
                {"id": 3, "question": "Q3", "options": ["a", "b"], "correctAnswer": 0, "section": "Response"},
                {"id": 4, "question": "Q4", "options": ["a", "b"], "correctAnswer": 0}
            ]"#,
        )
        .unwrap();

        let stats = bank.stats();
        assert_eq!(stats.by_section.get("Detection"), Some(&2));
        assert_eq!(stats.by_section.get("Response"), Some(&1));
        assert_eq!(stats.by_section.values().sum::<usize>(), 3);
        bank.log_stats("sections");
    }

    #[tokio::test]
    async fn fallback_source_uses_fallback_on_error() {
        let bundled = QuestionBank::new(vec![question(1, "Fire", Difficulty::Basic)]).unwrap();
        let source = FallbackSource::new(
            Arc::new(FailingSource),
            Arc::new(StaticSource::new(bundled.clone())),
        );
        assert_eq!(source.load().await.unwrap(), bundled);
    }
}
