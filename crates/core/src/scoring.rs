use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::Question;

/// Chosen option per question position. Positions are 0-based and sparse.
pub type AnswerSheet = BTreeMap<usize, usize>;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GradeScaleError {
    #[error("grade scale needs at least one band")]
    NoBands,

    #[error("grade label cannot be empty")]
    EmptyLabel,

    #[error("threshold {0} exceeds 100")]
    ThresholdOutOfRange(u8),

    #[error("threshold {0} is used by more than one band")]
    DuplicateThreshold(u8),
}

//
// ─── SCORE ─────────────────────────────────────────────────────────────────────
//

/// Raw result of marking an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub correct: u32,
    pub total: u32,
    pub percentage: u8,
}

impl Score {
    /// Builds a score, rounding the percentage half away from zero.
    ///
    /// A zero total yields 0%.
    #[must_use]
    pub fn new(correct: u32, total: u32) -> Self {
        Self {
            correct,
            total,
            percentage: percentage(correct, total),
        }
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.total.saturating_sub(self.correct)
    }
}

/// Marks `answers` against `questions`.
///
/// A position counts as correct only when an answer is recorded and equals
/// the question's correct option. Answers for positions outside `questions`
/// are ignored.
///
/// ```
/// # use exam_core::model::{Question, QuestionId};
/// # use exam_core::scoring::{score, AnswerSheet};
/// let opts = || vec!["a".to_string(), "b".to_string()];
/// let questions = vec![
///     Question::new(QuestionId::new(1), "Q1", opts(), 1, "").unwrap(),
///     Question::new(QuestionId::new(2), "Q2", opts(), 0, "").unwrap(),
/// ];
/// let answers = AnswerSheet::from([(0, 1), (1, 1)]);
/// let s = score(&questions, &answers);
/// assert_eq!((s.correct, s.total, s.percentage), (1, 2, 50));
/// ```
#[must_use]
pub fn score(questions: &[Question], answers: &AnswerSheet) -> Score {
    let correct = questions
        .iter()
        .enumerate()
        .filter(|(position, question)| {
            answers
                .get(position)
                .is_some_and(|&chosen| question.is_correct(chosen))
        })
        .count();

    Score::new(
        u32::try_from(correct).unwrap_or(u32::MAX),
        u32::try_from(questions.len()).unwrap_or(u32::MAX),
    )
}

fn percentage(correct: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = u64::from(correct.min(total));
    let total = u64::from(total);
    // round(100 * c / t) in integers
    let pct = (200 * correct + total) / (2 * total);
    u8::try_from(pct).unwrap_or(100)
}

//
// ─── GRADE BANDS ───────────────────────────────────────────────────────────────
//

/// One named tier, reached at `min_percentage` or above.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeBand {
    pub min_percentage: u8,
    pub label: String,
    #[serde(default = "default_passing")]
    pub passing: bool,
}

fn default_passing() -> bool {
    true
}

impl GradeBand {
    #[must_use]
    pub fn new(min_percentage: u8, label: impl Into<String>, passing: bool) -> Self {
        Self {
            min_percentage,
            label: label.into(),
            passing,
        }
    }
}

/// Grade awarded for a percentage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    pub label: String,
    pub passing: bool,
}

#[derive(Deserialize)]
struct GradeScaleSpec {
    bands: Vec<GradeBand>,
    fallback: String,
}

/// Ordered thresholds mapping a percentage to a grade label.
///
/// Bands are kept sorted highest threshold first; a percentage below every
/// band receives the fallback label, which is never passing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GradeScaleSpec")]
pub struct GradeScale {
    bands: Vec<GradeBand>,
    fallback: String,
}

impl TryFrom<GradeScaleSpec> for GradeScale {
    type Error = GradeScaleError;

    fn try_from(spec: GradeScaleSpec) -> Result<Self, Self::Error> {
        Self::new(spec.bands, spec.fallback)
    }
}

impl GradeScale {
    /// Builds a scale from unordered bands.
    ///
    /// # Errors
    ///
    /// Returns `GradeScaleError` for an empty band list, blank labels,
    /// thresholds above 100 or duplicate thresholds.
    pub fn new(
        mut bands: Vec<GradeBand>,
        fallback: impl Into<String>,
    ) -> Result<Self, GradeScaleError> {
        let fallback = fallback.into();
        if bands.is_empty() {
            return Err(GradeScaleError::NoBands);
        }
        if fallback.trim().is_empty() || bands.iter().any(|b| b.label.trim().is_empty()) {
            return Err(GradeScaleError::EmptyLabel);
        }
        if let Some(band) = bands.iter().find(|b| b.min_percentage > 100) {
            return Err(GradeScaleError::ThresholdOutOfRange(band.min_percentage));
        }

        bands.sort_by(|a, b| b.min_percentage.cmp(&a.min_percentage));
        if let Some(pair) = bands
            .windows(2)
            .find(|pair| pair[0].min_percentage == pair[1].min_percentage)
        {
            return Err(GradeScaleError::DuplicateThreshold(pair[0].min_percentage));
        }

        Ok(Self { bands, fallback })
    }

    /// Two-band scale: `Pass` at or above `threshold`, else `Fail`.
    ///
    /// # Errors
    ///
    /// Returns `GradeScaleError::ThresholdOutOfRange` if `threshold > 100`.
    pub fn pass_fail(threshold: u8) -> Result<Self, GradeScaleError> {
        Self::new(vec![GradeBand::new(threshold, "Pass", true)], "Fail")
    }

    /// Distinction / Merit / Pass / Fail scale.
    ///
    /// # Errors
    ///
    /// Returns `GradeScaleError` if thresholds are out of range or collide.
    pub fn distinction_merit_pass(
        distinction: u8,
        merit: u8,
        pass: u8,
    ) -> Result<Self, GradeScaleError> {
        Self::new(
            vec![
                GradeBand::new(distinction, "Distinction", true),
                GradeBand::new(merit, "Merit", true),
                GradeBand::new(pass, "Pass", true),
            ],
            "Fail",
        )
    }

    #[must_use]
    pub fn bands(&self) -> &[GradeBand] {
        &self.bands
    }

    #[must_use]
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Grade for `percentage`: the highest band whose threshold is met.
    #[must_use]
    pub fn grade(&self, percentage: u8) -> Grade {
        match self.bands.iter().find(|b| percentage >= b.min_percentage) {
            Some(band) => Grade {
                label: band.label.clone(),
                passing: band.passing,
            },
            None => Grade {
                label: self.fallback.clone(),
                passing: false,
            },
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
