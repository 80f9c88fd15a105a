use rand::Rng;
use std::fmt;
use tracing::{info, warn};

use exam_core::Clock;
use exam_core::model::ExamConfig;
use exam_core::scoring::GradeScale;

use super::plan::{QuestionSelector, Selection};
use super::review::{ReviewFilter, ReviewItem};
use super::service::ExamSession;
use super::view::ExamResults;
use crate::bank::{QuestionBank, QuestionSource};
use crate::error::SessionError;

/// Runs attempts of one configured exam against one bank.
///
/// The runner owns the validated config and the loaded bank; each call to
/// [`Self::start`] draws a fresh selection and returns an independent
/// session.
#[derive(Clone)]
pub struct ExamRunner {
    config: ExamConfig,
    bank: QuestionBank,
    clock: Clock,
    grade_scale: GradeScale,
}

impl ExamRunner {
    /// # Errors
    ///
    /// Returns `SessionError::Config` if `config` fails validation.
    pub fn new(config: ExamConfig, bank: QuestionBank, clock: Clock) -> Result<Self, SessionError> {
        config.validate()?;
        let grade_scale = config.grade_scale()?;
        bank.log_stats(config.exam_id());
        if bank.len() < config.total_questions() {
            warn!(
                exam = config.exam_id(),
                bank = bank.len(),
                total_questions = config.total_questions(),
                "question bank smaller than exam length"
            );
        }
        Ok(Self {
            config,
            bank,
            clock,
            grade_scale,
        })
    }

    /// Loads the bank from `source`, then builds the runner.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Bank` if the source fails, or anything
    /// [`Self::new`] returns.
    pub async fn load(
        config: ExamConfig,
        source: &dyn QuestionSource,
        clock: Clock,
    ) -> Result<Self, SessionError> {
        let bank = source.load().await?;
        Self::new(config, bank, clock)
    }

    /// Draws questions for one attempt.
    ///
    /// With a difficulty mix, each tier is drawn from the listed categories
    /// only (or the whole bank when none are listed). Categories alone give a
    /// balanced draw; with neither, the draw is uniform over the whole bank.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Selection` when the config uses
    /// `FillPolicy::Strict` and the bank cannot cover the request.
    pub fn select_questions<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Selection, SessionError> {
        let count = self.config.total_questions();
        let selector = QuestionSelector::new(self.bank.questions())
            .with_fill_policy(self.config.fill_policy())
            .within_categories(self.config.categories());

        let selection = if let Some(mix) = self.config.difficulty_mix() {
            selector.select_by_difficulty(count, mix, rng)?
        } else if !self.config.categories().is_empty() {
            selector.select_balanced(count, self.config.categories(), rng)?
        } else {
            selector.select(count, rng)?
        };

        if selection.shortfall() > 0 {
            warn!(
                exam = self.config.exam_id(),
                requested = selection.requested(),
                drawn = selection.len(),
                "exam under-filled"
            );
        }
        Ok(selection)
    }

    /// Start a new attempt with a thread-local RNG.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if nothing could be drawn, or a
    /// selection error under `FillPolicy::Strict`.
    pub fn start(&self) -> Result<ExamSession, SessionError> {
        self.start_with_rng(&mut rand::rng())
    }

    /// Start a new attempt drawing with `rng`.
    ///
    /// # Errors
    ///
    /// See [`Self::start`].
    pub fn start_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ExamSession, SessionError> {
        let selection = self.select_questions(rng)?;
        let mut session = ExamSession::from_config(&self.config, self.clock);
        session.start(selection.into_questions())?;
        info!(exam = self.config.exam_id(), session = %session.id(), "exam attempt started");
        Ok(session)
    }

    /// Replace `session` with a fresh attempt and a fresh draw.
    ///
    /// # Errors
    ///
    /// See [`Self::start`]. On error `session` is left as it was.
    pub fn restart(&self, session: &mut ExamSession) -> Result<(), SessionError> {
        self.restart_with_rng(session, &mut rand::rng())
    }

    /// # Errors
    ///
    /// See [`Self::start`].
    pub fn restart_with_rng<R: Rng + ?Sized>(
        &self,
        session: &mut ExamSession,
        rng: &mut R,
    ) -> Result<(), SessionError> {
        let selection = self.select_questions(rng)?;
        session.restart(selection.into_questions())?;
        info!(exam = self.config.exam_id(), session = %session.id(), "exam attempt restarted");
        Ok(())
    }

    /// Score and grade a completed attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotCompleted` while the attempt is open.
    pub fn results(&self, session: &ExamSession) -> Result<ExamResults, SessionError> {
        let results = ExamResults::from_session(session, &self.grade_scale)?;
        info!(
            exam = self.config.exam_id(),
            session = %results.session_id,
            correct = results.score.correct,
            total = results.score.total,
            percentage = results.score.percentage,
            grade = %results.grade.label,
            passed = results.passed,
            "exam attempt graded"
        );
        Ok(results)
    }

    /// Review list of `session` under `mode`.
    #[must_use]
    pub fn review<'s>(&self, session: &'s ExamSession, mode: ReviewFilter) -> Vec<ReviewItem<'s>> {
        session.review(mode)
    }

    #[must_use]
    pub fn config(&self) -> &ExamConfig {
        &self.config
    }

    #[must_use]
    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    #[must_use]
    pub fn grade_scale(&self) -> &GradeScale {
        &self.grade_scale
    }
}

impl fmt::Debug for ExamRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamRunner")
            .field("exam_id", &self.config.exam_id())
            .field("bank_len", &self.bank.len())
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{Difficulty, DifficultyMix, FillPolicy, Question, QuestionId};
    use exam_core::time::fixed_clock;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::error::SelectionError;

    fn bank() -> QuestionBank {
        let difficulties = [Difficulty::Basic, Difficulty::Intermediate, Difficulty::Advanced];
        let questions = (0..30)
            .map(|i| {
                Question::new(
                    QuestionId::new(i),
                    format!("Q{i}"),
                    vec!["a".into(), "b".into(), "c".into()],
                    0,
                    "",
                )
                .unwrap()
                .with_category(if i % 2 == 0 { "Fire" } else { "Law" })
                .with_difficulty(difficulties[(i % 3) as usize])
            })
            .collect();
        QuestionBank::new(questions).unwrap()
    }

    fn config(total: usize) -> ExamConfig {
        ExamConfig::new("mock-7", "Mock Exam 7", total)
            .unwrap()
            .with_time_limit_secs(600)
            .unwrap()
    }

    #[test]
    fn start_draws_configured_count() {
        let runner = ExamRunner::new(config(10), bank(), fixed_clock()).unwrap();
        let session = runner.start_with_rng(&mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(session.questions().len(), 10);
        assert_eq!(session.remaining_secs(), Some(600));
    }

    #[test]
    fn categories_balance_the_draw() {
        let config = config(10).with_categories(["Fire", "Law"]).unwrap();
        let runner = ExamRunner::new(config, bank(), fixed_clock()).unwrap();
        let selection = runner
            .select_questions(&mut StdRng::seed_from_u64(2))
            .unwrap();
        let fire = selection
            .questions()
            .iter()
            .filter(|q| q.category() == Some("Fire"))
            .count();
        assert_eq!(fire, 5);
    }

    #[test]
    fn difficulty_mix_draws_only_listed_categories() {
        let mut questions = bank().questions().to_vec();
        for i in 30..40 {
            questions.push(
                Question::new(
                    QuestionId::new(i),
                    format!("Q{i}"),
                    vec!["a".into(), "b".into()],
                    0,
                    "",
                )
                .unwrap()
                .with_category("Other")
                .with_difficulty(Difficulty::Advanced),
            );
        }
        let config = config(10)
            .with_categories(["Fire", "Law"])
            .unwrap()
            .with_difficulty_mix(DifficultyMix::new(40, 40, 20).unwrap());
        let runner =
            ExamRunner::new(config, QuestionBank::new(questions).unwrap(), fixed_clock()).unwrap();

        let selection = runner
            .select_questions(&mut StdRng::seed_from_u64(3))
            .unwrap();
        assert_eq!(selection.len(), 10);
        assert!(
            selection
                .questions()
                .iter()
                .all(|q| matches!(q.category(), Some("Fire" | "Law")))
        );
        let advanced = selection
            .questions()
            .iter()
            .filter(|q| q.difficulty() == Some(Difficulty::Advanced))
            .count();
        assert_eq!(advanced, 2);
    }

    #[test]
    fn difficulty_mix_without_categories_uses_whole_bank() {
        let config = config(10).with_difficulty_mix(DifficultyMix::new(50, 30, 20).unwrap());
        let runner = ExamRunner::new(config, bank(), fixed_clock()).unwrap();
        let selection = runner
            .select_questions(&mut StdRng::seed_from_u64(5))
            .unwrap();
        assert_eq!(selection.len(), 10);
    }

    #[test]
    fn strict_policy_surfaces_shortfall() {
        let config = config(40).with_fill_policy(FillPolicy::Strict);
        let runner = ExamRunner::new(config, bank(), fixed_clock()).unwrap();
        let err = runner.start_with_rng(&mut StdRng::seed_from_u64(4)).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Selection(SelectionError::InsufficientBank { requested: 40, .. })
        ));
    }

    #[test]
    fn empty_bank_cannot_start() {
        let runner =
            ExamRunner::new(config(5), QuestionBank::new(Vec::new()).unwrap(), fixed_clock())
                .unwrap();
        assert!(matches!(runner.start(), Err(SessionError::Empty)));
    }

    #[test]
    fn restart_draws_again() {
        let runner = ExamRunner::new(config(5), bank(), fixed_clock()).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let mut session = runner.start_with_rng(&mut rng).unwrap();
        let first = session.id();
        let _ = session.submit();

        runner.restart_with_rng(&mut session, &mut rng).unwrap();
        assert_ne!(session.id(), first);
        assert!(session.is_in_progress());
        assert_eq!(session.questions().len(), 5);
    }
}
