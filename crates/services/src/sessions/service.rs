use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use exam_core::Clock;
use exam_core::model::{AnswerPolicy, ExamConfig, Question, SessionId};
use exam_core::scoring::{self, AnswerSheet, Score};

use super::progress::{SessionProgress, SessionStats};
use super::review::{self, ReviewFilter, ReviewItem};
use crate::error::SessionError;

//
// ─── PHASE & OUTCOMES ──────────────────────────────────────────────────────────
//

/// Lifecycle of an attempt. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    NotStarted,
    InProgress,
    Completed,
}

/// Why an attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// "Next" on the last question.
    Finished,
    /// Submitted early.
    Submitted,
    /// The countdown reached zero.
    TimeExpired,
}

/// Why an action left the session untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotInProgress,
    NoTimeLimit,
    OptionOutOfRange { option: usize, len: usize },
    PositionOutOfRange { position: usize, len: usize },
    AnswerRequired,
    AtFirstQuestion,
    NothingFlagged,
}

/// Result of a user or timer action.
///
/// Rejected actions are usually UI races (a click landing after the timer
/// fired) and are reported here rather than as errors.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Completed(CompletionReason),
    Ignored(Rejection),
}

impl Outcome {
    #[must_use]
    pub fn is_applied(self) -> bool {
        !matches!(self, Outcome::Ignored(_))
    }

    #[must_use]
    pub fn completed(self) -> Option<CompletionReason> {
        match self {
            Outcome::Completed(reason) => Some(reason),
            _ => None,
        }
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One attempt at a mock exam.
///
/// Holds the drawn questions, the answer sheet, flags, the cursor and the
/// countdown. Every mutating call checks the phase first, so actions that
/// arrive after completion cannot change the answers or the cursor.
pub struct ExamSession {
    id: SessionId,
    clock: Clock,
    time_limit_secs: Option<u32>,
    answer_policy: AnswerPolicy,
    questions: Vec<Question>,
    answers: AnswerSheet,
    flagged: BTreeSet<usize>,
    current: usize,
    phase: SessionPhase,
    remaining_secs: Option<u32>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    completion: Option<CompletionReason>,
    timer_stop: Option<CancellationToken>,
}

impl ExamSession {
    /// A session that has not started, with no time limit and optional answers.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            id: SessionId::generate(),
            clock,
            time_limit_secs: None,
            answer_policy: AnswerPolicy::Optional,
            questions: Vec::new(),
            answers: AnswerSheet::new(),
            flagged: BTreeSet::new(),
            current: 0,
            phase: SessionPhase::NotStarted,
            remaining_secs: None,
            started_at: None,
            ended_at: None,
            completion: None,
            timer_stop: None,
        }
    }

    /// A session using the time limit and answer policy from `config`.
    #[must_use]
    pub fn from_config(config: &ExamConfig, clock: Clock) -> Self {
        let mut session = Self::new(clock).with_answer_policy(config.answer_policy());
        session.time_limit_secs = config.time_limit_secs();
        session
    }

    /// Zero is treated as no limit.
    #[must_use]
    pub fn with_time_limit_secs(mut self, secs: u32) -> Self {
        self.time_limit_secs = (secs > 0).then_some(secs);
        self
    }

    #[must_use]
    pub fn with_answer_policy(mut self, policy: AnswerPolicy) -> Self {
        self.answer_policy = policy;
        self
    }

    /// Start the attempt with `questions` in presentation order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyStarted` if the session has left
    /// `NotStarted`, or `SessionError::Empty` if `questions` is empty.
    pub fn start(&mut self, questions: Vec<Question>) -> Result<(), SessionError> {
        if self.phase != SessionPhase::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }

        self.questions = questions;
        self.answers.clear();
        self.flagged.clear();
        self.current = 0;
        self.phase = SessionPhase::InProgress;
        self.started_at = Some(self.clock.now());
        self.remaining_secs = self.time_limit_secs;

        info!(
            session = %self.id,
            questions = self.questions.len(),
            time_limit_secs = ?self.time_limit_secs,
            "exam session started"
        );
        Ok(())
    }

    /// Discard this attempt and start a new one with `questions`.
    ///
    /// The replacement gets a fresh id and keeps the time limit and answer
    /// policy. Any timer attached to the old attempt is stopped.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if `questions` is empty; the current
    /// attempt is left untouched in that case.
    pub fn restart(&mut self, questions: Vec<Question>) -> Result<(), SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }
        self.stop_timer();
        let previous = self.id;
        *self = Self::new(self.clock)
            .with_answer_policy(self.answer_policy)
            .with_time_limit_secs(self.time_limit_secs.unwrap_or(0));
        debug!(previous = %previous, session = %self.id, "exam session restarted");
        self.start(questions)
    }

    /// Record `option` for the current question, replacing any earlier choice.
    pub fn select_answer(&mut self, option: usize) -> Outcome {
        if let Some(rejected) = self.require_in_progress("select_answer") {
            return rejected;
        }
        let len = self.questions[self.current].option_count();
        if option >= len {
            return self.ignore("select_answer", Rejection::OptionOutOfRange { option, len });
        }
        self.answers.insert(self.current, option);
        Outcome::Applied
    }

    /// Advance, or complete the attempt when on the last question.
    pub fn go_next(&mut self) -> Outcome {
        if let Some(rejected) = self.require_in_progress("go_next") {
            return rejected;
        }
        if self.answer_policy == AnswerPolicy::RequireAnswer
            && !self.answers.contains_key(&self.current)
        {
            return self.ignore("go_next", Rejection::AnswerRequired);
        }
        if self.current + 1 >= self.questions.len() {
            return self.complete(CompletionReason::Finished);
        }
        self.current += 1;
        Outcome::Applied
    }

    /// Step back one question. Recorded answers are kept.
    pub fn go_previous(&mut self) -> Outcome {
        if let Some(rejected) = self.require_in_progress("go_previous") {
            return rejected;
        }
        if self.current == 0 {
            return self.ignore("go_previous", Rejection::AtFirstQuestion);
        }
        self.current -= 1;
        Outcome::Applied
    }

    /// Jump to `position`, as from a question navigator.
    ///
    /// Under `AnswerPolicy::RequireAnswer` a jump may not skip past the first
    /// unanswered question.
    pub fn go_to(&mut self, position: usize) -> Outcome {
        if let Some(rejected) = self.require_in_progress("go_to") {
            return rejected;
        }
        let len = self.questions.len();
        if position >= len {
            return self.ignore("go_to", Rejection::PositionOutOfRange { position, len });
        }
        if self.answer_policy == AnswerPolicy::RequireAnswer
            && self.first_unanswered().is_some_and(|gap| position > gap)
        {
            return self.ignore("go_to", Rejection::AnswerRequired);
        }
        self.current = position;
        Outcome::Applied
    }

    /// Move to the next flagged question after the cursor, wrapping around.
    pub fn next_flagged(&mut self) -> Outcome {
        if let Some(rejected) = self.require_in_progress("next_flagged") {
            return rejected;
        }
        let next = self
            .flagged
            .range(self.current + 1..)
            .next()
            .or_else(|| self.flagged.iter().next())
            .copied();
        match next {
            Some(position) => {
                self.current = position;
                Outcome::Applied
            }
            None => self.ignore("next_flagged", Rejection::NothingFlagged),
        }
    }

    /// Flag or unflag `position` for review.
    pub fn toggle_flag(&mut self, position: usize) -> Outcome {
        if let Some(rejected) = self.require_in_progress("toggle_flag") {
            return rejected;
        }
        let len = self.questions.len();
        if position >= len {
            return self.ignore("toggle_flag", Rejection::PositionOutOfRange { position, len });
        }
        if !self.flagged.remove(&position) {
            self.flagged.insert(position);
        }
        Outcome::Applied
    }

    pub fn toggle_current_flag(&mut self) -> Outcome {
        self.toggle_flag(self.current)
    }

    /// Finish early. Unanswered questions are marked incorrect.
    pub fn submit(&mut self) -> Outcome {
        if let Some(rejected) = self.require_in_progress("submit") {
            return rejected;
        }
        self.complete(CompletionReason::Submitted)
    }

    /// Take one second off the countdown, auto-submitting at zero.
    pub fn tick(&mut self) -> Outcome {
        if let Some(rejected) = self.require_in_progress("tick") {
            return rejected;
        }
        let Some(remaining) = self.remaining_secs else {
            return self.ignore("tick", Rejection::NoTimeLimit);
        };
        let remaining = remaining.saturating_sub(1);
        self.remaining_secs = Some(remaining);
        if remaining == 0 {
            return self.complete(CompletionReason::TimeExpired);
        }
        Outcome::Applied
    }

    fn require_in_progress(&self, action: &'static str) -> Option<Outcome> {
        (self.phase != SessionPhase::InProgress)
            .then(|| self.ignore(action, Rejection::NotInProgress))
    }

    fn ignore(&self, action: &'static str, rejection: Rejection) -> Outcome {
        debug!(session = %self.id, action, ?rejection, "action ignored");
        Outcome::Ignored(rejection)
    }

    fn complete(&mut self, reason: CompletionReason) -> Outcome {
        self.phase = SessionPhase::Completed;
        self.ended_at = Some(self.clock.now());
        self.completion = Some(reason);
        self.stop_timer();
        info!(
            session = %self.id,
            ?reason,
            answered = self.answers.len(),
            total = self.questions.len(),
            "exam session completed"
        );
        Outcome::Completed(reason)
    }

    fn first_unanswered(&self) -> Option<usize> {
        (0..self.questions.len()).find(|p| !self.answers.contains_key(p))
    }

    /// Registers the cancellation token of a timer driving this session.
    pub(crate) fn attach_timer(&mut self, token: CancellationToken) {
        self.stop_timer();
        self.timer_stop = Some(token);
    }

    fn stop_timer(&mut self) {
        if let Some(token) = self.timer_stop.take() {
            token.cancel();
        }
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.phase == SessionPhase::InProgress
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Completed
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn current_position(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    #[must_use]
    pub fn selected_answer(&self, position: usize) -> Option<usize> {
        self.answers.get(&position).copied()
    }

    #[must_use]
    pub fn flagged(&self) -> &BTreeSet<usize> {
        &self.flagged
    }

    #[must_use]
    pub fn is_flagged(&self, position: usize) -> bool {
        self.flagged.contains(&position)
    }

    #[must_use]
    pub fn answer_policy(&self) -> AnswerPolicy {
        self.answer_policy
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> Option<u32> {
        self.time_limit_secs
    }

    #[must_use]
    pub fn remaining_secs(&self) -> Option<u32> {
        self.remaining_secs
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    #[must_use]
    pub fn completion_reason(&self) -> Option<CompletionReason> {
        self.completion
    }

    #[must_use]
    pub fn stats(&self) -> SessionStats {
        let answered = self.answers.len();
        SessionStats {
            answered,
            unanswered: self.questions.len().saturating_sub(answered),
            flagged: self.flagged.len(),
        }
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.questions.len(),
            position: self.current,
            stats: self.stats(),
            remaining_secs: self.remaining_secs,
            is_complete: self.is_complete(),
        }
    }

    /// Marks the answer sheet as it stands.
    #[must_use]
    pub fn score(&self) -> Score {
        scoring::score(&self.questions, &self.answers)
    }

    #[must_use]
    pub fn review(&self, mode: ReviewFilter) -> Vec<ReviewItem<'_>> {
        review::filter(&self.questions, &self.answers, &self.flagged, mode)
    }
}

impl fmt::Debug for ExamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamSession")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("answered", &self.answers.len())
            .field("flagged", &self.flagged.len())
            .field("remaining_secs", &self.remaining_secs)
            .field("started_at", &self.started_at)
            .field("ended_at", &self.ended_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
