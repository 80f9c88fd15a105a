use chrono::{DateTime, Utc};
use serde::Serialize;

use exam_core::model::SessionId;
use exam_core::scoring::{Grade, GradeScale, Score};
use exam_core::time::{elapsed_secs, format_clock};

use super::progress::SessionStats;
use super::service::{CompletionReason, ExamSession};
use crate::error::SessionError;

/// Final outcome of a completed attempt.
///
/// Presentation-agnostic: the UI formats the duration and labels itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExamResults {
    pub session_id: SessionId,
    pub score: Score,
    pub grade: Grade,
    pub passed: bool,
    pub stats: SessionStats,
    pub reason: CompletionReason,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: u64,
}

impl ExamResults {
    /// Marks `session` against `scale`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotCompleted` while the attempt is still open.
    pub fn from_session(session: &ExamSession, scale: &GradeScale) -> Result<Self, SessionError> {
        let (Some(reason), Some(started_at), Some(ended_at)) = (
            session.completion_reason(),
            session.started_at(),
            session.ended_at(),
        ) else {
            return Err(SessionError::NotCompleted);
        };

        let score = session.score();
        let grade = scale.grade(score.percentage);
        Ok(Self {
            session_id: session.id(),
            passed: grade.passing,
            score,
            grade,
            stats: session.stats(),
            reason,
            started_at,
            ended_at,
            duration_secs: elapsed_secs(started_at, ended_at),
        })
    }

    /// Time taken as `m:ss`.
    #[must_use]
    pub fn duration_label(&self) -> String {
        format_clock(u32::try_from(self.duration_secs).unwrap_or(u32::MAX))
    }
}
