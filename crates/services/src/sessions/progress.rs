use serde::Serialize;

/// Answered / unanswered / flagged counts for an attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub answered: usize,
    pub unanswered: usize,
    pub flagged: usize,
}

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionProgress {
    pub total: usize,
    /// 0-based cursor.
    pub position: usize,
    pub stats: SessionStats,
    pub remaining_secs: Option<u32>,
    pub is_complete: bool,
}

impl SessionProgress {
    /// Share of questions answered, rounded to a whole percent.
    #[must_use]
    pub fn answered_percentage(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = (200 * self.stats.answered + self.total) / (2 * self.total);
        u8::try_from(pct.min(100)).unwrap_or(100)
    }

    #[must_use]
    pub fn is_last_question(&self) -> bool {
        self.position + 1 == self.total
    }
}
