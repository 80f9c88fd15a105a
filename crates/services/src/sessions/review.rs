use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use exam_core::model::Question;
use exam_core::scoring::AnswerSheet;

/// Which subset of a finished attempt the results view shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewFilter {
    #[default]
    All,
    Correct,
    /// Wrong or unanswered; unanswered questions score as incorrect.
    Incorrect,
    Unanswered,
    Flagged,
}

impl ReviewFilter {
    /// Filter after clicking `clicked`: clicking the active filter clears it.
    #[must_use]
    pub fn toggle(self, clicked: ReviewFilter) -> ReviewFilter {
        if self == clicked {
            ReviewFilter::All
        } else {
            clicked
        }
    }
}

/// Marking status of one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Correct,
    Incorrect,
    Unanswered,
}

impl ReviewStatus {
    #[must_use]
    pub fn of(question: &Question, selected: Option<usize>) -> Self {
        match selected {
            None => ReviewStatus::Unanswered,
            Some(option) if question.is_correct(option) => ReviewStatus::Correct,
            Some(_) => ReviewStatus::Incorrect,
        }
    }

    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, ReviewStatus::Correct)
    }
}

/// One question as shown in the review list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewItem<'a> {
    /// Position in the attempt, 0-based.
    pub position: usize,
    pub question: &'a Question,
    pub selected: Option<usize>,
    pub status: ReviewStatus,
    pub flagged: bool,
}

impl ReviewItem<'_> {
    /// Display number, e.g. `7` for "Q7".
    #[must_use]
    pub fn number(&self) -> usize {
        self.position + 1
    }
}

/// Read-only projection of an attempt for the results view.
///
/// Original positions are preserved so "Q7" stays "Q7" under any filter.
#[must_use]
pub fn filter<'a>(
    questions: &'a [Question],
    answers: &AnswerSheet,
    flagged: &BTreeSet<usize>,
    mode: ReviewFilter,
) -> Vec<ReviewItem<'a>> {
    questions
        .iter()
        .enumerate()
        .map(|(position, question)| {
            let selected = answers.get(&position).copied();
            ReviewItem {
                position,
                question,
                selected,
                status: ReviewStatus::of(question, selected),
                flagged: flagged.contains(&position),
            }
        })
        .filter(|item| match mode {
            ReviewFilter::All => true,
            ReviewFilter::Correct => item.status.is_correct(),
            ReviewFilter::Incorrect => !item.status.is_correct(),
            ReviewFilter::Unanswered => item.status == ReviewStatus::Unanswered,
            ReviewFilter::Flagged => item.flagged,
        })
        .collect()
}
