mod plan;
mod progress;
mod review;
mod service;
mod timer;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::{SelectionError, SessionError};
pub use plan::{QuestionSelector, Selection, difficulty_pool, section_pool, select};
pub use progress::{SessionProgress, SessionStats};
pub use review::{ReviewFilter, ReviewItem, ReviewStatus, filter as review_filter};
pub use service::{CompletionReason, ExamSession, Outcome, Rejection, SessionPhase};
pub use timer::{ExamTimer, SharedSession, TimerExit, TimerHandle};
pub use view::ExamResults;
pub use workflow::ExamRunner;
