#![forbid(unsafe_code)]

pub mod bank;
pub mod error;
pub mod sessions;

pub use exam_core::Clock;

pub use bank::{
    BankStats, FallbackSource, QuestionBank, QuestionSource, RemoteBankConfig, RemoteSource,
    StaticSource,
};
pub use error::{BankError, SelectionError, SessionError};
pub use sessions::{
    CompletionReason, ExamResults, ExamRunner, ExamSession, ExamTimer, Outcome, Rejection,
    ReviewFilter, SessionPhase, TimerHandle,
};
