mod exam;
mod ids;
mod question;

pub use exam::{AnswerPolicy, ConfigError, DifficultyMix, ExamConfig, FillPolicy};
pub use ids::{ParseIdError, QuestionId, SessionId};
pub use question::{Difficulty, Question, QuestionError, QuestionRecord};
