use thiserror::Error;

use crate::model::{ConfigError, QuestionError};
use crate::scoring::GradeScaleError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    GradeScale(#[from] GradeScaleError),
}
