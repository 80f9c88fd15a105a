use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::Difficulty;
use crate::scoring::{GradeScale, GradeScaleError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("exam id cannot be empty")]
    EmptyExamId,

    #[error("total questions must be > 0")]
    InvalidTotalQuestions,

    #[error("time limit must be > 0 seconds when set")]
    InvalidTimeLimit,

    #[error("pass threshold must be <= 100, got {0}")]
    InvalidPassThreshold(u8),

    #[error("category name cannot be empty")]
    EmptyCategory,

    #[error("category listed twice: {0}")]
    DuplicateCategory(String),

    #[error("difficulty mix weights must not all be zero")]
    EmptyDifficultyMix,

    #[error(transparent)]
    GradeScale(#[from] GradeScaleError),

    #[error("invalid exam config json: {0}")]
    Json(#[from] serde_json::Error),
}

//
// ─── POLICIES ──────────────────────────────────────────────────────────────────
//

/// Whether "next" requires an answer on the current question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerPolicy {
    #[default]
    Optional,
    RequireAnswer,
}

/// What the selector does when a category or difficulty pool is too small.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Take what is available and return fewer questions.
    #[default]
    Underfill,
    /// Fail the selection.
    Strict,
}

/// Relative weights for drawing questions by difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyMix {
    pub basic: u32,
    pub intermediate: u32,
    pub advanced: u32,
}

impl DifficultyMix {
    /// # Errors
    ///
    /// Returns `ConfigError::EmptyDifficultyMix` if every weight is zero.
    pub fn new(basic: u32, intermediate: u32, advanced: u32) -> Result<Self, ConfigError> {
        let mix = Self {
            basic,
            intermediate,
            advanced,
        };
        if mix.total_weight() == 0 {
            return Err(ConfigError::EmptyDifficultyMix);
        }
        Ok(mix)
    }

    #[must_use]
    pub fn total_weight(&self) -> u64 {
        u64::from(self.basic) + u64::from(self.intermediate) + u64::from(self.advanced)
    }

    /// Splits `count` across the tiers.
    ///
    /// Basic and intermediate shares are rounded; advanced takes whatever is
    /// left so the parts always sum to `count`.
    #[must_use]
    pub fn split(&self, count: usize) -> [(Difficulty, usize); 3] {
        let total = self.total_weight();
        let share = |weight: u32| -> usize {
            if total == 0 {
                return 0;
            }
            let n = count as u64 * u64::from(weight);
            usize::try_from((2 * n + total) / (2 * total)).unwrap_or(usize::MAX)
        };
        let basic = share(self.basic).min(count);
        let intermediate = share(self.intermediate).min(count - basic);
        let advanced = count - basic - intermediate;
        [
            (Difficulty::Basic, basic),
            (Difficulty::Intermediate, intermediate),
            (Difficulty::Advanced, advanced),
        ]
    }
}

//
// ─── EXAM CONFIG ───────────────────────────────────────────────────────────────
//

fn default_pass_threshold() -> u8 {
    70
}

/// Per-exam parameters for a mock examination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamConfig {
    exam_id: String,
    title: String,
    total_questions: usize,
    #[serde(default)]
    time_limit_secs: Option<u32>,
    #[serde(default = "default_pass_threshold")]
    pass_threshold: u8,
    #[serde(default)]
    exit_path: Option<String>,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    difficulty_mix: Option<DifficultyMix>,
    #[serde(default)]
    grade_bands: Option<GradeScale>,
    #[serde(default)]
    answer_policy: AnswerPolicy,
    #[serde(default)]
    fill_policy: FillPolicy,
}

impl ExamConfig {
    /// Creates a config with defaults: no time limit, 70% pass mark,
    /// uniform sampling, optional answers and silent under-fill.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the id is blank or `total_questions` is zero.
    pub fn new(
        exam_id: impl Into<String>,
        title: impl Into<String>,
        total_questions: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            exam_id: exam_id.into(),
            title: title.into(),
            total_questions,
            time_limit_secs: None,
            pass_threshold: default_pass_threshold(),
            exit_path: None,
            categories: Vec::new(),
            difficulty_mix: None,
            grade_bands: None,
            answer_policy: AnswerPolicy::default(),
            fill_policy: FillPolicy::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a config from JSON.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Json` on malformed input, or the first
    /// validation failure.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every field invariant.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.exam_id.trim().is_empty() {
            return Err(ConfigError::EmptyExamId);
        }
        if self.total_questions == 0 {
            return Err(ConfigError::InvalidTotalQuestions);
        }
        if self.time_limit_secs == Some(0) {
            return Err(ConfigError::InvalidTimeLimit);
        }
        if self.pass_threshold > 100 {
            return Err(ConfigError::InvalidPassThreshold(self.pass_threshold));
        }
        let mut seen = HashSet::new();
        for category in &self.categories {
            if category.trim().is_empty() {
                return Err(ConfigError::EmptyCategory);
            }
            if !seen.insert(category.as_str()) {
                return Err(ConfigError::DuplicateCategory(category.clone()));
            }
        }
        if self
            .difficulty_mix
            .is_some_and(|mix| mix.total_weight() == 0)
        {
            return Err(ConfigError::EmptyDifficultyMix);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ConfigError::InvalidTimeLimit` for a zero limit.
    pub fn with_time_limit_secs(mut self, secs: u32) -> Result<Self, ConfigError> {
        if secs == 0 {
            return Err(ConfigError::InvalidTimeLimit);
        }
        self.time_limit_secs = Some(secs);
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPassThreshold` above 100.
    pub fn with_pass_threshold(mut self, threshold: u8) -> Result<Self, ConfigError> {
        if threshold > 100 {
            return Err(ConfigError::InvalidPassThreshold(threshold));
        }
        self.pass_threshold = threshold;
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns `ConfigError` for blank or repeated category names.
    pub fn with_categories<I, S>(mut self, categories: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self.validate()?;
        Ok(self)
    }

    #[must_use]
    pub fn with_exit_path(mut self, path: impl Into<String>) -> Self {
        self.exit_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_difficulty_mix(mut self, mix: DifficultyMix) -> Self {
        self.difficulty_mix = Some(mix);
        self
    }

    #[must_use]
    pub fn with_grade_bands(mut self, scale: GradeScale) -> Self {
        self.grade_bands = Some(scale);
        self
    }

    #[must_use]
    pub fn with_answer_policy(mut self, policy: AnswerPolicy) -> Self {
        self.answer_policy = policy;
        self
    }

    #[must_use]
    pub fn with_fill_policy(mut self, policy: FillPolicy) -> Self {
        self.fill_policy = policy;
        self
    }

    // Accessors
    #[must_use]
    pub fn exam_id(&self) -> &str {
        &self.exam_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.total_questions
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> Option<u32> {
        self.time_limit_secs
    }

    #[must_use]
    pub fn pass_threshold(&self) -> u8 {
        self.pass_threshold
    }

    #[must_use]
    pub fn exit_path(&self) -> Option<&str> {
        self.exit_path.as_deref()
    }

    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    #[must_use]
    pub fn difficulty_mix(&self) -> Option<DifficultyMix> {
        self.difficulty_mix
    }

    #[must_use]
    pub fn answer_policy(&self) -> AnswerPolicy {
        self.answer_policy
    }

    #[must_use]
    pub fn fill_policy(&self) -> FillPolicy {
        self.fill_policy
    }

    /// Configured grade bands, or a pass/fail scale at `pass_threshold`.
    ///
    /// # Errors
    ///
    /// Returns `GradeScaleError` only if the pass threshold is out of range,
    /// which `validate` already rules out.
    pub fn grade_scale(&self) -> Result<GradeScale, GradeScaleError> {
        match &self.grade_bands {
            Some(scale) => Ok(scale.clone()),
            None => GradeScale::pass_fail(self.pass_threshold),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
