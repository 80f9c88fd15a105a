use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use tracing::warn;

use exam_core::model::{Difficulty, DifficultyMix, FillPolicy, Question};

use crate::error::SelectionError;

/// Questions drawn for one attempt, in presentation order.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    questions: Vec<Question>,
    requested: usize,
}

impl Selection {
    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn into_questions(self) -> Vec<Question> {
        self.questions
    }

    #[must_use]
    pub fn requested(&self) -> usize {
        self.requested
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// How many fewer questions were drawn than requested.
    #[must_use]
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.questions.len())
    }
}

/// Draws a randomized subset of a bank.
///
/// Every draw is without replacement and the final order is shuffled. The
/// selector never mutates the bank, so one bank can feed many sessions.
pub struct QuestionSelector<'a> {
    bank: &'a [Question],
    fill_policy: FillPolicy,
    scope: &'a [String],
}

impl<'a> QuestionSelector<'a> {
    #[must_use]
    pub fn new(bank: &'a [Question]) -> Self {
        Self {
            bank,
            fill_policy: FillPolicy::Underfill,
            scope: &[],
        }
    }

    /// Restricts [`Self::select`] and [`Self::select_by_difficulty`] to
    /// questions in `categories`. An empty list means the whole bank.
    #[must_use]
    pub fn within_categories(mut self, categories: &'a [String]) -> Self {
        self.scope = categories;
        self
    }

    #[must_use]
    pub fn with_fill_policy(mut self, policy: FillPolicy) -> Self {
        self.fill_policy = policy;
        self
    }

    /// Uniform sample of `min(count, bank.len())` questions.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError::InsufficientBank` under `FillPolicy::Strict`
    /// when the bank is smaller than `count`.
    pub fn select<R: Rng + ?Sized>(
        &self,
        count: usize,
        rng: &mut R,
    ) -> Result<Selection, SelectionError> {
        let pool: Vec<&Question> = self.bank.iter().filter(|q| self.in_scope(q)).collect();
        let available = pool.len();
        let drawn = self.draw(pool, count, rng).ok_or_else(|| {
            SelectionError::InsufficientBank {
                requested: count,
                available,
            }
        })?;
        Ok(self.finish(drawn, count, rng))
    }

    /// Balanced sample across `categories`.
    ///
    /// `count` is split evenly; the remainder goes one each to the first
    /// categories in list order. A repeated category counts once, at its
    /// first position. Questions outside the listed categories are never
    /// drawn. An empty category list falls back to [`Self::select`].
    ///
    /// # Errors
    ///
    /// Returns `SelectionError::InsufficientCategory` under
    /// `FillPolicy::Strict` when a category cannot cover its share.
    pub fn select_balanced<R: Rng + ?Sized>(
        &self,
        count: usize,
        categories: &[String],
        rng: &mut R,
    ) -> Result<Selection, SelectionError> {
        let categories = distinct(categories);
        if categories.is_empty() {
            return self.select(count, rng);
        }

        let per_category = count / categories.len();
        let remainder = count % categories.len();
        let mut drawn = Vec::with_capacity(count);

        for (index, category) in categories.iter().enumerate() {
            let share = per_category + usize::from(index < remainder);
            let pool: Vec<&Question> = self
                .bank
                .iter()
                .filter(|q| q.category() == Some(*category))
                .collect();
            let available = pool.len();
            let picked = self.draw(pool, share, rng).ok_or_else(|| {
                SelectionError::InsufficientCategory {
                    category: (*category).to_owned(),
                    requested: share,
                    available,
                }
            })?;
            if picked.len() < share {
                warn!(
                    category = %category,
                    requested = share,
                    available,
                    "category under-filled"
                );
            }
            drawn.extend(picked);
        }

        Ok(self.finish(drawn, count, rng))
    }

    /// Sample weighted by difficulty tier, see [`DifficultyMix::split`].
    ///
    /// Each tier is drawn from the questions in scope, so combined with
    /// [`Self::within_categories`] the listed categories still bound the draw.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError::InsufficientDifficulty` under
    /// `FillPolicy::Strict` when a tier cannot cover its share.
    pub fn select_by_difficulty<R: Rng + ?Sized>(
        &self,
        count: usize,
        mix: DifficultyMix,
        rng: &mut R,
    ) -> Result<Selection, SelectionError> {
        let mut drawn = Vec::with_capacity(count);

        for (difficulty, share) in mix.split(count) {
            let pool: Vec<&Question> = difficulty_pool(self.bank, difficulty)
                .into_iter()
                .filter(|q| self.in_scope(q))
                .collect();
            let available = pool.len();
            let picked = self.draw(pool, share, rng).ok_or_else(|| {
                SelectionError::InsufficientDifficulty {
                    difficulty,
                    requested: share,
                    available,
                }
            })?;
            if picked.len() < share {
                warn!(
                    difficulty = %difficulty,
                    requested = share,
                    available,
                    "difficulty tier under-filled"
                );
            }
            drawn.extend(picked);
        }

        Ok(self.finish(drawn, count, rng))
    }

    fn in_scope(&self, question: &Question) -> bool {
        self.scope.is_empty()
            || question
                .category()
                .is_some_and(|c| self.scope.iter().any(|s| s == c))
    }

    fn draw<'q, R: Rng + ?Sized>(
        &self,
        mut pool: Vec<&'q Question>,
        share: usize,
        rng: &mut R,
    ) -> Option<Vec<&'q Question>> {
        if pool.len() < share && self.fill_policy == FillPolicy::Strict {
            return None;
        }
        pool.shuffle(rng);
        pool.truncate(share);
        Some(pool)
    }

    fn finish<R: Rng + ?Sized>(
        &self,
        drawn: Vec<&Question>,
        requested: usize,
        rng: &mut R,
    ) -> Selection {
        let mut questions: Vec<Question> = drawn.into_iter().cloned().collect();
        questions.shuffle(rng);
        Selection {
            questions,
            requested,
        }
    }
}

/// Draws `count` questions, balanced across `categories` when given.
///
/// Thin pools under-fill silently; use [`QuestionSelector`] with
/// `FillPolicy::Strict` to fail instead.
pub fn select<R: Rng + ?Sized>(
    bank: &[Question],
    count: usize,
    categories: Option<&[String]>,
    rng: &mut R,
) -> Selection {
    let selector = QuestionSelector::new(bank);
    let result = match categories {
        Some(categories) => selector.select_balanced(count, categories, rng),
        None => selector.select(count, rng),
    };
    let Ok(selection) = result else {
        unreachable!("underfill selection never fails");
    };
    selection
}

/// Category names in first-seen order, without repeats.
fn distinct(categories: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    categories
        .iter()
        .map(String::as_str)
        .filter(|c| seen.insert(*c))
        .collect()
}

/// Questions of `difficulty` in `bank`, for callers building custom mixes.
#[must_use]
pub fn difficulty_pool(bank: &[Question], difficulty: Difficulty) -> Vec<&Question> {
    bank.iter()
        .filter(|q| q.difficulty() == Some(difficulty))
        .collect()
}

/// Questions tagged with `section`.
#[must_use]
pub fn section_pool<'q>(bank: &'q [Question], section: &str) -> Vec<&'q Question> {
    bank.iter()
        .filter(|q| q.section() == Some(section))
        .collect()
}
