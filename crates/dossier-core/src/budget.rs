//! Soft execution budget
//!
//! Checked at stage entry and between assembly phases. Exceeding it never
//! aborts a run; it makes the coordinator skip to a cheaper stage.

use crate::error::GenerationError;
use std::time::{Duration, Instant};

/// Wall-clock budget for one generation run
#[derive(Debug, Clone, Copy)]
pub struct ExecutionBudget {
    started: Instant,
    ceiling: Duration,
}

impl ExecutionBudget {
    /// Start a budget now
    #[inline]
    #[must_use]
    pub fn start(ceiling: Duration) -> Self {
        Self {
            started: Instant::now(),
            ceiling,
        }
    }

    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    #[inline]
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Time left before the ceiling, zero once past it
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.ceiling.saturating_sub(self.elapsed())
    }

    /// True if at least `needed` remains
    #[inline]
    #[must_use]
    pub fn allows(&self, needed: Duration) -> bool {
        !self.remaining().is_zero() && self.remaining() >= needed
    }

    /// Fail with `ExecutionBudgetExceeded` unless `needed` remains
    ///
    /// # Errors
    /// Returns error naming `stage` when the budget is too small
    pub fn check(&self, stage: &'static str, needed: Duration) -> Result<(), GenerationError> {
        if self.allows(needed) {
            Ok(())
        } else {
            Err(GenerationError::ExecutionBudgetExceeded {
                stage,
                elapsed_ms: self.elapsed_ms(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_budget_allows_small_stage() {
        let budget = ExecutionBudget::start(Duration::from_secs(60));
        assert!(budget.allows(Duration::from_millis(10)));
        assert!(budget.check("template", Duration::ZERO).is_ok());
    }

    #[test]
    fn stage_larger_than_budget_is_refused() {
        let budget = ExecutionBudget::start(Duration::from_millis(100));
        let err = budget.check("template", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(
            err,
            GenerationError::ExecutionBudgetExceeded { stage: "template", .. }
        ));
    }

    #[test]
    fn exhausted_budget_refuses_everything() {
        let budget = ExecutionBudget::start(Duration::ZERO);
        assert!(!budget.allows(Duration::ZERO));
        assert_eq!(budget.remaining(), Duration::ZERO);
    }
}
