//! Stopping criteria.
//!
//! A criterion is polled once per generation with the best objective seen
//! so far; once it returns `true` it keeps returning `true`.
//!
//! - [`MaxIterations`] — stop after a fixed number of polls
//! - [`MaxRuntime`] — stop after a wall-clock budget
//! - [`NoImprovement`] — stop after too many polls without a better best
//! - [`MultipleCriteria`] — combine criteria with any/all semantics

use std::time::{Duration, Instant};

use crate::Cost;

/// Decides when the search should halt.
pub trait StoppingCriterion {
    /// Returns `true` if the search should stop. The signal is monotone:
    /// after the first `true` every later call is also `true`.
    fn should_stop(&mut self, best_cost: Cost) -> bool;
}

/// Stops after a fixed number of iterations.
#[derive(Debug, Clone)]
pub struct MaxIterations {
    max_iterations: usize,
    iterations: usize,
}

impl MaxIterations {
    /// Creates a criterion that stops after `max_iterations` polls.
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            iterations: 0,
        }
    }
}

impl StoppingCriterion for MaxIterations {
    fn should_stop(&mut self, _best_cost: Cost) -> bool {
        self.iterations = self.iterations.saturating_add(1);
        self.iterations > self.max_iterations
    }
}

/// Stops once a wall-clock budget is spent. The clock starts at the first
/// poll.
#[derive(Debug, Clone)]
pub struct MaxRuntime {
    budget: Duration,
    started: Option<Instant>,
    stopped: bool,
}

impl MaxRuntime {
    /// Creates a criterion with the given wall-clock budget.
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            started: None,
            stopped: false,
        }
    }
}

impl StoppingCriterion for MaxRuntime {
    fn should_stop(&mut self, _best_cost: Cost) -> bool {
        let start = *self.started.get_or_insert_with(Instant::now);
        self.stopped = self.stopped || start.elapsed() >= self.budget;
        self.stopped
    }
}

/// Stops after a number of consecutive polls without improvement of the
/// best objective.
#[derive(Debug, Clone)]
pub struct NoImprovement {
    max_iterations: usize,
    iterations: usize,
    target: Option<Cost>,
    stopped: bool,
}

impl NoImprovement {
    /// Creates a criterion that stops after `max_iterations` polls without
    /// a strictly better best objective.
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            iterations: 0,
            target: None,
            stopped: false,
        }
    }
}

impl StoppingCriterion for NoImprovement {
    fn should_stop(&mut self, best_cost: Cost) -> bool {
        match self.target {
            Some(target) if best_cost < target => {
                self.target = Some(best_cost);
                self.iterations = 0;
            }
            Some(_) => self.iterations = self.iterations.saturating_add(1),
            None => self.target = Some(best_cost),
        }
        self.stopped = self.stopped || self.iterations >= self.max_iterations;
        self.stopped
    }
}

/// How [`MultipleCriteria`] combines its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineMode {
    /// Stop as soon as any member says stop.
    Any,
    /// Stop only when all members say stop.
    All,
}

/// Combines several criteria. Every member is polled on every call so each
/// keeps its own bookkeeping current.
pub struct MultipleCriteria {
    criteria: Vec<Box<dyn StoppingCriterion>>,
    mode: CombineMode,
}

impl MultipleCriteria {
    /// Creates a combined criterion.
    pub fn new(criteria: Vec<Box<dyn StoppingCriterion>>, mode: CombineMode) -> Self {
        Self { criteria, mode }
    }
}

impl StoppingCriterion for MultipleCriteria {
    fn should_stop(&mut self, best_cost: Cost) -> bool {
        let votes: Vec<bool> = self
            .criteria
            .iter_mut()
            .map(|c| c.should_stop(best_cost))
            .collect();
        match self.mode {
            CombineMode::Any => votes.iter().any(|&v| v),
            CombineMode::All => !votes.is_empty() && votes.iter().all(|&v| v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_iterations() {
        let mut stop = MaxIterations::new(3);
        assert!(!stop.should_stop(100));
        assert!(!stop.should_stop(100));
        assert!(!stop.should_stop(100));
        assert!(stop.should_stop(100));
        assert!(stop.should_stop(50));
    }

    #[test]
    fn test_max_runtime_zero_budget() {
        let mut stop = MaxRuntime::new(Duration::ZERO);
        assert!(stop.should_stop(100));
        assert!(stop.should_stop(100));
    }

    #[test]
    fn test_max_runtime_generous_budget() {
        let mut stop = MaxRuntime::new(Duration::from_secs(3600));
        assert!(!stop.should_stop(100));
    }

    #[test]
    fn test_no_improvement_resets_on_better() {
        let mut stop = NoImprovement::new(2);
        assert!(!stop.should_stop(100));
        assert!(!stop.should_stop(100));
        assert!(stop.should_stop(100));
        // Monotone even if a better value arrives afterwards.
        // (A fresh criterion would reset, a stopped one keeps counting up.)
        let mut fresh = NoImprovement::new(2);
        assert!(!fresh.should_stop(100));
        assert!(!fresh.should_stop(90));
        assert!(!fresh.should_stop(90));
        assert!(fresh.should_stop(90));
    }

    #[test]
    fn test_multiple_any() {
        let mut stop = MultipleCriteria::new(
            vec![
                Box::new(MaxIterations::new(100)),
                Box::new(MaxIterations::new(1)),
            ],
            CombineMode::Any,
        );
        assert!(!stop.should_stop(10));
        assert!(stop.should_stop(10));
    }

    #[test]
    fn test_multiple_all() {
        let mut stop = MultipleCriteria::new(
            vec![
                Box::new(MaxIterations::new(2)),
                Box::new(MaxIterations::new(1)),
            ],
            CombineMode::All,
        );
        assert!(!stop.should_stop(10));
        assert!(!stop.should_stop(10));
        assert!(stop.should_stop(10));
    }
}
