//! Penalty coefficient self-adaptation.

use serde::{Deserialize, Serialize};

use crate::evaluation::CostEvaluator;
use crate::models::Solution;
use crate::Cost;

/// Parameters of the penalty adaptation scheme.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PenaltyParams {
    /// Initial penalty per unit excess load, for every dimension.
    pub init_load_penalty: Cost,
    /// Initial penalty per unit time-warp.
    pub init_tw_penalty: Cost,
    /// Initial penalty per unit excess distance.
    pub init_dist_penalty: Cost,
    /// Initial penalty per unit excess duration.
    pub init_dur_penalty: Cost,
    /// Number of registered offspring between penalty updates.
    pub solutions_between_updates: usize,
    /// Target fraction of feasible offspring.
    pub target_feasible: f64,
    /// Dead band around the target within which penalties are left alone.
    pub feasibility_tolerance: f64,
    /// Lower clamp for every penalty.
    pub min_penalty: Cost,
    /// Upper clamp for every penalty; also the booster penalty.
    pub max_penalty: Cost,
}

impl Default for PenaltyParams {
    fn default() -> Self {
        Self {
            init_load_penalty: 20,
            init_tw_penalty: 6,
            init_dist_penalty: 6,
            init_dur_penalty: 6,
            solutions_between_updates: 50,
            target_feasible: 0.2,
            feasibility_tolerance: 0.05,
            min_penalty: 1,
            max_penalty: 100_000_000,
        }
    }
}

/// Tracks offspring feasibility per constraint dimension and adapts the
/// penalty coefficients between generations.
///
/// Each dimension (every load dimension, time-warp, excess distance, excess
/// duration) evolves independently: too few feasible offspring scale its
/// penalty up by roughly 1.3×, too many scale it down by the same factor,
/// clamped to `[min_penalty, max_penalty]`.
///
/// # Examples
///
/// ```
/// use hgs_routing::evaluation::{PenaltyManager, PenaltyParams};
///
/// let pm = PenaltyManager::new(1, PenaltyParams::default());
/// let ev = pm.cost_evaluator();
/// assert_eq!(ev.load_penalty(&[1]), 20);
/// ```
#[derive(Debug, Clone)]
pub struct PenaltyManager {
    params: PenaltyParams,
    load_penalties: Vec<Cost>,
    tw_penalty: Cost,
    dist_penalty: Cost,
    dur_penalty: Cost,
    load_feasible: Vec<Vec<bool>>,
    tw_feasible: Vec<bool>,
    dist_feasible: Vec<bool>,
    dur_feasible: Vec<bool>,
}

impl PenaltyManager {
    /// Creates a manager for the given number of load dimensions.
    pub fn new(num_load_dims: usize, params: PenaltyParams) -> Self {
        Self {
            params,
            load_penalties: vec![params.init_load_penalty; num_load_dims],
            tw_penalty: params.init_tw_penalty,
            dist_penalty: params.init_dist_penalty,
            dur_penalty: params.init_dur_penalty,
            load_feasible: vec![Vec::new(); num_load_dims],
            tw_feasible: Vec::new(),
            dist_feasible: Vec::new(),
            dur_feasible: Vec::new(),
        }
    }

    /// Records the per-dimension feasibility of a new offspring. Once the
    /// window is full, all penalties are updated and the window cleared.
    pub fn register(&mut self, solution: &Solution) {
        for (d, window) in self.load_feasible.iter_mut().enumerate() {
            window.push(solution.excess_load()[d] == 0);
        }
        self.tw_feasible.push(solution.time_warp() == 0);
        self.dist_feasible.push(solution.excess_distance() == 0);
        self.dur_feasible.push(solution.excess_duration() == 0);

        if self.tw_feasible.len() < self.params.solutions_between_updates {
            return;
        }

        for d in 0..self.load_penalties.len() {
            self.load_penalties[d] =
                updated(&self.params, self.load_penalties[d], &self.load_feasible[d]);
            self.load_feasible[d].clear();
        }
        self.tw_penalty = updated(&self.params, self.tw_penalty, &self.tw_feasible);
        self.dist_penalty = updated(&self.params, self.dist_penalty, &self.dist_feasible);
        self.dur_penalty = updated(&self.params, self.dur_penalty, &self.dur_feasible);
        self.tw_feasible.clear();
        self.dist_feasible.clear();
        self.dur_feasible.clear();
    }

    /// An evaluator snapshot of the current penalties.
    pub fn cost_evaluator(&self) -> CostEvaluator {
        CostEvaluator::new(
            self.load_penalties.clone(),
            self.tw_penalty,
            self.dist_penalty,
            self.dur_penalty,
        )
    }

    /// An evaluator with every penalty at the clamp maximum, used for the
    /// feasibility-enforced local search pass.
    pub fn booster_cost_evaluator(&self) -> CostEvaluator {
        let max = self.params.max_penalty;
        CostEvaluator::new(vec![max; self.load_penalties.len()], max, max, max)
    }

    /// Restores the initial penalties and clears the windows.
    pub fn reset(&mut self) {
        *self = Self::new(self.load_penalties.len(), self.params);
    }

    /// Current load penalties, per dimension.
    pub fn load_penalties(&self) -> &[Cost] {
        &self.load_penalties
    }

    /// Current time-warp penalty.
    pub fn tw_penalty(&self) -> Cost {
        self.tw_penalty
    }

    /// Current excess-distance penalty.
    pub fn dist_penalty(&self) -> Cost {
        self.dist_penalty
    }

    /// Current excess-duration penalty.
    pub fn dur_penalty(&self) -> Cost {
        self.dur_penalty
    }
}

fn updated(params: &PenaltyParams, penalty: Cost, window: &[bool]) -> Cost {
    let feasible = window.iter().filter(|&&f| f).count() as f64;
    let fraction = feasible / window.len().max(1) as f64;

    let next = if fraction < params.target_feasible - params.feasibility_tolerance {
        // Scale up by ~1.3, by at least one.
        penalty.saturating_add((3 * penalty / 10).max(1))
    } else if fraction > params.target_feasible + params.feasibility_tolerance {
        10 * penalty / 13
    } else {
        penalty
    };

    next.clamp(params.min_penalty, params.max_penalty)
}
