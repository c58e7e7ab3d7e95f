//! Penalised cost evaluation.

use crate::models::Solution;
use crate::{Cost, Distance, Duration, Load};

/// Evaluates the penalised objective.
///
/// The objective of a solution is its fixed vehicle cost plus distance- and
/// duration-proportional costs plus the prizes of the clients it does not
/// serve; infeasibility adds penalty terms that are linear in the excess
/// load (per dimension), time-warp, excess distance, and excess duration.
///
/// Penalty coefficients are owned by the
/// [`PenaltyManager`](crate::evaluation::PenaltyManager) and change only
/// between generations; an evaluator is an immutable snapshot of them.
///
/// # Examples
///
/// ```
/// use hgs_routing::evaluation::CostEvaluator;
///
/// let ev = CostEvaluator::new(vec![10], 5, 1, 1);
/// assert_eq!(ev.load_penalty(&[3]), 30);
/// assert_eq!(ev.tw_penalty(4), 20);
/// ```
#[derive(Debug, Clone)]
pub struct CostEvaluator {
    load_penalties: Vec<Cost>,
    tw_penalty: Cost,
    dist_penalty: Cost,
    dur_penalty: Cost,
}

impl CostEvaluator {
    /// Creates an evaluator with the given penalty coefficients.
    pub fn new(
        load_penalties: Vec<Cost>,
        tw_penalty: Cost,
        dist_penalty: Cost,
        dur_penalty: Cost,
    ) -> Self {
        Self {
            load_penalties,
            tw_penalty,
            dist_penalty,
            dur_penalty,
        }
    }

    /// Penalty for the given excess load, per dimension.
    pub fn load_penalty(&self, excess: &[Load]) -> Cost {
        excess
            .iter()
            .zip(&self.load_penalties)
            .fold(0, |acc: Cost, (&e, &p)| acc.saturating_add(p.saturating_mul(e)))
    }

    /// Penalty for the given time-warp.
    pub fn tw_penalty(&self, time_warp: Duration) -> Cost {
        self.tw_penalty.saturating_mul(time_warp)
    }

    /// Penalty for the given excess distance.
    pub fn dist_penalty(&self, excess: Distance) -> Cost {
        self.dist_penalty.saturating_mul(excess)
    }

    /// Penalty for the given excess duration.
    pub fn dur_penalty(&self, excess: Duration) -> Cost {
        self.dur_penalty.saturating_mul(excess)
    }

    /// Penalised cost of a solution: base objective plus all penalty terms.
    pub fn penalised_cost(&self, solution: &Solution) -> Cost {
        self.base_cost(solution)
            .saturating_add(self.load_penalty(solution.excess_load()))
            .saturating_add(self.tw_penalty(solution.time_warp()))
            .saturating_add(self.dist_penalty(solution.excess_distance()))
            .saturating_add(self.dur_penalty(solution.excess_duration()))
    }

    /// Objective of a feasible solution, or `Cost::MAX` if the solution is
    /// infeasible in any way.
    pub fn cost(&self, solution: &Solution) -> Cost {
        if solution.is_feasible() {
            self.base_cost(solution)
        } else {
            Cost::MAX
        }
    }

    fn base_cost(&self, solution: &Solution) -> Cost {
        solution
            .fixed_cost()
            .saturating_add(solution.distance_cost())
            .saturating_add(solution.duration_cost())
            .saturating_add(solution.uncollected_prizes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Matrix;
    use crate::models::{Location, ProblemData, Route, VehicleType};

    fn data_with_capacity(capacity: Load) -> ProblemData {
        let locations = vec![
            Location::depot(0, 0),
            Location::client(1, 0).with_delivery(vec![4]),
            Location::client(2, 0).with_delivery(vec![3]),
        ];
        let m = Matrix::from_fn(3, |i, j| (i as i64 - j as i64).abs());
        ProblemData::new(
            locations,
            1,
            vec![VehicleType::new(1, vec![capacity])],
            vec![m.clone()],
            vec![m],
            vec![],
        )
        .expect("valid instance")
    }

    #[test]
    fn test_feasible_cost_is_base_objective() {
        let data = data_with_capacity(10);
        let sol = Solution::new(&data, vec![Route::new(&data, vec![1, 2], 0)]);
        let ev = CostEvaluator::new(vec![100], 100, 100, 100);
        assert_eq!(ev.cost(&sol), 4);
        assert_eq!(ev.penalised_cost(&sol), 4);
    }

    #[test]
    fn test_infeasible_cost_is_max() {
        let data = data_with_capacity(5);
        let sol = Solution::new(&data, vec![Route::new(&data, vec![1, 2], 0)]);
        let ev = CostEvaluator::new(vec![10], 0, 0, 0);
        assert_eq!(ev.cost(&sol), Cost::MAX);
        // Excess load 2, penalty 10 each, on top of distance 4.
        assert_eq!(ev.penalised_cost(&sol), 4 + 20);
    }

    #[test]
    fn test_uncollected_prizes_in_objective() {
        let locations = vec![
            Location::depot(0, 0),
            Location::client(1, 0).with_prize(10).with_required(false),
            Location::client(2, 0).with_prize(25).with_required(false),
        ];
        let m = Matrix::from_fn(3, |i, j| (i as i64 - j as i64).abs());
        let data = ProblemData::new(
            locations,
            1,
            vec![VehicleType::new(1, vec![10])],
            vec![m.clone()],
            vec![m],
            vec![],
        )
        .expect("valid instance");
        let sol = Solution::new(&data, vec![Route::new(&data, vec![1], 0)]);
        let ev = CostEvaluator::new(vec![0], 0, 0, 0);
        // Distance 2, plus the prize of the omitted client 2.
        assert_eq!(ev.cost(&sol), 2 + 25);
    }

    #[test]
    fn test_saturating_penalties() {
        let ev = CostEvaluator::new(vec![Cost::MAX / 2], Cost::MAX / 2, 0, 0);
        assert_eq!(ev.load_penalty(&[100]), Cost::MAX);
        assert_eq!(ev.tw_penalty(100), Cost::MAX);
    }
}
