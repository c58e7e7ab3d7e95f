//! Population management with biased fitness.
//!
//! Two sub-populations (feasible and infeasible) grow to
//! `min_pop_size + generation_size` members and are then culled back to
//! `min_pop_size` by repeatedly dropping the member with the worst biased
//! fitness: a blend of objective rank and diversity rank, where diversity
//! is the mean broken-pairs distance to the member's closest peers.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::evaluation::CostEvaluator;
use crate::models::Solution;
use crate::Cost;

/// Parameters of the population scheme.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PopulationParams {
    /// Size each sub-population is culled back to.
    pub min_pop_size: usize,
    /// Number of members a sub-population may grow by before culling.
    pub generation_size: usize,
    /// Number of closest peers in the diversity measure, and weight anchor
    /// of the diversity rank.
    pub num_elite: usize,
}

impl Default for PopulationParams {
    fn default() -> Self {
        Self {
            min_pop_size: 25,
            generation_size: 40,
            num_elite: 5,
        }
    }
}

struct Item {
    solution: Solution,
    cost: Cost,
}

struct SubPopulation {
    items: Vec<Item>,
    params: PopulationParams,
}

impl SubPopulation {
    fn new(params: PopulationParams) -> Self {
        Self {
            items: Vec::new(),
            params,
        }
    }

    fn add(&mut self, solution: Solution, cost: Cost) {
        self.items.push(Item { solution, cost });
        if self.items.len() > self.params.min_pop_size + self.params.generation_size {
            self.purge();
        }
    }

    /// Removes worst-biased-fitness members until `min_pop_size` remain,
    /// recomputing fitness after each removal.
    fn purge(&mut self) {
        while self.items.len() > self.params.min_pop_size {
            let fitness = self.biased_fitness();
            let worst = fitness
                .iter()
                .enumerate()
                .max_by(|&(_, a), &(_, b)| a.total_cmp(b))
                .map(|(idx, _)| idx)
                .expect("sub-population is non-empty");
            self.items.remove(worst);
        }
    }

    /// Biased fitness of each member: `rankCost/n + (1 − nElite/n)·rankDiv/n`
    /// with 1-based ranks. Lower is better.
    fn biased_fitness(&self) -> Vec<f64> {
        let n = self.items.len();
        let num_elite = self.params.num_elite.min(n);

        let mut by_cost: Vec<usize> = (0..n).collect();
        by_cost.sort_by_key(|&i| (self.items[i].cost, i));

        let diversity: Vec<f64> = (0..n)
            .map(|i| {
                let mut dists: Vec<f64> = (0..n)
                    .filter(|&j| j != i)
                    .map(|j| {
                        self.items[i]
                            .solution
                            .broken_pairs_distance(&self.items[j].solution)
                    })
                    .collect();
                dists.sort_by(f64::total_cmp);
                dists.truncate(num_elite);
                if dists.is_empty() {
                    0.0
                } else {
                    dists.iter().sum::<f64>() / dists.len() as f64
                }
            })
            .collect();
        let mut by_div: Vec<usize> = (0..n).collect();
        // Higher diversity gets the better (lower) rank.
        by_div.sort_by(|&a, &b| diversity[b].total_cmp(&diversity[a]).then(a.cmp(&b)));

        let mut fitness = vec![0.0; n];
        let div_weight = 1.0 - num_elite as f64 / n as f64;
        for rank in 0..n {
            fitness[by_cost[rank]] += (rank + 1) as f64 / n as f64;
            fitness[by_div[rank]] += div_weight * (rank + 1) as f64 / n as f64;
        }
        fitness
    }
}

/// The feasible and infeasible sub-populations of the genetic search.
pub struct Population {
    feasible: SubPopulation,
    infeasible: SubPopulation,
}

impl Population {
    /// Creates an empty population.
    pub fn new(params: PopulationParams) -> Self {
        Self {
            feasible: SubPopulation::new(params),
            infeasible: SubPopulation::new(params),
        }
    }

    /// Inserts a solution into its sub-population; the evaluator fixes the
    /// cost the member is ranked by.
    pub fn add(&mut self, solution: Solution, ev: &CostEvaluator) {
        let cost = ev.penalised_cost(&solution);
        if solution.is_feasible() {
            self.feasible.add(solution, cost);
        } else {
            self.infeasible.add(solution, cost);
        }
    }

    /// Number of feasible members.
    pub fn num_feasible(&self) -> usize {
        self.feasible.items.len()
    }

    /// Number of infeasible members.
    pub fn num_infeasible(&self) -> usize {
        self.infeasible.items.len()
    }

    /// Total number of members.
    pub fn len(&self) -> usize {
        self.num_feasible() + self.num_infeasible()
    }

    /// Returns `true` if both sub-populations are empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes all members from both sub-populations.
    pub fn clear(&mut self) {
        self.feasible.items.clear();
        self.infeasible.items.clear();
    }

    /// Best objective among feasible members, if any.
    pub fn best_feasible_cost(&self) -> Option<Cost> {
        self.feasible.items.iter().map(|item| item.cost).min()
    }

    /// Best penalised objective among infeasible members, if any.
    pub fn best_infeasible_cost(&self) -> Option<Cost> {
        self.infeasible.items.iter().map(|item| item.cost).min()
    }

    /// Two parents chosen by independent binary tournaments over the union
    /// of both sub-populations.
    ///
    /// # Panics
    ///
    /// Panics if the population is empty.
    pub fn select<R: Rng>(&self, rng: &mut R) -> (&Solution, &Solution) {
        (self.tournament(rng), self.tournament(rng))
    }

    fn tournament<R: Rng>(&self, rng: &mut R) -> &Solution {
        assert!(!self.is_empty(), "cannot select from an empty population");
        let fit_feas = self.feasible.biased_fitness();
        let fit_infeas = self.infeasible.biased_fitness();

        let entry = |idx: usize| {
            if idx < self.feasible.items.len() {
                (&self.feasible.items[idx].solution, fit_feas[idx])
            } else {
                let j = idx - self.feasible.items.len();
                (&self.infeasible.items[j].solution, fit_infeas[j])
            }
        };

        let a = entry(rng.random_range(0..self.len()));
        let b = entry(rng.random_range(0..self.len()));
        if a.1 <= b.1 {
            a.0
        } else {
            b.0
        }
    }
}
