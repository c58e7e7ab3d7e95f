//! Genetic search orchestration.
//!
//! - [`crossover`] — SREX and OX recombination
//! - [`Population`] — sub-populations with biased fitness
//! - [`GeneticAlgorithm`] — the generation loop: select, recombine,
//!   educate, insert, adapt penalties, restart
//!
//! The solver is strictly single-threaded and deterministic for a given
//! seed: one [`ChaCha8Rng`] drives neighbour shuffling, parent selection,
//! crossover, and restarts.

pub mod crossover;
mod population;

pub use population::{Population, PopulationParams};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::evaluation::{CostEvaluator, PenaltyManager, PenaltyParams};
use crate::ga::crossover::{order_crossover, selective_route_exchange};
use crate::local_search::{compute_neighbours, LocalSearch, NeighbourhoodParams, SearchMode};
use crate::models::{ProblemData, Solution};
use crate::stop::StoppingCriterion;
use crate::Cost;

/// Parameters of the generation loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeneticAlgorithmParams {
    /// Probability of running the feasibility-enforced repair pass on an
    /// infeasible educated offspring.
    pub repair_probability: f64,
    /// Number of non-improving iterations before a restart.
    pub num_iters_no_improvement: usize,
}

impl Default for GeneticAlgorithmParams {
    fn default() -> Self {
        Self {
            repair_probability: 0.5,
            num_iters_no_improvement: 20_000,
        }
    }
}

/// All tunables of a solver run, with sensible defaults.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SolverConfig {
    pub genetic: GeneticAlgorithmParams,
    pub penalty: PenaltyParams,
    pub population: PopulationParams,
    pub neighbourhood: NeighbourhoodParams,
    /// Whether education applies the first or the best improving move.
    pub search_mode: SearchMode,
}

/// Per-generation snapshot reported alongside the final solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationStats {
    pub iteration: usize,
    pub num_feasible: usize,
    pub num_infeasible: usize,
    /// Best feasible objective so far, if a feasible solution exists.
    pub best_cost: Option<Cost>,
    pub load_penalties: Vec<Cost>,
    pub tw_penalty: Cost,
    pub dist_penalty: Cost,
    pub dur_penalty: Cost,
}

/// Outcome of a solver run.
pub struct SolveResult {
    /// Best feasible solution found or, failing that, the best penalised
    /// solution.
    pub best: Solution,
    /// One entry per generation.
    pub stats: Vec<GenerationStats>,
    /// Number of generations run.
    pub iterations: usize,
}

/// The hybrid genetic search loop.
pub struct GeneticAlgorithm<'a> {
    data: &'a ProblemData,
    config: SolverConfig,
    penalty_manager: PenaltyManager,
    population: Population,
    local_search: LocalSearch,
    rng: ChaCha8Rng,
    best: Solution,
    iters_since_improvement: usize,
}

impl<'a> GeneticAlgorithm<'a> {
    /// Creates a solver with default configuration.
    pub fn new(data: &'a ProblemData, seed: u64) -> Self {
        Self::with_config(data, seed, SolverConfig::default())
    }

    /// Creates a solver with the given configuration.
    pub fn with_config(data: &'a ProblemData, seed: u64, config: SolverConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let neighbours = compute_neighbours(data, &config.neighbourhood);
        let mut population = Population::new(config.population);
        let penalty_manager = PenaltyManager::new(data.num_load_dims(), config.penalty);

        let ev = penalty_manager.cost_evaluator();
        let mut best = Solution::random(data, &mut rng);
        population.add(best.clone(), &ev);
        for _ in 1..config.population.min_pop_size {
            let solution = Solution::random(data, &mut rng);
            if better(&ev, &solution, &best) {
                best = solution.clone();
            }
            population.add(solution, &ev);
        }

        Self {
            data,
            config,
            penalty_manager,
            population,
            local_search: LocalSearch::new(data, neighbours).with_mode(config.search_mode),
            rng,
            best,
            iters_since_improvement: 0,
        }
    }

    /// Runs the loop until the stopping criterion fires and returns the
    /// best solution seen.
    pub fn run(&mut self, stop: &mut dyn StoppingCriterion) -> SolveResult {
        let mut stats = Vec::new();
        let mut iteration = 0;

        loop {
            let ev = self.penalty_manager.cost_evaluator();
            if stop.should_stop(ev.cost(&self.best)) {
                break;
            }
            iteration += 1;
            self.step(&ev, iteration);
            stats.push(self.generation_stats(iteration));

            if self.iters_since_improvement >= self.config.genetic.num_iters_no_improvement {
                self.restart();
            }
        }

        info!(
            iterations = iteration,
            feasible = self.best.is_feasible(),
            "search finished"
        );
        SolveResult {
            best: self.best.clone(),
            stats,
            iterations: iteration,
        }
    }

    fn step(&mut self, ev: &CostEvaluator, iteration: usize) {
        let offspring = {
            let (p1, p2) = self.population.select(&mut self.rng);
            if self.use_order_crossover(p1, p2) {
                order_crossover(self.data, (p1, p2), &mut self.rng)
            } else {
                selective_route_exchange(self.data, ev, (p1, p2), &mut self.rng)
            }
        };

        let mut educated = self
            .local_search
            .search(self.data, &offspring, ev, &mut self.rng);
        self.penalty_manager.register(&educated);

        if !educated.is_feasible()
            && self.rng.random_bool(self.config.genetic.repair_probability)
        {
            let booster = self.penalty_manager.booster_cost_evaluator();
            let repaired = self
                .local_search
                .search(self.data, &educated, &booster, &mut self.rng);
            if repaired.is_feasible() {
                self.penalty_manager.register(&repaired);
                educated = repaired;
            }
        }

        if better(ev, &educated, &self.best) {
            debug!(
                iteration,
                cost = ev.penalised_cost(&educated),
                feasible = educated.is_feasible(),
                "new best solution"
            );
            self.best = educated.clone();
            self.iters_since_improvement = 0;
        } else {
            self.iters_since_improvement += 1;
        }
        self.population.add(educated, ev);
    }

    /// OX suits flat instances: a single vehicle type, no reloading, and
    /// parents that use equally many routes and serve every client.
    fn use_order_crossover(&self, p1: &Solution, p2: &Solution) -> bool {
        self.data.num_vehicle_types() == 1
            && !self.data.has_reloads()
            && p1.num_routes() == p2.num_routes()
            && p1.unassigned().is_empty()
            && p2.unassigned().is_empty()
    }

    /// Clears both sub-populations, reseeds them with random solutions, and
    /// resets the penalties.
    fn restart(&mut self) {
        info!("restarting after stagnation");
        self.population.clear();
        self.penalty_manager.reset();
        let ev = self.penalty_manager.cost_evaluator();
        for _ in 0..self.config.population.min_pop_size {
            self.population.add(Solution::random(self.data, &mut self.rng), &ev);
        }
        self.iters_since_improvement = 0;
    }

    fn generation_stats(&self, iteration: usize) -> GenerationStats {
        GenerationStats {
            iteration,
            num_feasible: self.population.num_feasible(),
            num_infeasible: self.population.num_infeasible(),
            best_cost: self
                .best
                .is_feasible()
                .then(|| self.penalty_manager.cost_evaluator().cost(&self.best)),
            load_penalties: self.penalty_manager.load_penalties().to_vec(),
            tw_penalty: self.penalty_manager.tw_penalty(),
            dist_penalty: self.penalty_manager.dist_penalty(),
            dur_penalty: self.penalty_manager.dur_penalty(),
        }
    }
}

/// Whether `candidate` beats `incumbent`: a feasible solution always beats
/// an infeasible one, otherwise the penalised objective decides.
fn better(ev: &CostEvaluator, candidate: &Solution, incumbent: &Solution) -> bool {
    match (candidate.is_feasible(), incumbent.is_feasible()) {
        (true, false) => true,
        (false, true) => false,
        _ => ev.penalised_cost(candidate) < ev.penalised_cost(incumbent),
    }
}

/// Solves the instance with default configuration: construct, run until the
/// criterion fires, return the best solution.
pub fn solve(
    data: &ProblemData,
    seed: u64,
    stop: &mut dyn StoppingCriterion,
) -> SolveResult {
    GeneticAlgorithm::new(data, seed).run(stop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Matrix;
    use crate::models::{Location, VehicleType};
    use crate::stop::MaxIterations;

    fn line_data() -> ProblemData {
        let mut locations = vec![Location::depot(0, 0)];
        for i in 0..8 {
            locations.push(Location::client(i as i64 + 1, 0).with_delivery(vec![3]));
        }
        let n = locations.len();
        let m = Matrix::from_fn(n, |i, j| (i as i64 - j as i64).abs());
        ProblemData::new(
            locations,
            1,
            vec![VehicleType::new(3, vec![10])],
            vec![m.clone()],
            vec![m],
            vec![],
        )
        .expect("valid instance")
    }

    #[test]
    fn test_solver_finds_feasible_solution() {
        let data = line_data();
        let result = solve(&data, 42, &mut MaxIterations::new(60));
        assert!(result.best.is_feasible());
        assert_eq!(result.iterations, 60);
        assert_eq!(result.stats.len(), 60);
    }

    #[test]
    fn test_solver_is_deterministic() {
        let data = line_data();
        let a = solve(&data, 7, &mut MaxIterations::new(30));
        let b = solve(&data, 7, &mut MaxIterations::new(30));
        assert_eq!(a.best.broken_pairs_distance(&b.best), 0.0);
        assert_eq!(
            a.best.routes().iter().map(|r| r.visits().to_vec()).collect::<Vec<_>>(),
            b.best.routes().iter().map(|r| r.visits().to_vec()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_best_improvement_mode_solves() {
        let data = line_data();
        let config = SolverConfig {
            search_mode: SearchMode::BestImprovement,
            ..SolverConfig::default()
        };
        let mut ga = GeneticAlgorithm::with_config(&data, 5, config);
        let result = ga.run(&mut MaxIterations::new(30));
        assert!(result.best.is_feasible());
    }

    #[test]
    fn test_stats_track_population() {
        let data = line_data();
        let result = solve(&data, 1, &mut MaxIterations::new(10));
        for stats in &result.stats {
            assert!(stats.num_feasible + stats.num_infeasible >= 1);
            assert!(!stats.load_penalties.is_empty());
        }
    }
}
