//! Cost evaluation and penalty self-adaptation.
//!
//! - [`CostEvaluator`] — penalised objective of solutions and move deltas
//! - [`PenaltyManager`] — per-dimension penalty adaptation from offspring
//!   feasibility, sampled over a sliding window
//! - [`PenaltyParams`] — adaptation parameters

mod cost;
mod penalty;

pub use cost::CostEvaluator;
pub use penalty::{PenaltyManager, PenaltyParams};
