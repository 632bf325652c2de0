//! Agent population state, initialization, and inspection for the Unrest
//! simulation.
//!
//! Agents are not objects. The population is a structure of parallel dense
//! arrays indexed by agent number `0..N`, so that every behavioral rule is a
//! whole-population pass and no rule can observe another rule's half-applied
//! same-step update.
//!
//! # Modules
//!
//! - [`config`] -- Population parameters ([`PopulationConfig`]): size,
//!   type mix, grievance priors, threshold range, province table.
//! - [`error`] -- Error types for population construction ([`PopulationError`]).
//! - [`geography`] -- Population-weighted province assignment.
//! - [`population`] -- [`AgentPopulation`]: the per-agent arrays, initial
//!   draws, and reset.
//! - [`snapshot`] -- Owned inspection copies with histogram and per-type
//!   summaries ([`PopulationSnapshot`]).

pub mod config;
pub mod error;
pub mod geography;
pub mod population;
pub mod snapshot;

// Re-export primary types at crate root for convenience.
pub use config::{BetaPrior, GrievancePriors, PopulationConfig, ThresholdRange, TypeMix};
pub use error::PopulationError;
pub use geography::{DEFAULT_PROVINCE, ProvinceShare};
pub use population::{AgentPopulation, AgentStateMut};
pub use snapshot::{GRIEVANCE_BIN_EDGES, GrievanceHistogram, PopulationSnapshot, TypeRate, TypeSummary};
