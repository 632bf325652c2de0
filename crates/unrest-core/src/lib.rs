//! Step engine, metrics aggregation, and run driver for the Unrest
//! simulation.
//!
//! # Modules
//!
//! - [`config`] -- [`SimulationConfig`] and its sections, YAML loading,
//!   environment overrides, validation.
//! - [`model`] -- [`ProtestModel`]: construction, `step`, reset, snapshot.
//! - `step` -- The eight state-mutating phases of a simulated day.
//! - [`metrics`] -- Aggregation of a step into a [`StepReport`].
//! - [`runner`] -- Context sources, observers, trials, Monte Carlo batches,
//!   benchmarking.
//!
//! [`StepReport`]: unrest_types::StepReport

pub mod config;
pub mod metrics;
pub mod model;
pub mod runner;
mod step;

pub use config::{
    BehaviorConfig, ConfigError, DefectionConfig, LoggingConfig, MerchantPressure, RunConfig,
    SimulationConfig,
};
pub use model::{ModelError, ProtestModel};
pub use runner::{
    BatchSummary, BenchmarkReport, ConstantContext, ContextSource, DistributionSummary,
    EndReason, FeedbackContext, NoOpObserver, ParticipationCollapse, RunControl, RunnerError,
    ScriptedContext, StepObserver, TrialOutcome, benchmark, run_batch, run_trial, run_trials,
    trial_seed,
};
