//! Shared type definitions for the Unrest simulation.
//!
//! This crate is the single source of truth for the records exchanged
//! between the simulation engine and its external collaborators (the macro
//! controller that supplies per-day context and consumes per-day metrics).
//!
//! # Modules
//!
//! - [`ids`] -- Identifier types (province indices, batch identifiers)
//! - [`enums`] -- Agent types, protest/regime states, network topologies
//! - [`context`] -- The per-step [`MacroContext`] input record
//! - [`report`] -- The per-step [`StepReport`] output record

pub mod context;
pub mod enums;
pub mod ids;
pub mod report;

// Re-export all public types at crate root for convenience.
pub use context::MacroContext;
pub use enums::{AgentType, ProtestState, RegimeState, Topology};
pub use ids::{BatchId, ProvinceId};
pub use report::{PerType, StepReport};
