//! Social network construction and neighbor aggregation for the Unrest
//! simulation.
//!
//! The network is a fixed, undirected, loop-free adjacency relation over the
//! agent indices `0..N`, stored in compressed sparse row form so that every
//! per-step neighbor query is a single linear pass over the edge array.
//!
//! # Modules
//!
//! - [`builder`] -- Ring lattice, random, and small-world generators.
//! - [`config`] -- [`NetworkConfig`]: topology selector and its parameters.
//! - [`error`] -- Error types for network construction.
//! - [`graph`] -- [`SocialNetwork`]: the CSR adjacency and its queries.

pub mod builder;
pub mod config;
pub mod error;
pub mod graph;

// Re-export primary types at crate root.
pub use builder::build_network;
pub use config::NetworkConfig;
pub use error::NetworkError;
pub use graph::{NetworkStats, SocialNetwork};
