//! Error types for the `unrest-network` crate.
//!
//! All fallible operations in this crate return [`NetworkError`]. Every
//! failure happens at construction time; queries on a built network are
//! infallible.

/// Errors that can occur while building a social network.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// A configuration parameter is out of range.
    #[error("invalid network parameter `{parameter}`: {reason}")]
    InvalidParameter {
        /// The offending parameter name.
        parameter: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// An edge referenced a node outside `0..node_count`.
    #[error("edge endpoint {node} out of range for {node_count} nodes")]
    NodeOutOfRange {
        /// The out-of-range endpoint.
        node: usize,
        /// Number of nodes in the network.
        node_count: usize,
    },

    /// An edge connected a node to itself.
    #[error("self-loop on node {0}")]
    SelfLoop(usize),
}
