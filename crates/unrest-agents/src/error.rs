//! Error types for the unrest-agents crate.
//!
//! Every population error is a construction-time configuration error. Once a
//! population exists, none of its operations can fail.

/// Errors that can occur while building an agent population.
#[derive(Debug, thiserror::Error)]
pub enum PopulationError {
    /// A configuration parameter is out of range.
    #[error("invalid population parameter `{parameter}`: {reason}")]
    InvalidParameter {
        /// The offending parameter, e.g. `type_mix.student`.
        parameter: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A grievance prior could not be turned into a Beta distribution.
    #[error("invalid grievance prior `{parameter}`: {source}")]
    GrievancePrior {
        /// The offending prior, e.g. `grievance.merchant`.
        parameter: String,
        /// The underlying distribution error.
        source: rand_distr::BetaError,
    },
}

impl PopulationError {
    /// Shorthand for [`PopulationError::InvalidParameter`].
    pub fn invalid(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}
