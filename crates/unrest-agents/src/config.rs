//! Population parameters.
//!
//! [`PopulationConfig`] bundles everything needed to allocate and draw the
//! initial agent arrays: population size, the type mix, the per-type Beta
//! priors for initial grievance, the uniform threshold range, and the
//! optional province table. Defaults reproduce the reference calibration.

use serde::{Deserialize, Serialize};
use unrest_types::{AgentType, PerType};

use crate::error::PopulationError;
use crate::geography::ProvinceShare;

/// Tolerance on the type-mix share sum.
const SHARE_SUM_TOLERANCE: f64 = 1e-6;

/// Population configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of agents.
    #[serde(default = "default_size")]
    pub size: usize,

    /// Fraction of the population assigned to each type.
    #[serde(default)]
    pub type_mix: TypeMix,

    /// Initial grievance priors per type.
    #[serde(default)]
    pub grievance: GrievancePriors,

    /// Range of the uniform base-threshold draw.
    #[serde(default)]
    pub threshold_range: ThresholdRange,

    /// Optional province table. Empty means one national province.
    #[serde(default)]
    pub provinces: Vec<ProvinceShare>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_size(),
            type_mix: TypeMix::default(),
            grievance: GrievancePriors::default(),
            threshold_range: ThresholdRange::default(),
            provinces: Vec::new(),
        }
    }
}

impl PopulationConfig {
    /// Check every parameter.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::InvalidParameter`] naming the first
    /// parameter that is out of range.
    pub fn validate(&self) -> Result<(), PopulationError> {
        if self.size == 0 {
            return Err(PopulationError::invalid("size", "population size must be positive"));
        }
        self.type_mix.counts(self.size)?;
        self.grievance.validate()?;
        self.threshold_range.validate()?;
        crate::geography::validate_shares(&self.provinces)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Type mix
// ---------------------------------------------------------------------------

/// Fraction of the population assigned to each agent type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeMix {
    /// Student share (default 0.15).
    pub student: f64,
    /// Merchant share (default 0.20).
    pub merchant: f64,
    /// Conscript share (default 0.10).
    pub conscript: f64,
    /// Hardliner share (default 0.05).
    pub hardliner: f64,
    /// Civilian share (default 0.50).
    pub civilian: f64,
}

impl Default for TypeMix {
    fn default() -> Self {
        Self {
            student: 0.15,
            merchant: 0.20,
            conscript: 0.10,
            hardliner: 0.05,
            civilian: 0.50,
        }
    }
}

impl TypeMix {
    /// Share configured for `agent_type`.
    pub const fn share(&self, agent_type: AgentType) -> f64 {
        match agent_type {
            AgentType::Student => self.student,
            AgentType::Merchant => self.merchant,
            AgentType::Conscript => self.conscript,
            AgentType::Hardliner => self.hardliner,
            AgentType::Civilian => self.civilian,
        }
    }

    /// Agent counts per type for a population of `size`.
    ///
    /// The four minority types get `round(share × size)`; civilians take
    /// whatever remains, so the counts always sum to `size` exactly.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::InvalidParameter`] if a share is outside
    /// `[0, 1]`, the shares do not sum to 1, or the rounded minority counts
    /// exceed `size`.
    pub fn counts(&self, size: usize) -> Result<PerType<usize>, PopulationError> {
        for agent_type in AgentType::ALL {
            let share = self.share(agent_type);
            if !(0.0..=1.0).contains(&share) {
                return Err(PopulationError::invalid(
                    format!("type_mix.{agent_type}"),
                    format!("share must be within [0, 1], got {share}"),
                ));
            }
        }
        let total: f64 = AgentType::ALL.iter().map(|&t| self.share(t)).sum();
        if (total - 1.0).abs() > SHARE_SUM_TOLERANCE {
            return Err(PopulationError::invalid(
                "type_mix",
                format!("type shares must sum to 1, got {total}"),
            ));
        }

        let mut counts = PerType::splat(0_usize);
        let mut assigned: usize = 0;
        for agent_type in AgentType::ALL {
            if agent_type == AgentType::Civilian {
                continue;
            }
            let count = rounded_count(self.share(agent_type), size);
            counts.set(agent_type, count);
            assigned = assigned.saturating_add(count);
        }
        let Some(civilians) = size.checked_sub(assigned) else {
            return Err(PopulationError::invalid(
                "type_mix",
                format!("rounded type counts ({assigned}) exceed population size ({size})"),
            ));
        };
        counts.set(AgentType::Civilian, civilians);
        Ok(counts)
    }
}

/// `round(share × size)` as a count. `share` is already validated to
/// `[0, 1]`, so the product lies in `[0, size]`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn rounded_count(share: f64, size: usize) -> usize {
    let raw = (share * size as f64).round();
    (raw as usize).min(size)
}

// ---------------------------------------------------------------------------
// Grievance priors
// ---------------------------------------------------------------------------

/// Parameters of a Beta distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaPrior {
    /// Shape α.
    pub alpha: f64,
    /// Shape β.
    pub beta: f64,
}

impl BetaPrior {
    /// Construct a prior.
    pub const fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    /// Distribution mean `α / (α + β)`.
    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    fn validate(&self, parameter: &str) -> Result<(), PopulationError> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if ok(self.alpha) && ok(self.beta) {
            Ok(())
        } else {
            Err(PopulationError::invalid(
                parameter,
                format!(
                    "Beta shape parameters must be positive, got ({}, {})",
                    self.alpha, self.beta
                ),
            ))
        }
    }
}

/// Initial grievance priors. Hardliners have no prior: their grievance is
/// always exactly zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrievancePriors {
    /// Student prior (default Beta(4, 2), mean ≈ 0.67).
    pub student: BetaPrior,
    /// Merchant prior (default Beta(3, 3), mean 0.50).
    pub merchant: BetaPrior,
    /// Conscript prior (default Beta(1, 4), mean 0.20).
    pub conscript: BetaPrior,
    /// Civilian prior (default Beta(2, 3), mean 0.40).
    pub civilian: BetaPrior,
}

impl Default for GrievancePriors {
    fn default() -> Self {
        Self {
            student: BetaPrior::new(4.0, 2.0),
            merchant: BetaPrior::new(3.0, 3.0),
            conscript: BetaPrior::new(1.0, 4.0),
            civilian: BetaPrior::new(2.0, 3.0),
        }
    }
}

impl GrievancePriors {
    /// Prior for `agent_type`, or `None` for hardliners.
    pub const fn prior(&self, agent_type: AgentType) -> Option<BetaPrior> {
        match agent_type {
            AgentType::Student => Some(self.student),
            AgentType::Merchant => Some(self.merchant),
            AgentType::Conscript => Some(self.conscript),
            AgentType::Civilian => Some(self.civilian),
            AgentType::Hardliner => None,
        }
    }

    fn validate(&self) -> Result<(), PopulationError> {
        for agent_type in AgentType::ALL {
            if let Some(prior) = self.prior(agent_type) {
                prior.validate(&format!("grievance.{agent_type}"))?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Threshold range
// ---------------------------------------------------------------------------

/// Inclusive range of the uniform base-threshold draw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdRange {
    /// Lower bound (default 0.3).
    pub low: f64,
    /// Upper bound (default 0.8).
    pub high: f64,
}

impl Default for ThresholdRange {
    fn default() -> Self {
        Self { low: 0.3, high: 0.8 }
    }
}

impl ThresholdRange {
    fn validate(&self) -> Result<(), PopulationError> {
        if !(0.0..=1.0).contains(&self.low) || !(0.0..=1.0).contains(&self.high) {
            return Err(PopulationError::invalid(
                "threshold_range",
                format!("bounds must be within [0, 1], got [{}, {}]", self.low, self.high),
            ));
        }
        if self.low > self.high {
            return Err(PopulationError::invalid(
                "threshold_range",
                format!("low ({}) must not exceed high ({})", self.low, self.high),
            ));
        }
        Ok(())
    }
}

const fn default_size() -> usize {
    10_000
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_mix_gives_exact_counts_for_ten_thousand() {
        let counts = TypeMix::default().counts(10_000).unwrap();
        assert_eq!(counts.get(AgentType::Student), 1_500);
        assert_eq!(counts.get(AgentType::Merchant), 2_000);
        assert_eq!(counts.get(AgentType::Conscript), 1_000);
        assert_eq!(counts.get(AgentType::Hardliner), 500);
        assert_eq!(counts.get(AgentType::Civilian), 5_000);
    }

    #[test]
    fn counts_always_sum_to_size() {
        for size in [1, 7, 10, 333, 1_001, 9_999] {
            let counts = TypeMix::default().counts(size).unwrap();
            let total: usize = counts.iter().map(|(_, c)| c).sum();
            assert_eq!(total, size);
        }
    }

    #[test]
    fn shares_not_summing_to_one_are_rejected() {
        let mix = TypeMix {
            civilian: 0.6,
            ..TypeMix::default()
        };
        let err = mix.counts(100).err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("sum to 1"), "{err}");
    }

    #[test]
    fn negative_share_is_rejected_by_name() {
        let mix = TypeMix {
            student: -0.05,
            civilian: 0.70,
            ..TypeMix::default()
        };
        assert!(matches!(
            mix.counts(100),
            Err(PopulationError::InvalidParameter { ref parameter, .. }) if parameter == "type_mix.student"
        ));
    }

    #[test]
    fn rounding_overflow_is_rejected() {
        // Each minority share rounds up on a population of 2.
        let mix = TypeMix {
            student: 0.25,
            merchant: 0.25,
            conscript: 0.25,
            hardliner: 0.25,
            civilian: 0.0,
        };
        assert!(mix.counts(2).is_err());
    }

    #[test]
    fn default_prior_means_match_calibration() {
        let priors = GrievancePriors::default();
        assert!((priors.student.mean() - 4.0 / 6.0).abs() < 1e-12);
        assert!((priors.merchant.mean() - 0.5).abs() < 1e-12);
        assert!((priors.civilian.mean() - 0.4).abs() < 1e-12);
        assert!((priors.conscript.mean() - 0.2).abs() < 1e-12);
        assert!(priors.prior(AgentType::Hardliner).is_none());
    }

    #[test]
    fn non_positive_prior_is_rejected() {
        let config = PopulationConfig {
            grievance: GrievancePriors {
                merchant: BetaPrior::new(0.0, 3.0),
                ..GrievancePriors::default()
            },
            ..PopulationConfig::default()
        };
        let err = config.validate().err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("grievance.merchant"), "{err}");
    }

    #[test]
    fn inverted_threshold_range_is_rejected() {
        let config = PopulationConfig {
            threshold_range: ThresholdRange { low: 0.9, high: 0.1 },
            ..PopulationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_size_is_rejected() {
        let config = PopulationConfig {
            size: 0,
            ..PopulationConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
