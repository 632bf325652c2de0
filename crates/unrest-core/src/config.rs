//! Configuration loading and typed config structures for the Unrest
//! simulation.
//!
//! The canonical configuration lives in `unrest-config.yaml` at the project
//! root. Every field has a default matching the reference calibration, so
//! an empty document is a valid configuration. Sections validate
//! themselves; [`SimulationConfig::validate`] runs them all and is called
//! by model construction, so invalid parameters fail before any step runs.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;
use unrest_agents::{PopulationConfig, PopulationError};
use unrest_network::{NetworkConfig, NetworkError};
use unrest_types::MacroContext;

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A behavior, defection, or run parameter is out of range.
    #[error("invalid parameter `{parameter}`: {reason}")]
    Invalid {
        /// Dotted path of the offending parameter.
        parameter: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The population section is invalid.
    #[error(transparent)]
    Population(#[from] PopulationError),

    /// The network section is invalid.
    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Random seed. `None` seeds from the operating system and makes runs
    /// non-reproducible.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Population size, type mix, priors, provinces.
    #[serde(default)]
    pub population: PopulationConfig,

    /// Social network topology.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Grievance, threshold, and activation rules.
    #[serde(default)]
    pub behavior: BehaviorConfig,

    /// Security-force defection rules.
    #[serde(default)]
    pub defection: DefectionConfig,

    /// Run driver settings.
    #[serde(default)]
    pub run: RunConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `UNREST_SEED` overrides `seed`
    /// - `UNREST_TRIALS` overrides `run.trials`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, applying environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `UNREST_SEED` and `UNREST_TRIALS`. Unparseable values are
    /// logged and ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("UNREST_SEED") {
            match val.trim().parse::<u64>() {
                Ok(seed) => self.seed = Some(seed),
                Err(e) => warn!(value = %val, error = %e, "Ignoring unparseable UNREST_SEED"),
            }
        }
        if let Ok(val) = std::env::var("UNREST_TRIALS") {
            match val.trim().parse::<usize>() {
                Ok(trials) => self.run.trials = trials,
                Err(e) => warn!(value = %val, error = %e, "Ignoring unparseable UNREST_TRIALS"),
            }
        }
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns the first failing section's error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_model()?;
        self.run.validate()?;
        Ok(())
    }

    /// Validate only the sections a [`ProtestModel`](crate::ProtestModel)
    /// reads: population, network, behavior, and defection.
    ///
    /// # Errors
    ///
    /// Returns the first failing section's error.
    pub fn validate_model(&self) -> Result<(), ConfigError> {
        self.population.validate()?;
        self.network.validate(self.population.size)?;
        self.behavior.validate()?;
        self.defection.validate()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Behavior
// ---------------------------------------------------------------------------

/// Where the merchant economic boost is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MerchantPressure {
    /// Added to the activation signal on the day it is computed. Persistent
    /// grievance never sees it, so it does not compound across days.
    #[default]
    Transient,
    /// Added to persistent merchant grievance during the grievance update,
    /// so sustained stress compounds until clamped at 1.
    Accumulating,
}

/// Grievance, threshold, and activation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Weight `w` of the neighbor-active fraction in the activation signal.
    #[serde(default = "default_neighbor_influence_weight")]
    pub neighbor_influence_weight: f64,

    /// Maximum merchant boost at full economic stress.
    #[serde(default = "default_economic_sensitivity")]
    pub economic_sensitivity: f64,

    /// Rial rate at or below which merchants feel no stress.
    #[serde(default = "default_rial_stress_floor")]
    pub rial_stress_floor: f64,

    /// Rial rate at or above which merchant stress saturates.
    #[serde(default = "default_rial_stress_ceiling")]
    pub rial_stress_ceiling: f64,

    /// Placement of the merchant boost.
    #[serde(default)]
    pub merchant_pressure: MerchantPressure,

    /// Factor applied to merchant grievance while concessions are offered.
    #[serde(default = "default_concession_relief")]
    pub concession_relief: f64,

    /// Threshold offset for students while the protest is escalating.
    #[serde(default = "default_student_escalation_offset")]
    pub student_escalation_offset: f64,

    /// Threshold offset for any agent with a hardliner neighbor.
    #[serde(default = "default_hardliner_suppression_offset")]
    pub hardliner_suppression_offset: f64,

    /// Factor applied to neighbor influence under internet blackout.
    #[serde(default = "default_blackout_dampening")]
    pub blackout_dampening: f64,

    /// Consecutive active days after which exhaustion sets in.
    #[serde(default = "default_exhaustion_days")]
    pub exhaustion_days: u32,

    /// Grievance lost per day by exhausted agents.
    #[serde(default = "default_exhaustion_decay")]
    pub exhaustion_decay: f64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            neighbor_influence_weight: default_neighbor_influence_weight(),
            economic_sensitivity: default_economic_sensitivity(),
            rial_stress_floor: default_rial_stress_floor(),
            rial_stress_ceiling: default_rial_stress_ceiling(),
            merchant_pressure: MerchantPressure::default(),
            concession_relief: default_concession_relief(),
            student_escalation_offset: default_student_escalation_offset(),
            hardliner_suppression_offset: default_hardliner_suppression_offset(),
            blackout_dampening: default_blackout_dampening(),
            exhaustion_days: default_exhaustion_days(),
            exhaustion_decay: default_exhaustion_decay(),
        }
    }
}

impl BehaviorConfig {
    /// Merchant economic stress in `[0, 1]` for a rial rate.
    ///
    /// Linear between the floor and ceiling, so there is no single-day
    /// cliff. No rate means no stress.
    pub fn economic_stress(&self, rial_rate: Option<f64>) -> f64 {
        let Some(rate) = rial_rate else {
            return 0.0;
        };
        let span = self.rial_stress_ceiling - self.rial_stress_floor;
        let stress = (rate - self.rial_stress_floor) / span;
        if stress.is_nan() { 0.0 } else { stress.clamp(0.0, 1.0) }
    }

    /// Merchant boost for a rial rate.
    pub fn merchant_boost(&self, rial_rate: Option<f64>) -> f64 {
        self.economic_sensitivity * self.economic_stress(rial_rate)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_non_negative("behavior.neighbor_influence_weight", self.neighbor_influence_weight)?;
        check_non_negative("behavior.economic_sensitivity", self.economic_sensitivity)?;
        check_unit("behavior.concession_relief", self.concession_relief)?;
        check_unit("behavior.blackout_dampening", self.blackout_dampening)?;
        check_unit("behavior.exhaustion_decay", self.exhaustion_decay)?;
        check_finite("behavior.student_escalation_offset", self.student_escalation_offset)?;
        check_finite("behavior.hardliner_suppression_offset", self.hardliner_suppression_offset)?;
        check_finite("behavior.rial_stress_floor", self.rial_stress_floor)?;
        check_finite("behavior.rial_stress_ceiling", self.rial_stress_ceiling)?;
        if self.rial_stress_ceiling <= self.rial_stress_floor {
            return Err(ConfigError::Invalid {
                parameter: "behavior.rial_stress_ceiling",
                reason: format!(
                    "ceiling ({}) must exceed floor ({})",
                    self.rial_stress_ceiling, self.rial_stress_floor
                ),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Defection
// ---------------------------------------------------------------------------

/// Security-force defection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectionConfig {
    /// Neighbor-active fraction above which a conscript is overwhelmed.
    #[serde(default = "default_overwhelmed_fraction")]
    pub overwhelmed_fraction: f64,

    /// Crackdown intensity above which enforcing it causes moral injury.
    #[serde(default = "default_moral_injury_threshold")]
    pub moral_injury_threshold: f64,

    /// Neighbor-defected fraction above which defection is contagious.
    #[serde(default = "default_contagion_fraction")]
    pub contagion_fraction: f64,

    /// Daily defection probability for an eligible conscript.
    #[serde(default = "default_base_probability")]
    pub base_probability: f64,

    /// Probability reduction for conscripts with a hardliner neighbor.
    #[serde(default = "default_fear_bonus")]
    pub fear_bonus: f64,

    /// Conscript defection rate above which every hardliner defects.
    #[serde(default = "default_hardliner_cascade_threshold")]
    pub hardliner_cascade_threshold: f64,
}

impl Default for DefectionConfig {
    fn default() -> Self {
        Self {
            overwhelmed_fraction: default_overwhelmed_fraction(),
            moral_injury_threshold: default_moral_injury_threshold(),
            contagion_fraction: default_contagion_fraction(),
            base_probability: default_base_probability(),
            fear_bonus: default_fear_bonus(),
            hardliner_cascade_threshold: default_hardliner_cascade_threshold(),
        }
    }
}

impl DefectionConfig {
    /// Defection probability for an eligible conscript.
    pub fn probability(&self, has_hardliner_neighbor: bool) -> f64 {
        let fear = if has_hardliner_neighbor { self.fear_bonus } else { 0.0 };
        (self.base_probability - fear).clamp(0.0, 1.0)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_unit("defection.overwhelmed_fraction", self.overwhelmed_fraction)?;
        check_unit("defection.moral_injury_threshold", self.moral_injury_threshold)?;
        check_unit("defection.contagion_fraction", self.contagion_fraction)?;
        check_unit("defection.base_probability", self.base_probability)?;
        check_unit("defection.fear_bonus", self.fear_bonus)?;
        check_unit("defection.hardliner_cascade_threshold", self.hardliner_cascade_threshold)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Run driver
// ---------------------------------------------------------------------------

/// Monte Carlo run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Simulated days per trial.
    #[serde(default = "default_days")]
    pub days: u32,

    /// Trials per batch.
    #[serde(default = "default_trials")]
    pub trials: usize,

    /// Baseline macro context applied every day.
    #[serde(default)]
    pub context: MacroContext,

    /// Participation rate above which the feedback controller marks the
    /// protest as escalating. `None` disables the feedback.
    #[serde(default = "default_escalation_threshold")]
    pub escalation_threshold: Option<f64>,

    /// Stop a trial early once participation stays below this rate.
    /// `None` always runs to the horizon.
    #[serde(default)]
    pub collapse_floor: Option<f64>,

    /// Consecutive days below `collapse_floor` before stopping.
    #[serde(default = "default_collapse_patience")]
    pub collapse_patience: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
            trials: default_trials(),
            context: MacroContext::default(),
            escalation_threshold: default_escalation_threshold(),
            collapse_floor: None,
            collapse_patience: default_collapse_patience(),
        }
    }
}

impl RunConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.days == 0 {
            return Err(ConfigError::Invalid {
                parameter: "run.days",
                reason: "trial horizon must be at least one day".to_owned(),
            });
        }
        if self.trials == 0 {
            return Err(ConfigError::Invalid {
                parameter: "run.trials",
                reason: "a batch needs at least one trial".to_owned(),
            });
        }
        if let Some(threshold) = self.escalation_threshold {
            check_unit("run.escalation_threshold", threshold)?;
        }
        if let Some(floor) = self.collapse_floor {
            check_unit("run.collapse_floor", floor)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration for the engine binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error). `RUST_LOG`
    /// takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Range checks
// ---------------------------------------------------------------------------

fn check_finite(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            parameter,
            reason: format!("must be finite, got {value}"),
        })
    }
}

fn check_non_negative(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    check_finite(parameter, value)?;
    if value < 0.0 {
        return Err(ConfigError::Invalid {
            parameter,
            reason: format!("must not be negative, got {value}"),
        });
    }
    Ok(())
}

fn check_unit(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            parameter,
            reason: format!("must be within [0, 1], got {value}"),
        })
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_neighbor_influence_weight() -> f64 {
    0.4
}

const fn default_economic_sensitivity() -> f64 {
    0.2
}

const fn default_rial_stress_floor() -> f64 {
    700_000.0
}

const fn default_rial_stress_ceiling() -> f64 {
    1_500_000.0
}

const fn default_concession_relief() -> f64 {
    0.5
}

const fn default_student_escalation_offset() -> f64 {
    -0.2
}

const fn default_hardliner_suppression_offset() -> f64 {
    0.1
}

const fn default_blackout_dampening() -> f64 {
    0.3
}

const fn default_exhaustion_days() -> u32 {
    7
}

const fn default_exhaustion_decay() -> f64 {
    0.05
}

const fn default_overwhelmed_fraction() -> f64 {
    0.5
}

const fn default_moral_injury_threshold() -> f64 {
    0.6
}

const fn default_contagion_fraction() -> f64 {
    0.4
}

const fn default_base_probability() -> f64 {
    0.3
}

const fn default_fear_bonus() -> f64 {
    0.2
}

const fn default_hardliner_cascade_threshold() -> f64 {
    0.5
}

const fn default_days() -> u32 {
    90
}

const fn default_trials() -> usize {
    1_000
}

const fn default_escalation_threshold() -> Option<f64> {
    Some(0.10)
}

const fn default_collapse_patience() -> u32 {
    7
}

fn default_log_level() -> String {
    "info".to_owned()
}
