//! Per-step metrics report produced by the engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::AgentType;

/// A fixed table holding one value per [`AgentType`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerType<T>(pub [T; AgentType::COUNT]);

impl<T: Copy> PerType<T> {
    /// Build a table with every entry set to `value`.
    pub const fn splat(value: T) -> Self {
        Self([value; AgentType::COUNT])
    }

    /// Read the entry for `agent_type`.
    #[allow(clippy::indexing_slicing)] // index() < COUNT for every variant
    pub fn get(&self, agent_type: AgentType) -> T {
        self.0[agent_type.index()]
    }

    /// Overwrite the entry for `agent_type`.
    #[allow(clippy::indexing_slicing)]
    pub fn set(&mut self, agent_type: AgentType, value: T) {
        self.0[agent_type.index()] = value;
    }

    /// Iterate `(type, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (AgentType, T)> + '_ {
        AgentType::ALL.into_iter().zip(self.0.iter().copied())
    }
}

/// Aggregate metrics for one simulated day.
///
/// Produced fresh by every step; nothing here is retained as agent state.
/// The macro controller consumes either this typed record or its flattened
/// form from [`StepReport::to_metrics`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StepReport {
    /// Number of agents active (protesting) at the end of the step.
    pub active_count: usize,
    /// Active fraction of the mobilizable (student, merchant, civilian)
    /// population.
    pub participation_rate: f64,
    /// Active fraction within each agent type. Always 0 for security types.
    pub participation_by_type: PerType<f64>,
    /// Fraction of conscripts that have defected.
    pub conscript_defection_rate: f64,
    /// Fraction of hardliners that have defected.
    pub hardliner_defection_rate: f64,
    /// Fraction of all security agents that have defected.
    pub security_defection_rate: f64,
    /// Edges among active agents relative to the maximum possible among
    /// them. 0 when fewer than two agents are active.
    pub coordination_score: f64,
    /// Participation fraction per province, keyed by province name.
    pub regional_participation: BTreeMap<String, f64>,
    /// Agents active now that were inactive on the previous step.
    pub newly_activated: usize,
    /// Agents inactive now that were active on the previous step.
    pub newly_deactivated: usize,
    /// Security agents that defected during this step.
    pub newly_defected: usize,
    /// `(newly_activated + newly_deactivated) / population`.
    pub churn_rate: f64,
    /// Mean grievance across the whole population.
    pub mean_grievance: f64,
}

impl StepReport {
    /// Flatten the report into a metric-name → value map.
    ///
    /// Per-type entries are keyed `participation.<type>`; regional entries
    /// `region.<province>`. Counts are reported as floats.
    #[allow(clippy::cast_precision_loss)] // counts are bounded by population size
    pub fn to_metrics(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();
        metrics.insert("active_count".to_owned(), self.active_count as f64);
        metrics.insert("participation_rate".to_owned(), self.participation_rate);
        for (agent_type, rate) in self.participation_by_type.iter() {
            metrics.insert(format!("participation.{agent_type}"), rate);
        }
        metrics.insert("conscript_defection_rate".to_owned(), self.conscript_defection_rate);
        metrics.insert("hardliner_defection_rate".to_owned(), self.hardliner_defection_rate);
        metrics.insert("security_defection_rate".to_owned(), self.security_defection_rate);
        metrics.insert("coordination_score".to_owned(), self.coordination_score);
        for (province, rate) in &self.regional_participation {
            metrics.insert(format!("region.{province}"), *rate);
        }
        metrics.insert("newly_activated".to_owned(), self.newly_activated as f64);
        metrics.insert("newly_deactivated".to_owned(), self.newly_deactivated as f64);
        metrics.insert("newly_defected".to_owned(), self.newly_defected as f64);
        metrics.insert("churn_rate".to_owned(), self.churn_rate);
        metrics.insert("mean_grievance".to_owned(), self.mean_grievance);
        metrics
    }
}
