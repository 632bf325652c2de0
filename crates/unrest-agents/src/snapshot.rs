//! Owned inspection copies of a population.

use std::collections::BTreeMap;

use serde::Serialize;
use unrest_types::{AgentType, ProvinceId};

use crate::population::AgentPopulation;

/// Grievance histogram bin edges. The last bin is closed on the right, so a
/// grievance of exactly 1.0 lands in the top bin.
pub const GRIEVANCE_BIN_EDGES: [f64; 6] = [0.0, 0.2, 0.4, 0.6, 0.8, 1.0];

/// Number of histogram bins.
const BIN_COUNT: usize = GRIEVANCE_BIN_EDGES.len() - 1;

/// Counts of agents per grievance bin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrievanceHistogram {
    /// Agent count in each bin, lowest first.
    pub counts: [usize; BIN_COUNT],
}

impl GrievanceHistogram {
    /// Bin a set of grievance values.
    pub fn from_values(values: &[f64]) -> Self {
        let mut counts = [0_usize; BIN_COUNT];
        for &g in values {
            // Number of interior-or-upper edges at or below `g`; values at
            // 1.0 count five edges and are pulled back into the last bin.
            let bin = GRIEVANCE_BIN_EDGES
                .iter()
                .skip(1)
                .filter(|&&edge| edge <= g)
                .count()
                .min(BIN_COUNT.saturating_sub(1));
            if let Some(slot) = counts.get_mut(bin) {
                *slot = slot.saturating_add(1);
            }
        }
        Self { counts }
    }

    /// Total agents counted.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Type-appropriate rate in a [`TypeSummary`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TypeRate {
    /// Active fraction, for mobilizable types.
    Active(f64),
    /// Defected fraction, for security types.
    Defected(f64),
}

/// Per-type breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TypeSummary {
    /// Number of agents of this type.
    pub count: usize,
    /// Active or defected fraction.
    pub rate: TypeRate,
    /// Mean grievance of this type. 0 for an absent type.
    pub mean_grievance: f64,
}

/// Owned copy of every population array plus derived summaries.
///
/// Nothing here borrows from the population; mutating a snapshot has no
/// effect on the model it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationSnapshot {
    /// Agent types.
    pub agent_type: Vec<AgentType>,
    /// Grievance levels.
    pub grievance: Vec<f64>,
    /// Base thresholds.
    pub base_threshold: Vec<f64>,
    /// Activity flags.
    pub active: Vec<bool>,
    /// Defection flags.
    pub defected: Vec<bool>,
    /// Consecutive active days.
    pub days_active: Vec<u32>,
    /// Province ids.
    pub province: Vec<ProvinceId>,
    /// Province names indexed by id.
    pub province_names: Vec<String>,
    /// Grievance distribution.
    pub histogram: GrievanceHistogram,
    /// Breakdown by type.
    pub by_type: BTreeMap<AgentType, TypeSummary>,
}

impl PopulationSnapshot {
    /// Copy the population's arrays and compute summaries.
    pub fn capture(population: &AgentPopulation) -> Self {
        let by_type = AgentType::ALL
            .into_iter()
            .map(|kind| (kind, summarize(population, kind)))
            .collect();

        Self {
            agent_type: population.agent_types().to_vec(),
            grievance: population.grievance().to_vec(),
            base_threshold: population.base_threshold().to_vec(),
            active: population.active().to_vec(),
            defected: population.defected().to_vec(),
            days_active: population.days_active().to_vec(),
            province: population.province().to_vec(),
            province_names: population.province_names().to_vec(),
            histogram: GrievanceHistogram::from_values(population.grievance()),
            by_type,
        }
    }
}

#[allow(clippy::cast_precision_loss)] // counts are bounded by population size
fn summarize(population: &AgentPopulation, kind: AgentType) -> TypeSummary {
    let mut count: usize = 0;
    let mut flagged: usize = 0;
    let mut grievance_sum = 0.0;
    let flags = if kind.is_security() {
        population.defected()
    } else {
        population.active()
    };

    for i in population.indices_of(kind) {
        count = count.saturating_add(1);
        if flags.get(i).copied().unwrap_or(false) {
            flagged = flagged.saturating_add(1);
        }
        grievance_sum += population.grievance().get(i).copied().unwrap_or(0.0);
    }

    let denom = count.max(1) as f64;
    let fraction = flagged as f64 / denom;
    TypeSummary {
        count,
        rate: if kind.is_security() {
            TypeRate::Defected(fraction)
        } else {
            TypeRate::Active(fraction)
        },
        mean_grievance: grievance_sum / denom,
    }
}
