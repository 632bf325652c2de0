//! The agent population: one dense array per attribute.
//!
//! [`AgentPopulation`] owns every per-agent array. Agent `i` is simply
//! index `i` in each of them. Type and province are fixed at construction;
//! grievance and threshold are drawn at construction and re-drawn by
//! [`AgentPopulation::reset`]; activity, defection and tenure are mutated by
//! the step pipeline through [`AgentPopulation::state_mut`].

use rand::Rng;
use rand::seq::SliceRandom;
use rand_distr::{Beta, Distribution};
use tracing::{debug, info};
use unrest_types::{AgentType, PerType, ProvinceId};

use crate::config::{PopulationConfig, ThresholdRange};
use crate::error::PopulationError;
use crate::geography::assign_provinces;
use crate::snapshot::PopulationSnapshot;

/// Structure-of-arrays agent state.
#[derive(Debug, Clone)]
pub struct AgentPopulation {
    agent_type: Vec<AgentType>,
    grievance: Vec<f64>,
    base_threshold: Vec<f64>,
    active: Vec<bool>,
    defected: Vec<bool>,
    days_active: Vec<u32>,
    province: Vec<ProvinceId>,
    province_names: Vec<String>,
    /// Mobilizable agents per province, indexed by province id.
    mobilizable_by_province: Vec<usize>,
    type_counts: PerType<usize>,
    /// Initial grievance distribution per type index. `None` for hardliners.
    samplers: [Option<Beta<f64>>; AgentType::COUNT],
    threshold_range: ThresholdRange,
}

/// Mutable view over the arrays the step pipeline is allowed to change.
///
/// Type and threshold are exposed read-only alongside so a phase can read
/// them while writing the others without fighting the borrow checker.
#[derive(Debug)]
pub struct AgentStateMut<'a> {
    /// Agent types (read-only).
    pub agent_type: &'a [AgentType],
    /// Base thresholds (read-only).
    pub base_threshold: &'a [f64],
    /// Grievance levels.
    pub grievance: &'a mut [f64],
    /// Protest activity flags.
    pub active: &'a mut [bool],
    /// Defection flags.
    pub defected: &'a mut [bool],
    /// Consecutive active days.
    pub days_active: &'a mut [u32],
}

impl AgentPopulation {
    /// Allocate and draw a population.
    ///
    /// Types are laid out contiguously by count and then shuffled with
    /// `rng`, so network position is uncorrelated with type. Grievances are
    /// then drawn in index order, followed by thresholds.
    ///
    /// # Errors
    ///
    /// Returns a [`PopulationError`] naming the first invalid parameter.
    pub fn new<R: Rng + ?Sized>(
        config: &PopulationConfig,
        rng: &mut R,
    ) -> Result<Self, PopulationError> {
        config.validate()?;
        let size = config.size;
        let type_counts = config.type_mix.counts(size)?;

        let mut agent_type = Vec::with_capacity(size);
        for (kind, count) in type_counts.iter() {
            agent_type.extend(std::iter::repeat_n(kind, count));
        }
        agent_type.shuffle(rng);

        let (province, province_names) = assign_provinces(size, &config.provinces)?;
        let mut mobilizable_by_province = vec![0_usize; province_names.len()];
        for (kind, prov) in agent_type.iter().zip(&province) {
            if !kind.is_mobilizable() {
                continue;
            }
            if let Some(slot) = mobilizable_by_province.get_mut(prov.index()) {
                *slot = slot.saturating_add(1);
            }
        }

        let mut samplers: [Option<Beta<f64>>; AgentType::COUNT] = std::array::from_fn(|_| None);
        for (slot, kind) in samplers.iter_mut().zip(AgentType::ALL) {
            if let Some(prior) = config.grievance.prior(kind) {
                let beta = Beta::new(prior.alpha, prior.beta).map_err(|source| {
                    PopulationError::GrievancePrior {
                        parameter: format!("grievance.{kind}"),
                        source,
                    }
                })?;
                *slot = Some(beta);
            }
        }

        let mut population = Self {
            agent_type,
            grievance: vec![0.0; size],
            base_threshold: vec![0.0; size],
            active: vec![false; size],
            defected: vec![false; size],
            days_active: vec![0; size],
            province,
            province_names,
            mobilizable_by_province,
            type_counts,
            samplers,
            threshold_range: config.threshold_range,
        };
        population.reset(rng);

        info!(
            size,
            students = type_counts.get(AgentType::Student),
            merchants = type_counts.get(AgentType::Merchant),
            conscripts = type_counts.get(AgentType::Conscript),
            hardliners = type_counts.get(AgentType::Hardliner),
            civilians = type_counts.get(AgentType::Civilian),
            provinces = population.province_names.len(),
            "Agent population created"
        );
        Ok(population)
    }

    /// Re-draw grievance and thresholds and clear all per-step state.
    ///
    /// Type, province, and the caller's network are untouched. Draw order
    /// matches construction, so a generator in the same state yields the
    /// same arrays.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for (g, kind) in self.grievance.iter_mut().zip(&self.agent_type) {
            let sampler = self.samplers.get(kind.index()).and_then(Option::as_ref);
            *g = sampler.map_or(0.0, |beta| beta.sample(rng).clamp(0.0, 1.0));
        }
        let ThresholdRange { low, high } = self.threshold_range;
        for t in &mut self.base_threshold {
            *t = rng.random_range(low..=high);
        }
        self.active.fill(false);
        self.defected.fill(false);
        self.days_active.fill(0);
        debug!(size = self.len(), "Agent population re-drawn");
    }

    /// Number of agents.
    pub fn len(&self) -> usize {
        self.agent_type.len()
    }

    /// Whether the population is empty. Never true for a validated config.
    pub fn is_empty(&self) -> bool {
        self.agent_type.is_empty()
    }

    /// Agent types.
    pub fn agent_types(&self) -> &[AgentType] {
        &self.agent_type
    }

    /// Grievance levels.
    pub fn grievance(&self) -> &[f64] {
        &self.grievance
    }

    /// Base thresholds.
    pub fn base_threshold(&self) -> &[f64] {
        &self.base_threshold
    }

    /// Protest activity flags.
    pub fn active(&self) -> &[bool] {
        &self.active
    }

    /// Defection flags.
    pub fn defected(&self) -> &[bool] {
        &self.defected
    }

    /// Consecutive active days.
    pub fn days_active(&self) -> &[u32] {
        &self.days_active
    }

    /// Province of every agent.
    pub fn province(&self) -> &[ProvinceId] {
        &self.province
    }

    /// Province names indexed by [`ProvinceId`].
    pub fn province_names(&self) -> &[String] {
        &self.province_names
    }

    /// Mobilizable (student, merchant, civilian) agents per province.
    pub fn mobilizable_by_province(&self) -> &[usize] {
        &self.mobilizable_by_province
    }

    /// Agent count per type.
    pub const fn type_counts(&self) -> PerType<usize> {
        self.type_counts
    }

    /// Agent count of one type.
    pub fn count(&self, agent_type: AgentType) -> usize {
        self.type_counts.get(agent_type)
    }

    /// Number of mobilizable agents.
    pub fn mobilizable_count(&self) -> usize {
        AgentType::ALL
            .into_iter()
            .filter(|t| t.is_mobilizable())
            .map(|t| self.type_counts.get(t))
            .sum()
    }

    /// Indices of every agent of `agent_type`, ascending.
    pub fn indices_of(&self, agent_type: AgentType) -> impl Iterator<Item = usize> + '_ {
        self.agent_type
            .iter()
            .enumerate()
            .filter(move |(_, t)| **t == agent_type)
            .map(|(i, _)| i)
    }

    /// Borrow the mutable state arrays for one step.
    pub fn state_mut(&mut self) -> AgentStateMut<'_> {
        AgentStateMut {
            agent_type: &self.agent_type,
            base_threshold: &self.base_threshold,
            grievance: &mut self.grievance,
            active: &mut self.active,
            defected: &mut self.defected,
            days_active: &mut self.days_active,
        }
    }

    /// Take an owned copy of the full state.
    pub fn snapshot(&self) -> PopulationSnapshot {
        PopulationSnapshot::capture(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::config::{BetaPrior, GrievancePriors};
    use crate::geography::ProvinceShare;

    fn population(size: usize, seed: u64) -> AgentPopulation {
        let config = PopulationConfig {
            size,
            ..PopulationConfig::default()
        };
        AgentPopulation::new(&config, &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn realized_type_counts_are_exact() {
        let pop = population(10_000, 1);
        let count = |t| pop.agent_types().iter().filter(|&&x| x == t).count();
        assert_eq!(count(AgentType::Student), 1_500);
        assert_eq!(count(AgentType::Merchant), 2_000);
        assert_eq!(count(AgentType::Conscript), 1_000);
        assert_eq!(count(AgentType::Hardliner), 500);
        assert_eq!(count(AgentType::Civilian), 5_000);
        assert_eq!(pop.mobilizable_count(), 8_500);
    }

    #[test]
    fn types_are_shuffled() {
        let pop = population(1_000, 2);
        // Unshuffled layout would put every student in the first 150 slots.
        let late_students = pop.agent_types()[150..]
            .iter()
            .filter(|&&t| t == AgentType::Student)
            .count();
        assert!(late_students > 50);
    }

    #[test]
    fn initial_state_is_in_bounds() {
        let pop = population(5_000, 3);
        assert!(pop.grievance().iter().all(|g| (0.0..=1.0).contains(g)));
        assert!(pop.base_threshold().iter().all(|t| (0.3..=0.8).contains(t)));
        assert!(pop.active().iter().all(|a| !a));
        assert!(pop.defected().iter().all(|d| !d));
        assert!(pop.days_active().iter().all(|&d| d == 0));
    }

    #[test]
    fn hardliner_grievance_is_exactly_zero() {
        let pop = population(2_000, 4);
        for i in pop.indices_of(AgentType::Hardliner) {
            assert_eq!(pop.grievance()[i].to_bits(), 0.0_f64.to_bits());
        }
    }

    #[test]
    fn student_mean_grievance_tracks_prior() {
        let pop = population(10_000, 5);
        let students: Vec<f64> = pop
            .indices_of(AgentType::Student)
            .map(|i| pop.grievance()[i])
            .collect();
        #[allow(clippy::cast_precision_loss)]
        let mean = students.iter().sum::<f64>() / students.len() as f64;
        assert!((mean - 4.0 / 6.0).abs() < 0.02, "student mean {mean}");
    }

    #[test]
    fn reset_with_same_seed_is_bit_identical() {
        let mut pop = population(1_000, 6);
        pop.reset(&mut StdRng::seed_from_u64(99));
        let first = (pop.grievance().to_vec(), pop.base_threshold().to_vec());
        {
            let state = pop.state_mut();
            state.active.fill(true);
            state.days_active.fill(4);
        }
        pop.reset(&mut StdRng::seed_from_u64(99));
        assert_eq!(first.0, pop.grievance());
        assert_eq!(first.1, pop.base_threshold());
        assert!(pop.active().iter().all(|a| !a));
        assert!(pop.days_active().iter().all(|&d| d == 0));
    }

    #[test]
    fn reset_preserves_types_and_provinces() {
        let config = PopulationConfig {
            size: 300,
            provinces: vec![ProvinceShare::new("north", 2.0), ProvinceShare::new("south", 1.0)],
            ..PopulationConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        let mut pop = AgentPopulation::new(&config, &mut rng).unwrap();
        let types = pop.agent_types().to_vec();
        let provinces = pop.province().to_vec();
        pop.reset(&mut rng);
        assert_eq!(types, pop.agent_types());
        assert_eq!(provinces, pop.province());
        let total: usize = pop.mobilizable_by_province().iter().sum();
        assert_eq!(total, pop.mobilizable_count());
    }

    #[test]
    fn invalid_prior_surfaces_at_construction() {
        let config = PopulationConfig {
            size: 10,
            grievance: GrievancePriors {
                civilian: BetaPrior::new(-1.0, 2.0),
                ..GrievancePriors::default()
            },
            ..PopulationConfig::default()
        };
        let result = AgentPopulation::new(&config, &mut StdRng::seed_from_u64(0));
        assert!(matches!(result, Err(PopulationError::InvalidParameter { .. })));
    }
}
