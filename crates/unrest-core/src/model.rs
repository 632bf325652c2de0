//! The protest model: population, network, and RNG behind one step call.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};
use unrest_agents::{AgentPopulation, PopulationError, PopulationSnapshot};
use unrest_network::{NetworkError, SocialNetwork, build_network};
use unrest_types::{AgentType, MacroContext, StepReport};

use crate::config::{BehaviorConfig, ConfigError, DefectionConfig, SimulationConfig};
use crate::metrics;
use crate::step::{self, PhaseContext};

/// Errors that can occur while constructing a model.
///
/// Stepping never fails; every error surfaces here.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The configuration failed validation.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },

    /// The population could not be drawn.
    #[error("population error: {source}")]
    Population {
        /// The underlying population error.
        #[from]
        source: PopulationError,
    },

    /// The network could not be built.
    #[error("network error: {source}")]
    Network {
        /// The underlying network error.
        #[from]
        source: NetworkError,
    },
}

/// Scratch vectors reused across steps.
#[derive(Debug, Clone)]
struct StepBuffers {
    threshold: Vec<f64>,
    influence: Vec<f64>,
    eligible: Vec<usize>,
}

/// Agent-based protest simulation.
///
/// Owns the agent population and its own random stream; shares the social
/// network with every clone. `step` advances one day and never fails.
/// Clones are independent trials once reseeded with
/// [`ProtestModel::reset_with_seed`].
#[derive(Debug, Clone)]
pub struct ProtestModel {
    network: Arc<SocialNetwork>,
    population: AgentPopulation,
    behavior: BehaviorConfig,
    defection: DefectionConfig,
    /// Fixed for the model's lifetime: types and network never change.
    has_hardliner_neighbor: Vec<bool>,
    previous_active: Vec<bool>,
    buffers: StepBuffers,
    rng: StdRng,
}

impl ProtestModel {
    /// Validate the model sections of `config`, draw the population, and
    /// build the network. The `run` section is not consulted.
    ///
    /// With `config.seed` set the whole model is reproducible; without it
    /// the generator is seeded from the operating system.
    pub fn new(config: &SimulationConfig) -> Result<Self, ModelError> {
        config.validate_model()?;
        let mut rng = config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

        let population = AgentPopulation::new(&config.population, &mut rng)?;
        let network = build_network(population.len(), &config.network, &mut rng)?;
        let stats = network.stats();
        info!(
            agents = stats.node_count,
            edges = stats.edge_count,
            mean_degree = stats.mean_degree,
            min_degree = stats.min_degree,
            max_degree = stats.max_degree,
            isolated = stats.isolated_nodes,
            seed = ?config.seed,
            "Protest model constructed"
        );

        Ok(Self::assemble(
            Arc::new(network),
            population,
            config.behavior.clone(),
            config.defection.clone(),
            rng,
        ))
    }

    fn assemble(
        network: Arc<SocialNetwork>,
        population: AgentPopulation,
        behavior: BehaviorConfig,
        defection: DefectionConfig,
        rng: StdRng,
    ) -> Self {
        let hardliners: Vec<bool> = population
            .agent_types()
            .iter()
            .map(|t| *t == AgentType::Hardliner)
            .collect();
        let has_hardliner_neighbor = network.any_flagged_neighbor(&hardliners);
        let size = population.len();
        Self {
            network,
            population,
            behavior,
            defection,
            has_hardliner_neighbor,
            previous_active: vec![false; size],
            buffers: StepBuffers {
                threshold: vec![0.0; size],
                influence: vec![0.0; size],
                eligible: Vec::new(),
            },
            rng,
        }
    }

    /// Advance the simulation by one day under `context`.
    pub fn step(&mut self, context: &MacroContext) -> StepReport {
        self.previous_active.copy_from_slice(self.population.active());
        let conscript_count = self.population.count(AgentType::Conscript);
        let state = self.population.state_mut();
        let ctx = PhaseContext {
            network: &self.network,
            agent_type: state.agent_type,
            has_hardliner_neighbor: &self.has_hardliner_neighbor,
            context,
            behavior: &self.behavior,
            defection: &self.defection,
        };

        // --- Phase 1: Exhaustion ---
        let exhausted = step::phase_exhaustion(state.days_active, state.grievance, &self.behavior);

        // --- Phase 2: Grievance ---
        let merchant_boost = step::phase_grievance(&ctx, state.grievance);

        // --- Phase 3: Threshold ---
        step::phase_threshold(&ctx, state.base_threshold, &mut self.buffers.threshold);

        // --- Phase 4: Influence ---
        step::phase_influence(&ctx, &self.previous_active, &mut self.buffers.influence);

        // --- Phase 5: Activation ---
        step::phase_activation(
            &ctx,
            state.grievance,
            &self.buffers.influence,
            &self.buffers.threshold,
            merchant_boost,
            state.active,
        );

        // --- Phase 6: Tenure ---
        step::phase_tenure(state.active, state.days_active);

        // --- Phase 7: Conscript defection ---
        let conscripts_defected = step::phase_conscript_defection(
            &ctx,
            state.active,
            state.defected,
            &mut self.buffers.eligible,
            &mut self.rng,
        );

        // --- Phase 8: Hardliner defection ---
        let hardliners_defected =
            step::phase_hardliner_defection(&ctx, conscript_count, state.defected);

        // --- Phase 9: Aggregate ---
        let report = metrics::aggregate(
            &self.population,
            &self.network,
            &self.previous_active,
            conscripts_defected.saturating_add(hardliners_defected),
        );

        debug!(
            active = report.active_count,
            participation = report.participation_rate,
            conscript_defection = report.conscript_defection_rate,
            hardliner_defection = report.hardliner_defection_rate,
            exhausted,
            conscripts_defected,
            hardliners_defected,
            "Step complete"
        );
        report
    }

    /// Re-draw grievance and thresholds and clear per-step state,
    /// continuing the model's random stream.
    pub fn reset(&mut self) {
        self.population.reset(&mut self.rng);
        self.previous_active.fill(false);
    }

    /// Reseed the random stream, then [`reset`](Self::reset).
    ///
    /// Two calls with the same seed leave bit-identical arrays.
    pub fn reset_with_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
        self.reset();
    }

    /// Owned copy of the population state.
    pub fn snapshot(&self) -> PopulationSnapshot {
        self.population.snapshot()
    }

    /// The agent population.
    pub const fn population(&self) -> &AgentPopulation {
        &self.population
    }

    /// The social network.
    pub fn network(&self) -> &SocialNetwork {
        &self.network
    }

    /// Shared handle to the social network.
    pub fn shared_network(&self) -> Arc<SocialNetwork> {
        Arc::clone(&self.network)
    }

    /// Whether each agent has at least one hardliner neighbor.
    pub fn has_hardliner_neighbor(&self) -> &[bool] {
        &self.has_hardliner_neighbor
    }

    /// The active vector as it stood before the most recent step.
    pub fn previous_active(&self) -> &[bool] {
        &self.previous_active
    }

    /// Behavior parameters in effect.
    pub const fn behavior(&self) -> &BehaviorConfig {
        &self.behavior
    }

    /// Defection parameters in effect.
    pub const fn defection(&self) -> &DefectionConfig {
        &self.defection
    }
}
