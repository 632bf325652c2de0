//! Step metrics aggregation.
//!
//! [`aggregate`] is a pure read of the population and network plus the
//! previous step's active vector. It keeps no state of its own.

use std::collections::BTreeMap;

use unrest_agents::AgentPopulation;
use unrest_network::SocialNetwork;
use unrest_types::{AgentType, PerType, StepReport};

/// Build the [`StepReport`] for the state the step pipeline just finished.
///
/// `previous_active` is the active vector as it stood before this step;
/// `newly_defected` is the count the defection phases reported.
#[allow(clippy::cast_precision_loss)] // all counts are bounded by population size
pub fn aggregate(
    population: &AgentPopulation,
    network: &SocialNetwork,
    previous_active: &[bool],
    newly_defected: usize,
) -> StepReport {
    let agent_type = population.agent_types();
    let active = population.active();
    let defected = population.defected();
    let size = population.len();

    let mut active_by_type = PerType::splat(0_usize);
    let mut defected_by_type = PerType::splat(0_usize);
    let mut active_by_province = vec![0_usize; population.province_names().len()];
    let mut newly_activated: usize = 0;
    let mut newly_deactivated: usize = 0;

    for (agent, &kind) in agent_type.iter().enumerate() {
        let is_active = active.get(agent).copied().unwrap_or(false);
        let was_active = previous_active.get(agent).copied().unwrap_or(false);

        if is_active {
            active_by_type.set(kind, active_by_type.get(kind).saturating_add(1));
            if kind.is_mobilizable() {
                let province = population.province().get(agent).map_or(0, |p| p.index());
                if let Some(slot) = active_by_province.get_mut(province) {
                    *slot = slot.saturating_add(1);
                }
            }
        }
        if defected.get(agent).copied().unwrap_or(false) {
            defected_by_type.set(kind, defected_by_type.get(kind).saturating_add(1));
        }
        match (was_active, is_active) {
            (false, true) => newly_activated = newly_activated.saturating_add(1),
            (true, false) => newly_deactivated = newly_deactivated.saturating_add(1),
            _ => {}
        }
    }

    let fraction = |num: usize, den: usize| num as f64 / den.max(1) as f64;

    let mut participation_by_type = PerType::splat(0.0);
    for kind in AgentType::ALL {
        participation_by_type.set(
            kind,
            fraction(active_by_type.get(kind), population.count(kind)),
        );
    }

    let active_count = active_by_type.iter().map(|(_, c)| c).sum::<usize>();
    let mobilizable_active = active_by_type
        .iter()
        .filter(|(kind, _)| kind.is_mobilizable())
        .map(|(_, c)| c)
        .sum::<usize>();

    let conscripts = population.count(AgentType::Conscript);
    let hardliners = population.count(AgentType::Hardliner);
    let defected_conscripts = defected_by_type.get(AgentType::Conscript);
    let defected_hardliners = defected_by_type.get(AgentType::Hardliner);

    let regional_participation: BTreeMap<String, f64> = population
        .province_names()
        .iter()
        .zip(&active_by_province)
        .zip(population.mobilizable_by_province())
        .map(|((name, &act), &total)| (name.clone(), fraction(act, total)))
        .collect();

    let mean_grievance = population.grievance().iter().sum::<f64>() / size.max(1) as f64;

    StepReport {
        active_count,
        participation_rate: fraction(mobilizable_active, population.mobilizable_count()),
        participation_by_type,
        conscript_defection_rate: fraction(defected_conscripts, conscripts),
        hardliner_defection_rate: fraction(defected_hardliners, hardliners),
        security_defection_rate: fraction(
            defected_conscripts.saturating_add(defected_hardliners),
            conscripts.saturating_add(hardliners),
        ),
        coordination_score: coordination_score(network, active, active_count),
        regional_participation,
        newly_activated,
        newly_deactivated,
        newly_defected,
        churn_rate: fraction(newly_activated.saturating_add(newly_deactivated), size),
        mean_grievance,
    }
}

/// Edges among active agents over the `a(a-1)/2` possible; 0 below two.
#[allow(clippy::cast_precision_loss)]
pub fn coordination_score(network: &SocialNetwork, active: &[bool], active_count: usize) -> f64 {
    if active_count < 2 {
        return 0.0;
    }
    let a = active_count as f64;
    let possible = a * (a - 1.0) / 2.0;
    network.edges_within(active) as f64 / possible
}
