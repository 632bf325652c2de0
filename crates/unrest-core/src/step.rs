//! Step pipeline: the 9-phase daily update.
//!
//! Each phase completes across the whole population before the next one
//! starts, and reads only values finalized by earlier phases:
//!
//! 1. **Exhaustion** -- agents active for more than `exhaustion_days`
//!    consecutive days lose `exhaustion_decay` grievance. Runs first so the
//!    same-day grievance update sees already-decayed values.
//! 2. **Grievance** -- merchant economic stress and concession relief,
//!    hardliner lock to 0, clamp to `[0, 1]`.
//! 3. **Threshold** -- student escalation offset and hardliner-neighbor
//!    suppression, additive over `base_threshold`.
//! 4. **Influence** -- neighbor-active fraction over the previous step's
//!    active vector, dampened under blackout.
//! 5. **Activation** -- strict `signal > threshold`; security types are
//!    forced inactive.
//! 6. **Tenure** -- `days_active` increments or hard-resets to 0.
//! 7. **Conscript defection** -- eligibility for every conscript first,
//!    then one Bernoulli draw per eligible conscript in index order.
//! 8. **Hardliner defection** -- all or nothing.
//! 9. **Aggregate** -- see [`crate::metrics`].
//!
//! Phases 1 to 8 live here as free functions over slices; the model in
//! [`crate::model`] sequences them.

use rand::Rng;
use unrest_network::SocialNetwork;
use unrest_types::{AgentType, MacroContext};

use crate::config::{BehaviorConfig, DefectionConfig, MerchantPressure};

/// Read-only inputs shared by every phase of one step.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PhaseContext<'a> {
    pub network: &'a SocialNetwork,
    pub agent_type: &'a [AgentType],
    pub has_hardliner_neighbor: &'a [bool],
    pub context: &'a MacroContext,
    pub behavior: &'a BehaviorConfig,
    pub defection: &'a DefectionConfig,
}

/// Phase 1: exhaustion. Returns how many agents decayed.
pub(crate) fn phase_exhaustion(
    days_active: &[u32],
    grievance: &mut [f64],
    behavior: &BehaviorConfig,
) -> usize {
    let mut exhausted: usize = 0;
    for (g, &days) in grievance.iter_mut().zip(days_active) {
        if days > behavior.exhaustion_days {
            *g -= behavior.exhaustion_decay;
            exhausted = exhausted.saturating_add(1);
        }
    }
    exhausted
}

/// Phase 2: type-specific grievance update.
///
/// Returns the merchant boost to add to this step's activation signal:
/// the full boost in [`MerchantPressure::Transient`] mode, zero in
/// [`MerchantPressure::Accumulating`] mode (where it went into grievance).
pub(crate) fn phase_grievance(ctx: &PhaseContext<'_>, grievance: &mut [f64]) -> f64 {
    let behavior = ctx.behavior;
    let boost = behavior.merchant_boost(ctx.context.rial_rate);
    let accumulate = behavior.merchant_pressure == MerchantPressure::Accumulating;

    for (g, kind) in grievance.iter_mut().zip(ctx.agent_type) {
        match kind {
            AgentType::Merchant => {
                if accumulate {
                    *g += boost;
                }
                if ctx.context.concessions_offered {
                    *g *= behavior.concession_relief;
                }
            }
            AgentType::Hardliner => *g = 0.0,
            AgentType::Student | AgentType::Conscript | AgentType::Civilian => {}
        }
        *g = g.clamp(0.0, 1.0);
    }

    if accumulate { 0.0 } else { boost }
}

/// Phase 3: effective thresholds into `out`.
pub(crate) fn phase_threshold(ctx: &PhaseContext<'_>, base_threshold: &[f64], out: &mut [f64]) {
    let escalating = ctx.context.protest_state.indicates_escalation();
    let behavior = ctx.behavior;

    for (((slot, &base), kind), &suppressed) in out
        .iter_mut()
        .zip(base_threshold)
        .zip(ctx.agent_type)
        .zip(ctx.has_hardliner_neighbor)
    {
        let mut threshold = base;
        if escalating && *kind == AgentType::Student {
            threshold += behavior.student_escalation_offset;
        }
        if suppressed {
            threshold += behavior.hardliner_suppression_offset;
        }
        *slot = threshold;
    }
}

/// Phase 4: neighbor influence into `out`, from the previous active vector.
pub(crate) fn phase_influence(ctx: &PhaseContext<'_>, previous_active: &[bool], out: &mut [f64]) {
    ctx.network.flagged_fraction_into(previous_active, out);
    if ctx.context.internet_blackout {
        let dampening = ctx.behavior.blackout_dampening;
        for fraction in out.iter_mut() {
            *fraction *= dampening;
        }
    }
}

/// Phase 5: activation decision.
pub(crate) fn phase_activation(
    ctx: &PhaseContext<'_>,
    grievance: &[f64],
    influence: &[f64],
    threshold: &[f64],
    merchant_boost: f64,
    active: &mut [bool],
) {
    let weight = ctx.behavior.neighbor_influence_weight;
    for ((((slot, kind), &g), &fraction), &bar) in active
        .iter_mut()
        .zip(ctx.agent_type)
        .zip(grievance)
        .zip(influence)
        .zip(threshold)
    {
        if kind.is_security() {
            *slot = false;
            continue;
        }
        let mut signal = g + weight * fraction;
        if *kind == AgentType::Merchant {
            signal += merchant_boost;
        }
        *slot = signal > bar;
    }
}

/// Phase 6: tenure.
pub(crate) fn phase_tenure(active: &[bool], days_active: &mut [u32]) {
    for (days, &is_active) in days_active.iter_mut().zip(active) {
        *days = if is_active { days.saturating_add(1) } else { 0 };
    }
}

/// Phase 7: conscript defection. Returns the number of new defections.
///
/// The overwhelmed test reads this step's finalized `active` vector
/// without blackout dampening. The contagion test reads `defected` as it
/// stood before this phase: every conscript's eligibility is decided before
/// any draw is applied.
pub(crate) fn phase_conscript_defection<R: Rng + ?Sized>(
    ctx: &PhaseContext<'_>,
    active: &[bool],
    defected: &mut [bool],
    eligible: &mut Vec<usize>,
    rng: &mut R,
) -> usize {
    let defection = ctx.defection;
    let morally_injured = ctx.context.crackdown_intensity > defection.moral_injury_threshold;

    eligible.clear();
    for (agent, kind) in ctx.agent_type.iter().enumerate() {
        if *kind != AgentType::Conscript || defected.get(agent).copied().unwrap_or(true) {
            continue;
        }
        let overwhelmed = morally_injured
            && ctx.network.flagged_fraction_of(agent, active) > defection.overwhelmed_fraction;
        let contagion =
            ctx.network.flagged_fraction_of(agent, defected) > defection.contagion_fraction;
        if overwhelmed || contagion {
            eligible.push(agent);
        }
    }

    let mut newly: usize = 0;
    for &agent in eligible.iter() {
        let feared = ctx.has_hardliner_neighbor.get(agent).copied().unwrap_or(false);
        if !rng.random_bool(defection.probability(feared)) {
            continue;
        }
        if let Some(flag) = defected.get_mut(agent) {
            *flag = true;
            newly = newly.saturating_add(1);
        }
    }
    newly
}

/// Phase 8: hardliner defection. Returns the number of new defections.
///
/// Every hardliner defects iff the regime has collapsed or the conscript
/// defection rate exceeds the cascade threshold.
pub(crate) fn phase_hardliner_defection(
    ctx: &PhaseContext<'_>,
    conscript_count: usize,
    defected: &mut [bool],
) -> usize {
    let defected_conscripts = ctx
        .agent_type
        .iter()
        .zip(defected.iter())
        .filter(|&(kind, &d)| *kind == AgentType::Conscript && d)
        .count();
    #[allow(clippy::cast_precision_loss)]
    let conscript_rate = defected_conscripts as f64 / conscript_count.max(1) as f64;

    let cascade = ctx.context.regime_state.is_collapsed()
        || conscript_rate > ctx.defection.hardliner_cascade_threshold;
    if !cascade {
        return 0;
    }

    let mut newly: usize = 0;
    for (flag, kind) in defected.iter_mut().zip(ctx.agent_type) {
        if *kind == AgentType::Hardliner && !*flag {
            *flag = true;
            newly = newly.saturating_add(1);
        }
    }
    newly
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use unrest_types::{ProtestState, RegimeState};

    use super::*;

    struct Fixture {
        network: SocialNetwork,
        agent_type: Vec<AgentType>,
        has_hardliner_neighbor: Vec<bool>,
        context: MacroContext,
        behavior: BehaviorConfig,
        defection: DefectionConfig,
    }

    impl Fixture {
        fn new(agent_type: Vec<AgentType>, edges: &[(usize, usize)]) -> Self {
            let network = SocialNetwork::from_edges(agent_type.len(), edges.iter().copied()).unwrap();
            let hardliners: Vec<bool> =
                agent_type.iter().map(|t| *t == AgentType::Hardliner).collect();
            let has_hardliner_neighbor = network.any_flagged_neighbor(&hardliners);
            Self {
                network,
                agent_type,
                has_hardliner_neighbor,
                context: MacroContext::default(),
                behavior: BehaviorConfig::default(),
                defection: DefectionConfig::default(),
            }
        }

        fn ctx(&self) -> PhaseContext<'_> {
            PhaseContext {
                network: &self.network,
                agent_type: &self.agent_type,
                has_hardliner_neighbor: &self.has_hardliner_neighbor,
                context: &self.context,
                behavior: &self.behavior,
                defection: &self.defection,
            }
        }
    }

    #[test]
    fn exhaustion_only_hits_long_tenure() {
        let mut grievance = vec![0.5, 0.5, 0.5];
        let exhausted = phase_exhaustion(&[7, 8, 0], &mut grievance, &BehaviorConfig::default());
        assert_eq!(exhausted, 1);
        assert!((grievance[0] - 0.5).abs() < 1e-12);
        assert!((grievance[1] - 0.45).abs() < 1e-12);
    }

    #[test]
    fn grievance_phase_locks_hardliners_and_clamps() {
        let mut fixture = Fixture::new(
            vec![AgentType::Hardliner, AgentType::Student, AgentType::Civilian],
            &[],
        );
        fixture.context = MacroContext::default().with_rial_rate(2_000_000.0);
        let mut grievance = vec![0.9, 1.3, -0.2];
        let boost = phase_grievance(&fixture.ctx(), &mut grievance);
        assert_eq!(grievance[0].to_bits(), 0.0_f64.to_bits());
        assert!((grievance[1] - 1.0).abs() < f64::EPSILON);
        assert!(grievance[2].abs() < f64::EPSILON);
        assert!((boost - 0.2).abs() < 1e-12);
    }

    #[test]
    fn transient_pressure_leaves_merchant_grievance_alone() {
        let mut fixture = Fixture::new(vec![AgentType::Merchant], &[]);
        fixture.context = MacroContext::default().with_rial_rate(1_500_000.0);
        let mut grievance = vec![0.4];
        let boost = phase_grievance(&fixture.ctx(), &mut grievance);
        assert!((grievance[0] - 0.4).abs() < 1e-12);
        assert!((boost - 0.2).abs() < 1e-12);
    }

    #[test]
    fn accumulating_pressure_compounds_into_grievance() {
        let mut fixture = Fixture::new(vec![AgentType::Merchant], &[]);
        fixture.context = MacroContext::default().with_rial_rate(1_500_000.0);
        fixture.behavior.merchant_pressure = MerchantPressure::Accumulating;
        let mut grievance = vec![0.4];
        for _ in 0..2 {
            let boost = phase_grievance(&fixture.ctx(), &mut grievance);
            assert!(boost.abs() < f64::EPSILON);
        }
        assert!((grievance[0] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn concessions_halve_merchant_grievance_only() {
        let mut fixture = Fixture::new(vec![AgentType::Merchant, AgentType::Civilian], &[]);
        fixture.context = MacroContext::default().with_concessions(true);
        let mut grievance = vec![0.6, 0.6];
        phase_grievance(&fixture.ctx(), &mut grievance);
        assert!((grievance[0] - 0.3).abs() < 1e-12);
        assert!((grievance[1] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn threshold_offsets_are_additive() {
        // 0 student next to 1 hardliner; 2 student alone; 3 civilian next to 1.
        let mut fixture = Fixture::new(
            vec![AgentType::Student, AgentType::Hardliner, AgentType::Student, AgentType::Civilian],
            &[(0, 1), (1, 3)],
        );
        fixture.context = MacroContext::default().with_protest_state(ProtestState::Escalating);
        let mut out = vec![0.0; 4];
        phase_threshold(&fixture.ctx(), &[0.5; 4], &mut out);
        assert!((out[0] - 0.4).abs() < 1e-12);
        assert!((out[1] - 0.5).abs() < 1e-12);
        assert!((out[2] - 0.3).abs() < 1e-12);
        assert!((out[3] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn influence_reads_previous_vector_and_dampens_under_blackout() {
        let mut fixture = Fixture::new(vec![AgentType::Civilian; 3], &[(0, 1), (0, 2)]);
        let previous = [false, true, false];
        let mut out = vec![0.0; 3];
        phase_influence(&fixture.ctx(), &previous, &mut out);
        assert!((out[0] - 0.5).abs() < 1e-12);

        fixture.context = MacroContext::default().with_blackout(true);
        phase_influence(&fixture.ctx(), &previous, &mut out);
        assert!((out[0] - 0.15).abs() < 1e-12);
    }

    #[test]
    fn activation_is_strict_and_excludes_security() {
        let fixture = Fixture::new(
            vec![
                AgentType::Civilian,
                AgentType::Civilian,
                AgentType::Conscript,
                AgentType::Hardliner,
                AgentType::Merchant,
            ],
            &[],
        );
        let grievance = [0.5, 0.51, 1.0, 1.0, 0.35];
        let influence = [0.0; 5];
        let threshold = [0.5; 5];
        let mut active = vec![true; 5];
        phase_activation(&fixture.ctx(), &grievance, &influence, &threshold, 0.2, &mut active);
        assert_eq!(active, vec![false, true, false, false, true]);
    }

    #[test]
    fn tenure_increments_or_hard_resets() {
        let mut days = vec![3, 9, 0];
        phase_tenure(&[true, false, true], &mut days);
        assert_eq!(days, vec![4, 0, 1]);
    }

    #[test]
    fn overwhelmed_conscript_needs_crackdown_above_moral_injury() {
        // Conscript 0 surrounded by active civilians 1 and 2.
        let mut fixture = Fixture::new(
            vec![AgentType::Conscript, AgentType::Civilian, AgentType::Civilian],
            &[(0, 1), (0, 2)],
        );
        fixture.defection.base_probability = 1.0;
        let active = [false, true, true];
        let mut eligible = Vec::new();
        let mut rng = StdRng::seed_from_u64(0);

        let mut defected = vec![false; 3];
        fixture.context = MacroContext::default().with_crackdown(0.6);
        let newly = phase_conscript_defection(&fixture.ctx(), &active, &mut defected, &mut eligible, &mut rng);
        assert_eq!(newly, 0);

        fixture.context = MacroContext::default().with_crackdown(0.7);
        let newly = phase_conscript_defection(&fixture.ctx(), &active, &mut defected, &mut eligible, &mut rng);
        assert_eq!(newly, 1);
        assert!(defected[0]);
    }

    #[test]
    fn contagion_reads_pre_phase_defection_state() {
        // Chain 0-1-2 of conscripts; only 0 has defected. 1 sees 1/2 defected
        // neighbors and is eligible; 2 sees only 1, which has not defected
        // before this phase, so it must stay loyal even if 1 defects now.
        let mut fixture = Fixture::new(vec![AgentType::Conscript; 3], &[(0, 1), (1, 2)]);
        fixture.defection.base_probability = 1.0;
        let mut defected = vec![true, false, false];
        let mut eligible = Vec::new();
        let newly = phase_conscript_defection(
            &fixture.ctx(),
            &[false; 3],
            &mut defected,
            &mut eligible,
            &mut StdRng::seed_from_u64(1),
        );
        assert_eq!(eligible, vec![1]);
        assert_eq!(newly, 1);
        assert_eq!(defected, vec![true, true, false]);
    }

    #[test]
    fn fear_of_hardliner_can_block_defection_entirely() {
        let mut fixture = Fixture::new(
            vec![AgentType::Conscript, AgentType::Conscript, AgentType::Hardliner],
            &[(0, 1), (1, 2)],
        );
        fixture.defection.base_probability = 0.2;
        let mut defected = vec![true, false, false];
        let mut eligible = Vec::new();
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..50 {
            phase_conscript_defection(&fixture.ctx(), &[false; 3], &mut defected, &mut eligible, &mut rng);
        }
        assert!(!defected[1]);
    }

    #[test]
    fn hardliners_defect_all_at_once_past_cascade_threshold() {
        let fixture = Fixture::new(
            vec![
                AgentType::Conscript,
                AgentType::Conscript,
                AgentType::Hardliner,
                AgentType::Hardliner,
            ],
            &[],
        );
        let mut defected = vec![true, false, false, false];
        // Rate 0.5 is not strictly above the threshold.
        assert_eq!(phase_hardliner_defection(&fixture.ctx(), 2, &mut defected), 0);
        defected[1] = true;
        assert_eq!(phase_hardliner_defection(&fixture.ctx(), 2, &mut defected), 2);
        assert!(defected.iter().all(|d| *d));
        assert_eq!(phase_hardliner_defection(&fixture.ctx(), 2, &mut defected), 0);
    }

    #[test]
    fn regime_collapse_triggers_hardliner_defection() {
        let mut fixture = Fixture::new(vec![AgentType::Hardliner, AgentType::Civilian], &[]);
        fixture.context = MacroContext::default().with_regime_state(RegimeState::Collapsed);
        let mut defected = vec![false, false];
        assert_eq!(phase_hardliner_defection(&fixture.ctx(), 0, &mut defected), 1);
        assert_eq!(defected, vec![true, false]);
    }
}
