//! Enumeration types for the Unrest simulation.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Agent types
// ---------------------------------------------------------------------------

/// The behavioral class of an agent.
///
/// Fixed at initialization. Security types (`Conscript`, `Hardliner`) never
/// protest; they can only defect. The remaining types are the mobilizable
/// population whose activation is recomputed every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    /// University students. Lower activation bar during escalation.
    Student,
    /// Bazaar merchants. Sensitive to currency stress and concessions.
    Merchant,
    /// Conscripted security personnel. May defect under pressure.
    Conscript,
    /// Regime true believers. Grievance locked at zero; defect only on
    /// regime collapse or a conscript defection cascade.
    Hardliner,
    /// The general population.
    Civilian,
}

impl AgentType {
    /// Number of agent types.
    pub const COUNT: usize = 5;

    /// Every agent type in canonical order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Student,
        Self::Merchant,
        Self::Conscript,
        Self::Hardliner,
        Self::Civilian,
    ];

    /// Dense index of this type in [`AgentType::ALL`], for per-type tables.
    pub const fn index(self) -> usize {
        match self {
            Self::Student => 0,
            Self::Merchant => 1,
            Self::Conscript => 2,
            Self::Hardliner => 3,
            Self::Civilian => 4,
        }
    }

    /// Whether this type belongs to the security forces.
    pub const fn is_security(self) -> bool {
        matches!(self, Self::Conscript | Self::Hardliner)
    }

    /// Whether this type can protest.
    pub const fn is_mobilizable(self) -> bool {
        !self.is_security()
    }

    /// Lowercase name used as a metric key.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Merchant => "merchant",
            Self::Conscript => "conscript",
            Self::Hardliner => "hardliner",
            Self::Civilian => "civilian",
        }
    }
}

impl core::fmt::Display for AgentType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Macro states (owned by the external controller)
// ---------------------------------------------------------------------------

/// Protest-movement state reported by the macro controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtestState {
    /// No organized movement.
    #[default]
    Stable,
    /// The movement is growing; students mobilize more readily.
    Escalating,
    /// The movement has plateaued at a sustained level.
    Sustained,
    /// The movement is losing participants.
    Declining,
}

impl ProtestState {
    /// Whether this state lowers the student activation threshold.
    pub const fn indicates_escalation(self) -> bool {
        matches!(self, Self::Escalating)
    }
}

/// Regime stability state reported by the macro controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeState {
    /// The regime is in full control.
    #[default]
    Stable,
    /// Elite cohesion is under visible strain.
    Strained,
    /// Factions are openly splitting.
    Fracturing,
    /// The regime has collapsed. Hardliners defect en masse.
    Collapsed,
}

impl RegimeState {
    /// Whether this state triggers terminal hardliner defection.
    pub const fn is_collapsed(self) -> bool {
        matches!(self, Self::Collapsed)
    }
}

// ---------------------------------------------------------------------------
// Network topology
// ---------------------------------------------------------------------------

/// Social network topology selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// Ring lattice: `k/2` nearest neighbors on each side.
    Lattice,
    /// Erdős–Rényi-like: `k` random targets per agent, symmetrized.
    Random,
    /// Watts–Strogatz: one-sided ring of `k`, rewired with probability `p`,
    /// symmetrized.
    #[default]
    SmallWorld,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_indices_match_canonical_order() {
        for (expected, agent_type) in AgentType::ALL.iter().enumerate() {
            assert_eq!(agent_type.index(), expected);
        }
    }

    #[test]
    fn security_and_mobilizable_partition_types() {
        let security: Vec<AgentType> =
            AgentType::ALL.into_iter().filter(|t| t.is_security()).collect();
        assert_eq!(security, vec![AgentType::Conscript, AgentType::Hardliner]);
        assert!(AgentType::ALL.iter().all(|t| t.is_security() != t.is_mobilizable()));
    }

    #[test]
    fn only_escalating_lowers_student_bar() {
        assert!(ProtestState::Escalating.indicates_escalation());
        assert!(!ProtestState::Stable.indicates_escalation());
        assert!(!ProtestState::Sustained.indicates_escalation());
        assert!(!ProtestState::Declining.indicates_escalation());
    }

    #[test]
    fn topology_deserializes_snake_case() {
        let topology: Result<Topology, _> = serde_json::from_str("\"small_world\"");
        assert!(matches!(topology, Ok(Topology::SmallWorld)));
        let topology: Result<Topology, _> = serde_json::from_str("\"lattice\"");
        assert!(matches!(topology, Ok(Topology::Lattice)));
    }
}
