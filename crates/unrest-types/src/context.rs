//! Per-step macro context supplied by the external controller.

use serde::{Deserialize, Serialize};

use crate::enums::{ProtestState, RegimeState};

/// Exogenous conditions for one simulated day.
///
/// Every field is optional on the wire: a missing field deserializes to its
/// neutral default (no currency stress, no crackdown, no concessions, no
/// blackout, stable protest and regime states). The engine never rejects a
/// context, and numeric fields are not range-checked here; that is the
/// caller's job.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MacroContext {
    /// Free-market rial per US dollar. `None` means no economic signal.
    pub rial_rate: Option<f64>,
    /// Security crackdown intensity in `[0, 1]`.
    pub crackdown_intensity: f64,
    /// Whether the regime is currently offering concessions.
    pub concessions_offered: bool,
    /// Whether a national internet blackout is in effect.
    pub internet_blackout: bool,
    /// Current protest-movement state.
    pub protest_state: ProtestState,
    /// Current regime stability state.
    pub regime_state: RegimeState,
}

impl MacroContext {
    /// The neutral context: no effect on any agent.
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Return a copy with the given rial rate.
    #[must_use]
    pub const fn with_rial_rate(mut self, rate: f64) -> Self {
        self.rial_rate = Some(rate);
        self
    }

    /// Return a copy with the given crackdown intensity.
    #[must_use]
    pub const fn with_crackdown(mut self, intensity: f64) -> Self {
        self.crackdown_intensity = intensity;
        self
    }

    /// Return a copy with concessions switched on or off.
    #[must_use]
    pub const fn with_concessions(mut self, offered: bool) -> Self {
        self.concessions_offered = offered;
        self
    }

    /// Return a copy with the internet blackout switched on or off.
    #[must_use]
    pub const fn with_blackout(mut self, blackout: bool) -> Self {
        self.internet_blackout = blackout;
        self
    }

    /// Return a copy with the given protest state.
    #[must_use]
    pub const fn with_protest_state(mut self, state: ProtestState) -> Self {
        self.protest_state = state;
        self
    }

    /// Return a copy with the given regime state.
    #[must_use]
    pub const fn with_regime_state(mut self, state: RegimeState) -> Self {
        self.regime_state = state;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_neutral() {
        let ctx: MacroContext = serde_json::from_str("{}").unwrap();
        assert_eq!(ctx, MacroContext::neutral());
        assert!(ctx.rial_rate.is_none());
        assert!(!ctx.internet_blackout);
        assert_eq!(ctx.protest_state, ProtestState::Stable);
        assert_eq!(ctx.regime_state, RegimeState::Stable);
    }

    #[test]
    fn partial_object_keeps_other_defaults() {
        let ctx: MacroContext =
            serde_json::from_str(r#"{"internet_blackout": true, "protest_state": "escalating"}"#)
                .unwrap();
        assert!(ctx.internet_blackout);
        assert_eq!(ctx.protest_state, ProtestState::Escalating);
        assert!(!ctx.concessions_offered);
        assert!(ctx.crackdown_intensity.abs() < f64::EPSILON);
    }

    #[test]
    fn builders_set_fields() {
        let ctx = MacroContext::neutral()
            .with_rial_rate(1_200_000.0)
            .with_crackdown(0.8)
            .with_regime_state(RegimeState::Collapsed);
        assert!(ctx.rial_rate.is_some_and(|r| (r - 1_200_000.0).abs() < 1e-9));
        assert!((ctx.crackdown_intensity - 0.8).abs() < f64::EPSILON);
        assert!(ctx.regime_state.is_collapsed());
    }
}
