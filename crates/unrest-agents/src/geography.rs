//! Population-weighted province assignment.
//!
//! Provinces exist for regional reporting only; no behavioral rule reads
//! them. Agents are assigned contiguously in index order: province 0 gets
//! the first `floor(N × share_0)` agents, province 1 the next block, and
//! the last province receives whatever remains so every agent is covered.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use unrest_types::ProvinceId;

use crate::error::PopulationError;

/// Name of the single province used when no table is configured.
pub const DEFAULT_PROVINCE: &str = "national";

/// One row of the province table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvinceShare {
    /// Province name used as the regional report key.
    pub name: String,
    /// Population weight. Only ratios matter.
    pub population: f64,
}

impl ProvinceShare {
    /// Construct a table row.
    pub fn new(name: impl Into<String>, population: f64) -> Self {
        Self {
            name: name.into(),
            population,
        }
    }
}

/// Validate a province table. An empty table is valid.
///
/// Names must be unique: they key the regional participation report.
pub(crate) fn validate_shares(shares: &[ProvinceShare]) -> Result<(), PopulationError> {
    if shares.len() > usize::from(u16::MAX) {
        return Err(PopulationError::invalid(
            "provinces",
            format!("at most {} provinces are supported, got {}", u16::MAX, shares.len()),
        ));
    }
    let mut seen = BTreeSet::new();
    for share in shares {
        if !seen.insert(share.name.as_str()) {
            return Err(PopulationError::invalid(
                "provinces",
                format!("duplicate province name `{}`", share.name),
            ));
        }
        if !share.population.is_finite() || share.population < 0.0 {
            return Err(PopulationError::invalid(
                format!("provinces.{}", share.name),
                format!("population must be finite and non-negative, got {}", share.population),
            ));
        }
    }
    if !shares.is_empty() && shares.iter().map(|s| s.population).sum::<f64>() <= 0.0 {
        return Err(PopulationError::invalid(
            "provinces",
            "total province population must be positive",
        ));
    }
    Ok(())
}

/// Assign `size` agents to provinces.
///
/// Returns the per-agent province ids and the province names indexed by
/// id. With an empty table every agent lands in [`DEFAULT_PROVINCE`].
///
/// # Errors
///
/// Returns [`PopulationError::InvalidParameter`] if the table is invalid.
pub fn assign_provinces(
    size: usize,
    shares: &[ProvinceShare],
) -> Result<(Vec<ProvinceId>, Vec<String>), PopulationError> {
    validate_shares(shares)?;

    if shares.is_empty() {
        return Ok((vec![ProvinceId(0); size], vec![DEFAULT_PROVINCE.to_owned()]));
    }

    let total: f64 = shares.iter().map(|s| s.population).sum();
    let mut assignment = Vec::with_capacity(size);
    let last = shares.len().saturating_sub(1);

    for (idx, share) in shares.iter().enumerate() {
        let id = ProvinceId(u16::try_from(idx).unwrap_or(u16::MAX));
        let count = if idx == last {
            size.saturating_sub(assignment.len())
        } else {
            floor_count(share.population / total, size)
                .min(size.saturating_sub(assignment.len()))
        };
        assignment.extend(std::iter::repeat_n(id, count));
    }

    let names = shares.iter().map(|s| s.name.clone()).collect();
    Ok((assignment, names))
}

/// `floor(fraction × size)`. The fraction is within `[0, 1]`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn floor_count(fraction: f64, size: usize) -> usize {
    (fraction * size as f64).floor() as usize
}
