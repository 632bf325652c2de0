//! Network generators.
//!
//! All three generators produce a directed edge set first and hand it to
//! [`SocialNetwork::from_edges`], which symmetrizes it (union of forward and
//! reverse edges) and collapses duplicates. The consequence for degree:
//!
//! - **Lattice** emits `k/2` edges to each side, which already form
//!   reciprocal pairs, so the realized degree is exactly `k`.
//! - **Random** and **small world** emit `k` one-directional edges per
//!   agent. After symmetrization each agent also gains the edges other
//!   agents pointed at it, so the realized mean degree is about `2k`. This
//!   doubling is expected: `avg_neighbors` is the half-degree for these
//!   two generators.
//!
//! Randomness comes exclusively from the caller's generator, so a network
//! is fully determined by `(node_count, config, rng state)`.

use rand::Rng;
use rand::seq::index;
use tracing::{debug, warn};
use unrest_types::Topology;

use crate::config::{NetworkConfig, lattice_degree};
use crate::error::NetworkError;
use crate::graph::SocialNetwork;

/// Build the social network for `node_count` agents.
///
/// # Errors
///
/// Returns [`NetworkError::InvalidParameter`] if `config` does not validate
/// against `node_count`.
pub fn build_network<R: Rng + ?Sized>(
    node_count: usize,
    config: &NetworkConfig,
    rng: &mut R,
) -> Result<SocialNetwork, NetworkError> {
    config.validate(node_count)?;

    let network = match config.topology {
        Topology::Lattice => ring_lattice(node_count, config.avg_neighbors)?,
        Topology::Random => random_graph(node_count, config.avg_neighbors, rng)?,
        Topology::SmallWorld => small_world(
            node_count,
            config.avg_neighbors,
            config.rewire_probability,
            rng,
        )?,
    };

    debug!(
        topology = ?config.topology,
        nodes = network.node_count(),
        edges = network.edge_count(),
        mean_degree = network.mean_degree(),
        "Social network built"
    );
    Ok(network)
}

/// Ring lattice: each node links to its `k/2` nearest neighbors on each
/// side, with `k` rounded up to even. Deterministic.
///
/// # Errors
///
/// Propagates [`SocialNetwork::from_edges`] errors; with a validated config
/// none occur.
#[allow(clippy::arithmetic_side_effects)]
pub fn ring_lattice(node_count: usize, k: usize) -> Result<SocialNetwork, NetworkError> {
    let half = lattice_degree(k) / 2;
    let edges = (0..node_count).flat_map(move |node| {
        (1..=half).map(move |offset| (node, node.saturating_add(offset) % node_count))
    });
    SocialNetwork::from_edges(node_count, edges)
}

/// Random graph: each node samples `min(k, N - 1)` distinct targets other
/// than itself, then the edge set is symmetrized.
///
/// # Errors
///
/// Propagates [`SocialNetwork::from_edges`] errors; with a validated config
/// none occur.
pub fn random_graph<R: Rng + ?Sized>(
    node_count: usize,
    k: usize,
    rng: &mut R,
) -> Result<SocialNetwork, NetworkError> {
    let others = node_count.saturating_sub(1);
    let amount = k.min(others);
    let mut edges = Vec::with_capacity(node_count.saturating_mul(amount));

    for node in 0..node_count {
        // Sample from 0..N-1 and shift indices at or above `node` up by one,
        // which excludes `node` without rejection sampling.
        for pick in index::sample(rng, others, amount).into_iter() {
            let target = if pick >= node { pick.saturating_add(1) } else { pick };
            edges.push((node, target));
        }
    }

    SocialNetwork::from_edges(node_count, edges)
}

/// Watts–Strogatz small world.
///
/// Starts from a one-sided ring where node `i` points at `i+1 ..= i+k`
/// (mod N). Each directed edge independently rewires with probability `p`
/// to a uniform target that is neither the origin nor the original target.
/// The result is symmetrized, so the realized mean degree is about `2k`.
///
/// # Errors
///
/// Propagates [`SocialNetwork::from_edges`] errors; with a validated config
/// none occur.
pub fn small_world<R: Rng + ?Sized>(
    node_count: usize,
    k: usize,
    p: f64,
    rng: &mut R,
) -> Result<SocialNetwork, NetworkError> {
    // Rewiring needs at least one node besides the origin and the old target.
    let can_rewire = node_count >= 3;
    if !can_rewire && p > 0.0 {
        warn!(node_count, "Population too small to rewire; keeping ring lattice edges");
    }

    let mut edges = Vec::with_capacity(node_count.saturating_mul(k));
    let mut rewired: usize = 0;

    for node in 0..node_count {
        for offset in 1..=k {
            #[allow(clippy::arithmetic_side_effects)]
            let target = node.saturating_add(offset) % node_count;
            if can_rewire && p > 0.0 && rng.random_bool(p) {
                edges.push((node, rewire_target(node, target, node_count, rng)));
                rewired = rewired.saturating_add(1);
            } else {
                edges.push((node, target));
            }
        }
    }

    debug!(rewired, directed_edges = edges.len(), "Small-world rewiring complete");
    SocialNetwork::from_edges(node_count, edges)
}

/// Draw a uniform node from `0..node_count` excluding `origin` and `current`.
///
/// Requires `origin != current` and `node_count >= 3`.
fn rewire_target<R: Rng + ?Sized>(
    origin: usize,
    current: usize,
    node_count: usize,
    rng: &mut R,
) -> usize {
    let (low, high) = if origin < current { (origin, current) } else { (current, origin) };
    let mut pick = rng.random_range(0..node_count.saturating_sub(2));
    if pick >= low {
        pick = pick.saturating_add(1);
    }
    if pick >= high {
        pick = pick.saturating_add(1);
    }
    pick
}
