//! Compressed sparse row adjacency for the agent social network.
//!
//! [`SocialNetwork`] stores, for every agent `i`, the sorted list of its
//! neighbors in `targets[offsets[i]..offsets[i + 1]]`. Every undirected edge
//! appears twice (once per endpoint). The structure is immutable once built
//! and is shared between model clones behind an `Arc`.
//!
//! The aggregation queries here are the sparse matrix-vector products the
//! step pipeline relies on: they read a whole-population flag vector and
//! produce a whole-population result, never observing partial updates.

use serde::Serialize;

use crate::error::NetworkError;

/// Undirected, loop-free agent adjacency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialNetwork {
    /// Row offsets into `targets`; length `node_count + 1`.
    offsets: Vec<usize>,
    /// Concatenated sorted neighbor lists.
    targets: Vec<usize>,
}

/// Summary statistics of a built network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkStats {
    /// Number of agents.
    pub node_count: usize,
    /// Number of undirected edges.
    pub edge_count: usize,
    /// Mean undirected degree.
    pub mean_degree: f64,
    /// Smallest degree.
    pub min_degree: usize,
    /// Largest degree.
    pub max_degree: usize,
    /// Agents with no neighbors at all.
    pub isolated_nodes: usize,
}

impl SocialNetwork {
    /// Build a network from an edge list.
    ///
    /// Edges are treated as undirected: `(a, b)` and `(b, a)` produce the
    /// same single edge, and repeated edges collapse. This is how the
    /// generators symmetrize their directed edge sets.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::NodeOutOfRange`] if an endpoint is not in
    /// `0..node_count`, or [`NetworkError::SelfLoop`] if an edge connects a
    /// node to itself.
    pub fn from_edges<I>(node_count: usize, edges: I) -> Result<Self, NetworkError>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); node_count];

        for (a, b) in edges {
            if a == b {
                return Err(NetworkError::SelfLoop(a));
            }
            for node in [a, b] {
                if node >= node_count {
                    return Err(NetworkError::NodeOutOfRange { node, node_count });
                }
            }
            if let Some(row) = adjacency.get_mut(a) {
                row.push(b);
            }
            if let Some(row) = adjacency.get_mut(b) {
                row.push(a);
            }
        }

        let mut offsets = Vec::with_capacity(node_count.saturating_add(1));
        let mut targets = Vec::new();
        offsets.push(0);
        for mut row in adjacency {
            row.sort_unstable();
            row.dedup();
            targets.extend_from_slice(&row);
            offsets.push(targets.len());
        }

        Ok(Self { offsets, targets })
    }

    /// Number of agents in the network.
    pub fn node_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.targets.len() / 2
    }

    /// Sorted neighbors of `node`. Empty for out-of-range nodes.
    pub fn neighbors(&self, node: usize) -> &[usize] {
        let (Some(&start), Some(&end)) = (self.offsets.get(node), self.offsets.get(node.saturating_add(1)))
        else {
            return &[];
        };
        self.targets.get(start..end).unwrap_or(&[])
    }

    /// Degree of `node`.
    pub fn degree(&self, node: usize) -> usize {
        self.neighbors(node).len()
    }

    /// Iterate every node's neighbor slice in index order.
    pub fn rows(&self) -> impl Iterator<Item = &[usize]> + '_ {
        self.offsets
            .windows(2)
            .map(|w| match w {
                [start, end] => self.targets.get(*start..*end).unwrap_or(&[]),
                _ => &[],
            })
    }

    /// Iterate undirected edges once each, as `(low, high)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows().enumerate().flat_map(|(node, row)| {
            row.iter().copied().filter(move |&other| other > node).map(move |other| (node, other))
        })
    }

    /// Mean undirected degree.
    pub fn mean_degree(&self) -> f64 {
        let nodes = self.node_count();
        if nodes == 0 {
            return 0.0;
        }
        // Edge and node counts are far below 2^52; no precision loss in practice.
        #[allow(clippy::cast_precision_loss)]
        let mean = self.targets.len() as f64 / nodes as f64;
        mean
    }

    // -------------------------------------------------------------------
    // Whole-population aggregation
    // -------------------------------------------------------------------

    /// For every node, the fraction of its neighbors whose flag is set.
    ///
    /// The denominator is the degree floored at 1, so isolated nodes get 0
    /// rather than a division by zero. Writes into `out`, which must have
    /// one slot per node; extra slots are left untouched.
    pub fn flagged_fraction_into(&self, flags: &[bool], out: &mut [f64]) {
        for (slot, row) in out.iter_mut().zip(self.rows()) {
            let flagged = row
                .iter()
                .filter(|&&n| flags.get(n).copied().unwrap_or(false))
                .count();
            #[allow(clippy::cast_precision_loss)]
            let fraction = flagged as f64 / row.len().max(1) as f64;
            *slot = fraction;
        }
    }

    /// Fraction of one node's neighbors whose flag is set, with the same
    /// floored denominator as [`SocialNetwork::flagged_fraction_into`].
    pub fn flagged_fraction_of(&self, node: usize, flags: &[bool]) -> f64 {
        let row = self.neighbors(node);
        let flagged = row
            .iter()
            .filter(|&&n| flags.get(n).copied().unwrap_or(false))
            .count();
        #[allow(clippy::cast_precision_loss)]
        let fraction = flagged as f64 / row.len().max(1) as f64;
        fraction
    }

    /// For every node, whether at least one neighbor's flag is set.
    pub fn any_flagged_neighbor(&self, flags: &[bool]) -> Vec<bool> {
        self.rows()
            .map(|row| row.iter().any(|&n| flags.get(n).copied().unwrap_or(false)))
            .collect()
    }

    /// Number of undirected edges with both endpoints flagged.
    pub fn edges_within(&self, flags: &[bool]) -> usize {
        self.rows()
            .zip(flags)
            .enumerate()
            .filter(|(_, (_, flagged))| **flagged)
            .map(|(node, (row, _))| {
                row.iter()
                    .filter(|&&other| other > node && flags.get(other).copied().unwrap_or(false))
                    .count()
            })
            .sum()
    }

    // -------------------------------------------------------------------
    // Invariant checks
    // -------------------------------------------------------------------

    /// Whether every edge `(i, j)` has its reverse `(j, i)`.
    pub fn is_symmetric(&self) -> bool {
        self.rows().enumerate().all(|(node, row)| {
            row.iter().all(|&other| self.neighbors(other).binary_search(&node).is_ok())
        })
    }

    /// Whether any node lists itself as a neighbor.
    pub fn has_self_loops(&self) -> bool {
        self.rows()
            .enumerate()
            .any(|(node, row)| row.binary_search(&node).is_ok())
    }

    /// Compute summary statistics.
    pub fn stats(&self) -> NetworkStats {
        let degrees = self.rows().map(<[usize]>::len);
        let (min_degree, max_degree, isolated_nodes) = degrees.fold(
            (usize::MAX, 0_usize, 0_usize),
            |(min, max, isolated), d| {
                (min.min(d), max.max(d), if d == 0 { isolated.saturating_add(1) } else { isolated })
            },
        );
        NetworkStats {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            mean_degree: self.mean_degree(),
            min_degree: if self.node_count() == 0 { 0 } else { min_degree },
            max_degree,
            isolated_nodes,
        }
    }
}
