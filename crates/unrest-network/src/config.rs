//! Network configuration.

use serde::{Deserialize, Serialize};
use unrest_types::Topology;

use crate::error::NetworkError;

/// Topology selector and generator parameters.
///
/// `avg_neighbors` is the *nominal* `k`. Its relation to the realized
/// undirected degree depends on the topology:
///
/// | Topology | Realized mean degree |
/// |----------|----------------------|
/// | Lattice  | exactly `k` (rounded up to even) |
/// | Random   | about `2k` after symmetrization |
/// | SmallWorld | about `2k`: `k` is the one-sided ring half-degree |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Generator to use.
    #[serde(default)]
    pub topology: Topology,

    /// Nominal neighbor parameter `k`.
    #[serde(default = "default_avg_neighbors")]
    pub avg_neighbors: usize,

    /// Small-world rewire probability `p` per directed ring edge.
    #[serde(default = "default_rewire_probability")]
    pub rewire_probability: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            topology: Topology::default(),
            avg_neighbors: default_avg_neighbors(),
            rewire_probability: default_rewire_probability(),
        }
    }
}

impl NetworkConfig {
    /// Check the parameters against a population of `node_count` agents.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InvalidParameter`] naming the first parameter
    /// that is out of range.
    pub fn validate(&self, node_count: usize) -> Result<(), NetworkError> {
        if self.avg_neighbors == 0 {
            return Err(NetworkError::InvalidParameter {
                parameter: "avg_neighbors",
                reason: "average neighbor count must be positive".to_owned(),
            });
        }
        if self.avg_neighbors >= node_count {
            return Err(NetworkError::InvalidParameter {
                parameter: "avg_neighbors",
                reason: format!(
                    "average neighbor count {} must be smaller than the population ({node_count})",
                    self.avg_neighbors
                ),
            });
        }
        if self.topology == Topology::Lattice {
            let even = lattice_degree(self.avg_neighbors);
            if even >= node_count {
                return Err(NetworkError::InvalidParameter {
                    parameter: "avg_neighbors",
                    reason: format!(
                        "lattice degree {even} (rounded up to even) must be smaller than the population ({node_count})"
                    ),
                });
            }
        }
        if !(0.0..=1.0).contains(&self.rewire_probability) {
            return Err(NetworkError::InvalidParameter {
                parameter: "rewire_probability",
                reason: format!("must be within [0, 1], got {}", self.rewire_probability),
            });
        }
        Ok(())
    }
}

/// Lattice degree: `k` rounded up to the next even number.
pub(crate) const fn lattice_degree(k: usize) -> usize {
    k.saturating_add(k % 2)
}

const fn default_avg_neighbors() -> usize {
    8
}

const fn default_rewire_probability() -> f64 {
    0.1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_for_ten_thousand_agents() {
        assert!(NetworkConfig::default().validate(10_000).is_ok());
    }

    #[test]
    fn zero_neighbors_is_rejected_with_message() {
        let config = NetworkConfig {
            avg_neighbors: 0,
            ..NetworkConfig::default()
        };
        let err = config.validate(100).err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("average neighbor count must be positive"), "{err}");
    }

    #[test]
    fn probability_out_of_range_is_rejected() {
        let config = NetworkConfig {
            rewire_probability: 1.5,
            ..NetworkConfig::default()
        };
        assert!(matches!(
            config.validate(100),
            Err(NetworkError::InvalidParameter { parameter: "rewire_probability", .. })
        ));
    }

    #[test]
    fn odd_lattice_degree_must_fit_after_rounding() {
        let config = NetworkConfig {
            topology: Topology::Lattice,
            avg_neighbors: 5,
            rewire_probability: 0.0,
        };
        assert!(config.validate(6).is_err());
        assert!(config.validate(7).is_ok());
    }

    #[test]
    fn parses_from_json_with_defaults() {
        let config: Result<NetworkConfig, _> = serde_json::from_str(r#"{"topology": "random"}"#);
        let config = config.unwrap_or_default();
        assert_eq!(config.topology, Topology::Random);
        assert_eq!(config.avg_neighbors, 8);
    }
}
