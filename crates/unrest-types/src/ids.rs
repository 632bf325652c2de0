//! Identifier types.
//!
//! Agents themselves are identified by their dense array index (`usize`);
//! there is no per-agent ID object. Provinces are small dense indices into
//! the province table of a population. Batches of Monte Carlo trials carry
//! a UUID v7 so that log lines from concurrent batches can be told apart.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Identifier for one Monte Carlo batch run.
    BatchId
);

/// Dense index of a province in a population's province table.
///
/// Province `0` always exists: when no geographic table is configured,
/// every agent belongs to the single default province.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ProvinceId(pub u16);

impl ProvinceId {
    /// Return the index as a `usize` for table lookups.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl core::fmt::Display for ProvinceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "province-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_ids_are_unique() {
        let a = BatchId::new();
        let b = BatchId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn province_index_round_trips() {
        let id = ProvinceId(7);
        assert_eq!(id.index(), 7);
        assert_eq!(id.to_string(), "province-7");
    }
}
