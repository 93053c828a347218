#![deny(missing_docs)]
#![doc = "Core identifiers, values, errors and seeding shared by the bayes DAG engine crates."]

use serde::{Deserialize, Serialize};

pub mod errors;
pub mod provenance;
pub mod rng;
mod value;

pub use errors::{BayesError, ErrorInfo};
pub use provenance::SchemaVersion;
pub use rng::{derive_substream_seed, RngHandle};
pub use value::Value;

/// Stable handle identifying a node inside a DAG arena.
///
/// The handle is independent of the node's value and stays valid (but dead)
/// after the node has been destroyed; slots are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Creates a new identifier from its raw integer representation.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer representation of the identifier.
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
