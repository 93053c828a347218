#![deny(missing_docs)]
#![doc = include_str!("../docs/dag-api.md")]

mod blueprint;
mod clone;
pub mod distributions;
pub mod functions;
mod graph;
mod hash;
mod ids;
mod model;
mod node;
mod protocol;

pub use blueprint::{BuiltModel, ModelBlueprint, NodeBlueprint, NodeSpec};
pub use distributions::{distribution_by_name, Distribution};
pub use functions::{function_by_name, DeterministicFunction};
pub use graph::DagGraph;
pub use hash::canonical_hash;
pub use model::{Model, ModelSummary};
pub use node::{NodeStatus, NodeTag, Partition};
