//! Declarative model descriptions loaded from JSON or YAML.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use bayes_core::errors::{BayesError, ErrorInfo};
use bayes_core::{NodeId, RngHandle, SchemaVersion, Value};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::distributions::distribution_by_name;
use crate::functions::function_by_name;
use crate::graph::DagGraph;
use crate::model::Model;

/// Model description: named nodes, declared parents first, plus the sources
/// the model is extracted from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBlueprint {
    /// Schema the blueprint was written against.
    #[serde(default)]
    pub schema: SchemaVersion,
    /// Node declarations in dependency order.
    pub nodes: Vec<NodeBlueprint>,
    /// Names of the nodes the model is extracted from.
    pub sources: Vec<String>,
}

/// One node declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeBlueprint {
    /// Unique node name.
    pub name: String,
    /// Hide the node from summaries and traces.
    #[serde(default)]
    pub hidden: bool,
    /// Capability and parameters.
    #[serde(flatten)]
    pub spec: NodeSpec,
}

/// Capability-specific part of a node declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NodeSpec {
    /// Fixed value.
    Constant {
        /// Value of the node.
        value: Value,
    },
    /// Random variable.
    Stochastic {
        /// Registry name of the distribution.
        distribution: String,
        /// Parameter node names in distribution order.
        #[serde(default)]
        parents: Vec<String>,
        /// Initial value; drawn from the distribution when absent.
        #[serde(default)]
        value: Option<Value>,
        /// Whether the value is observed data.
        #[serde(default)]
        clamped: bool,
    },
    /// Function of its parents.
    Deterministic {
        /// Registry name of the function.
        function: String,
        /// Argument node names in order.
        parents: Vec<String>,
    },
}

/// Result of building a blueprint: the user-level nodes and the extracted model.
#[derive(Debug)]
pub struct BuiltModel {
    /// Original nodes by name.
    pub originals: BTreeMap<String, NodeId>,
    /// Model cloned from the declared sources.
    pub model: Model,
}

impl BuiltModel {
    /// Model clone of the node declared under `name`.
    pub fn model_node(&self, name: &str) -> Option<NodeId> {
        self.originals
            .get(name)
            .and_then(|original| self.model.clone_of(*original))
    }
}

impl ModelBlueprint {
    /// Loads a blueprint, choosing JSON or YAML from the file extension.
    pub fn load(path: &Path) -> Result<Self, BayesError> {
        let contents = fs::read_to_string(path)
            .map_err(|err| BayesError::serde("blueprint-read", err, path))?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let blueprint: ModelBlueprint = if is_json {
            serde_json::from_str(&contents)
                .map_err(|err| BayesError::serde("blueprint-parse", err, path))?
        } else {
            serde_yaml::from_str(&contents)
                .map_err(|err| BayesError::serde("blueprint-parse", err, path))?
        };
        if !SchemaVersion::current().accepts(&blueprint.schema) {
            return Err(BayesError::Serde(
                ErrorInfo::new("schema-mismatch", "blueprint schema is not supported")
                    .with_context("path", path.display())
                    .with_context("schema", blueprint.schema),
            ));
        }
        Ok(blueprint)
    }

    /// Creates the declared nodes in `graph` and extracts the model.
    pub fn build(&self, graph: &mut DagGraph, rng: &mut RngHandle) -> Result<BuiltModel, BayesError> {
        let mut originals: BTreeMap<String, NodeId> = BTreeMap::new();
        for decl in &self.nodes {
            if originals.contains_key(&decl.name) {
                return Err(blueprint_error("duplicate-name", "node name declared twice")
                    .with_context("name", &decl.name));
            }
            let id = match &decl.spec {
                NodeSpec::Constant { value } => graph.add_constant(decl.name.clone(), value.clone()),
                NodeSpec::Stochastic {
                    distribution,
                    parents,
                    value,
                    clamped,
                } => {
                    let parent_ids = resolve(&originals, parents, &decl.name)?;
                    let distribution = distribution_by_name(distribution)?;
                    let initial = match value {
                        Some(value) => value.clone(),
                        None => {
                            let mut args = Vec::with_capacity(parent_ids.len());
                            for parent in &parent_ids {
                                args.push(graph.value(*parent)?.clone());
                            }
                            distribution.sample(&args, rng)?
                        }
                    };
                    let id = graph.add_stochastic(decl.name.clone(), distribution, &parent_ids, initial.clone())?;
                    if *clamped {
                        graph.clamp(id, initial)?;
                        graph.keep(id)?;
                    }
                    id
                }
                NodeSpec::Deterministic { function, parents } => {
                    let parent_ids = resolve(&originals, parents, &decl.name)?;
                    graph.add_deterministic(decl.name.clone(), function_by_name(function)?, &parent_ids)?
                }
            };
            graph.set_hidden(id, decl.hidden)?;
            originals.insert(decl.name.clone(), id);
        }

        let sources = resolve(&originals, &self.sources, "sources")?;
        if sources.is_empty() {
            return Err(blueprint_error("no-sources", "a model needs at least one source node"));
        }
        let model = Model::from_sources(graph, &sources)?;
        info!(
            declared = originals.len(),
            cloned = model.dag_nodes().len(),
            "blueprint built"
        );
        Ok(BuiltModel { originals, model })
    }
}

fn resolve(
    originals: &BTreeMap<String, NodeId>,
    names: &[String],
    owner: &str,
) -> Result<Vec<NodeId>, BayesError> {
    names
        .iter()
        .map(|name| {
            originals.get(name).copied().ok_or_else(|| {
                blueprint_error("unknown-parent", "referenced node is not declared before use")
                    .with_context("name", name)
                    .with_context("owner", owner)
            })
        })
        .collect()
}

fn blueprint_error(code: &str, message: &str) -> BayesError {
    BayesError::Model(ErrorInfo::new(code, message))
}
