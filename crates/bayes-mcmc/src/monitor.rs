use std::fs::{self, File};
use std::path::{Path, PathBuf};

use bayes_core::errors::{BayesError, ErrorInfo};
use bayes_core::{NodeId, Value};
use bayes_dag::DagGraph;
use csv::{Writer, WriterBuilder};

const FIXED_COLUMNS: [&str; 4] = ["Iteration", "Posterior", "Likelihood", "Prior"];

/// Delimited trace file: one header row, then one row per sample.
pub struct TraceMonitor {
    path: PathBuf,
    writer: Writer<File>,
    nodes: Vec<(NodeId, usize)>,
    rows: usize,
}

/// Posterior terms written in front of the node columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceRow {
    /// Generation the row was taken at.
    pub generation: u64,
    /// Log posterior.
    pub posterior: f64,
    /// Log likelihood (clamped nodes).
    pub likelihood: f64,
    /// Log prior (unclamped stochastic nodes).
    pub prior: f64,
}

impl TraceMonitor {
    /// Creates the file and writes the header for `nodes`.
    ///
    /// Vector-valued nodes get one column per component; the widths are fixed
    /// by the values at creation time.
    pub fn create(
        path: &Path,
        delimiter: u8,
        graph: &mut DagGraph,
        nodes: &[NodeId],
    ) -> Result<Self, BayesError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| BayesError::serde("trace-mkdir", err, parent))?;
        }
        let mut widths = Vec::with_capacity(nodes.len());
        for node in nodes {
            widths.push((*node, width(graph.value(*node)?)));
        }
        let header = trace_header(graph, &widths)?;
        let mut writer = WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(path)
            .map_err(|err| BayesError::serde("trace-create", err, path))?;
        writer
            .write_record(&header)
            .map_err(|err| BayesError::serde("trace-write", err, path))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            nodes: widths,
            rows: 0,
        })
    }

    /// Appends one sample row.
    pub fn write_row(&mut self, row: TraceRow, graph: &mut DagGraph) -> Result<(), BayesError> {
        let mut record = vec![
            row.generation.to_string(),
            row.posterior.to_string(),
            row.likelihood.to_string(),
            row.prior.to_string(),
        ];
        for (node, expected) in &self.nodes {
            let components = graph.value(*node)?.components();
            if components.len() != *expected {
                return Err(BayesError::Sampler(
                    ErrorInfo::new("trace-width-changed", "monitored value changed dimension")
                        .with_context("node", node)
                        .with_context("expected", expected)
                        .with_context("actual", components.len()),
                ));
            }
            record.extend(components.iter().map(f64::to_string));
        }
        self.writer
            .write_record(&record)
            .map_err(|err| BayesError::serde("trace-write", err, &self.path))?;
        self.rows += 1;
        Ok(())
    }

    /// Flushes buffered rows to disk.
    pub fn flush(&mut self) -> Result<(), BayesError> {
        self.writer
            .flush()
            .map_err(|err| BayesError::serde("trace-flush", err, &self.path))
    }

    /// Location of the trace file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written so far, excluding the header.
    pub fn rows(&self) -> usize {
        self.rows
    }
}

/// Visible nodes of `nodes`, in order; the default monitored set.
pub fn visible_nodes(graph: &DagGraph, nodes: &[NodeId]) -> Result<Vec<NodeId>, BayesError> {
    let mut out = Vec::new();
    for node in nodes {
        if !graph.is_hidden(*node)? {
            out.push(*node);
        }
    }
    Ok(out)
}

fn trace_header(graph: &DagGraph, nodes: &[(NodeId, usize)]) -> Result<Vec<String>, BayesError> {
    let mut header: Vec<String> = FIXED_COLUMNS.iter().map(|c| c.to_string()).collect();
    for (node, columns) in nodes {
        let label = graph.label(*node)?;
        if graph.peek_value(*node)?.as_real_vec().is_some() {
            header.extend((1..=*columns).map(|i| format!("{label}[{i}]")));
        } else {
            header.push(label);
        }
    }
    Ok(header)
}

fn width(value: &Value) -> usize {
    value.components().len()
}
