//! Structured error types shared across the bayes crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`BayesError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (node ids, names, counts).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the DAG engine and its samplers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum BayesError {
    /// Structural errors raised by the node arena.
    #[error("graph error: {0}")]
    Graph(ErrorInfo),
    /// Model construction errors.
    #[error("model error: {0}")]
    Model(ErrorInfo),
    /// Move registration and protocol errors.
    #[error("move error: {0}")]
    Move(ErrorInfo),
    /// Sampler driver errors.
    #[error("sampler error: {0}")]
    Sampler(ErrorInfo),
    /// Invalid configuration values.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Serialization, parsing and I/O errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl BayesError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            BayesError::Graph(info)
            | BayesError::Model(info)
            | BayesError::Move(info)
            | BayesError::Sampler(info)
            | BayesError::Config(info)
            | BayesError::Serde(info) => info,
        }
    }

    /// Returns the stable error code.
    pub fn code(&self) -> &str {
        &self.info().code
    }

    /// Adds a context entry to the payload regardless of the family.
    pub fn with_context(self, key: impl Into<String>, value: impl ToString) -> Self {
        match self {
            BayesError::Graph(info) => BayesError::Graph(info.with_context(key, value)),
            BayesError::Model(info) => BayesError::Model(info.with_context(key, value)),
            BayesError::Move(info) => BayesError::Move(info.with_context(key, value)),
            BayesError::Sampler(info) => BayesError::Sampler(info.with_context(key, value)),
            BayesError::Config(info) => BayesError::Config(info.with_context(key, value)),
            BayesError::Serde(info) => BayesError::Serde(info.with_context(key, value)),
        }
    }

    /// Wraps an I/O or parse failure for the given path.
    pub fn serde(code: impl Into<String>, err: impl Display, path: &std::path::Path) -> Self {
        BayesError::Serde(
            ErrorInfo::new(code, err.to_string()).with_context("path", path.display()),
        )
    }
}
