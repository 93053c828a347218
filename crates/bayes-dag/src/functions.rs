//! Pure functions attachable to deterministic nodes.

use std::fmt;

use bayes_core::errors::{BayesError, ErrorInfo};
use bayes_core::Value;

/// Capability interface of the function attached to a deterministic node.
pub trait DeterministicFunction: fmt::Debug + Send + Sync {
    /// Registry name, also printed in model summaries.
    fn name(&self) -> &'static str;

    /// Evaluates the function on the current parent values.
    fn compute(&self, parents: &[Value]) -> Result<Value, BayesError>;

    /// Returns a boxed copy; used when a DAG is cloned.
    fn box_clone(&self) -> Box<dyn DeterministicFunction>;
}

impl Clone for Box<dyn DeterministicFunction> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Sum of all parents.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sum;

/// Product of all parents.
#[derive(Debug, Clone, Copy, Default)]
pub struct Product;

/// Exponential of a single parent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exp;

/// Natural logarithm of a single parent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ln;

/// Negation of a single parent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Negate;

/// Looks up a builtin function by its registry name.
pub fn function_by_name(name: &str) -> Result<Box<dyn DeterministicFunction>, BayesError> {
    match name {
        "sum" => Ok(Box::new(Sum)),
        "product" => Ok(Box::new(Product)),
        "exp" => Ok(Box::new(Exp)),
        "ln" => Ok(Box::new(Ln)),
        "negate" => Ok(Box::new(Negate)),
        other => Err(BayesError::Graph(
            ErrorInfo::new("unknown-function", "no function registered under this name")
                .with_context("name", other)
                .with_hint("expected one of sum, product, exp, ln, negate"),
        )),
    }
}

impl DeterministicFunction for Sum {
    fn name(&self) -> &'static str {
        "sum"
    }

    fn compute(&self, parents: &[Value]) -> Result<Value, BayesError> {
        Ok(Value::Real(scalars(self.name(), parents)?.iter().sum()))
    }

    fn box_clone(&self) -> Box<dyn DeterministicFunction> {
        Box::new(*self)
    }
}

impl DeterministicFunction for Product {
    fn name(&self) -> &'static str {
        "product"
    }

    fn compute(&self, parents: &[Value]) -> Result<Value, BayesError> {
        Ok(Value::Real(scalars(self.name(), parents)?.iter().product()))
    }

    fn box_clone(&self) -> Box<dyn DeterministicFunction> {
        Box::new(*self)
    }
}

impl DeterministicFunction for Exp {
    fn name(&self) -> &'static str {
        "exp"
    }

    fn compute(&self, parents: &[Value]) -> Result<Value, BayesError> {
        unary(self.name(), parents, f64::exp)
    }

    fn box_clone(&self) -> Box<dyn DeterministicFunction> {
        Box::new(*self)
    }
}

impl DeterministicFunction for Ln {
    fn name(&self) -> &'static str {
        "ln"
    }

    fn compute(&self, parents: &[Value]) -> Result<Value, BayesError> {
        unary(self.name(), parents, f64::ln)
    }

    fn box_clone(&self) -> Box<dyn DeterministicFunction> {
        Box::new(*self)
    }
}

impl DeterministicFunction for Negate {
    fn name(&self) -> &'static str {
        "negate"
    }

    fn compute(&self, parents: &[Value]) -> Result<Value, BayesError> {
        unary(self.name(), parents, |x| -x)
    }

    fn box_clone(&self) -> Box<dyn DeterministicFunction> {
        Box::new(*self)
    }
}

fn scalars(name: &str, parents: &[Value]) -> Result<Vec<f64>, BayesError> {
    if parents.is_empty() {
        return Err(arity_error(name, 1, 0));
    }
    parents
        .iter()
        .map(|value| {
            value.as_real().ok_or_else(|| {
                BayesError::Graph(
                    ErrorInfo::new("parameter-type", "function argument is not a real scalar")
                        .with_context("function", name)
                        .with_context("type", value.type_name()),
                )
            })
        })
        .collect()
}

fn unary(name: &str, parents: &[Value], op: impl Fn(f64) -> f64) -> Result<Value, BayesError> {
    match parents {
        [Value::RealVector(values)] => Ok(Value::RealVector(values.iter().map(|x| op(*x)).collect())),
        [single] => Ok(Value::Real(op(scalars(name, std::slice::from_ref(single))?[0]))),
        _ => Err(arity_error(name, 1, parents.len())),
    }
}

fn arity_error(name: &str, expected: usize, received: usize) -> BayesError {
    BayesError::Graph(
        ErrorInfo::new("arity-mismatch", "function received the wrong number of arguments")
            .with_context("function", name)
            .with_context("expected", expected)
            .with_context("received", received),
    )
}
