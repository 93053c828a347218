use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque value carried by a DAG node.
///
/// The engine never interprets values beyond what the attached distribution
/// or function asks for; the variants only cover what the builtin kernels and
/// the trace monitor need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean flag.
    Boolean(bool),
    /// Signed integer.
    Integer(i64),
    /// Real scalar.
    Real(f64),
    /// Vector of reals.
    RealVector(Vec<f64>),
}

impl Value {
    /// Returns the value as a real scalar when it has a scalar numeric reading.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(x) => Some(*x),
            Value::Integer(i) => Some(*i as f64),
            Value::Boolean(_) | Value::RealVector(_) => None,
        }
    }

    /// Returns the vector payload, if any.
    pub fn as_real_vec(&self) -> Option<&[f64]> {
        match self {
            Value::RealVector(values) => Some(values),
            _ => None,
        }
    }

    /// Short type label used in model summaries.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Real(_) => "Real",
            Value::RealVector(_) => "RealVector",
        }
    }

    /// Flattens the value into scalar columns for trace output.
    pub fn components(&self) -> Vec<f64> {
        match self {
            Value::Boolean(b) => vec![if *b { 1.0 } else { 0.0 }],
            Value::Integer(i) => vec![*i as f64],
            Value::Real(x) => vec![*x],
            Value::RealVector(values) => values.clone(),
        }
    }

    /// Compares two values bit for bit, so `NaN` equals itself and `0.0 != -0.0`.
    pub fn bit_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a.to_bits() == b.to_bits(),
            (Value::RealVector(a), Value::RealVector(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            _ => false,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Real(0.0)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(values: Vec<f64>) -> Self {
        Value::RealVector(values)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(x) => write!(f, "{x}"),
            Value::RealVector(values) => {
                write!(f, "[ ")?;
                for (idx, x) in values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{x}")?;
                }
                write!(f, " ]")
            }
        }
    }
}
