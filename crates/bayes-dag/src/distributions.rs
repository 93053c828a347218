//! Probability distributions attachable to stochastic nodes.

use std::f64::consts::PI;
use std::fmt;

use bayes_core::errors::{BayesError, ErrorInfo};
use bayes_core::{RngHandle, Value};

/// Capability interface of the density attached to a stochastic node.
///
/// `parents` holds the current values of the node's parents in declaration
/// order. Values outside the support yield `f64::NEG_INFINITY`; malformed
/// parameters (wrong arity or type) are reported as errors.
pub trait Distribution: fmt::Debug + Send + Sync {
    /// Registry name, also printed in model summaries.
    fn name(&self) -> &'static str;

    /// Log density of `value` given the parent values.
    fn ln_density(&self, value: &Value, parents: &[Value]) -> Result<f64, BayesError>;

    /// Draws a fresh value given the parent values.
    fn sample(&self, parents: &[Value], rng: &mut RngHandle) -> Result<Value, BayesError>;

    /// Returns a boxed copy; used when a DAG is cloned.
    fn box_clone(&self) -> Box<dyn Distribution>;
}

impl Clone for Box<dyn Distribution> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Normal distribution parameterised by `(mean, sd)`; vector values are iid.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normal;

/// Exponential distribution parameterised by `(rate)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exponential;

/// Continuous uniform distribution parameterised by `(lower, upper)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uniform;

/// Log-normal distribution parameterised by `(meanlog, sdlog)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNormal;

/// Looks up a builtin distribution by its registry name.
pub fn distribution_by_name(name: &str) -> Result<Box<dyn Distribution>, BayesError> {
    match name {
        "normal" => Ok(Box::new(Normal)),
        "exponential" => Ok(Box::new(Exponential)),
        "uniform" => Ok(Box::new(Uniform)),
        "lognormal" => Ok(Box::new(LogNormal)),
        other => Err(BayesError::Graph(
            ErrorInfo::new("unknown-distribution", "no distribution registered under this name")
                .with_context("name", other)
                .with_hint("expected one of normal, exponential, uniform, lognormal"),
        )),
    }
}

impl Distribution for Normal {
    fn name(&self) -> &'static str {
        "normal"
    }

    fn ln_density(&self, value: &Value, parents: &[Value]) -> Result<f64, BayesError> {
        let [mean, sd] = params::<2>(self.name(), parents)?;
        if sd <= 0.0 {
            return Ok(f64::NEG_INFINITY);
        }
        each_component(value, self.name(), |x| {
            let z = (x - mean) / sd;
            -0.5 * (2.0 * PI).ln() - sd.ln() - 0.5 * z * z
        })
    }

    fn sample(&self, parents: &[Value], rng: &mut RngHandle) -> Result<Value, BayesError> {
        let [mean, sd] = params::<2>(self.name(), parents)?;
        Ok(Value::Real(mean + sd * standard_normal(rng)))
    }

    fn box_clone(&self) -> Box<dyn Distribution> {
        Box::new(*self)
    }
}

impl Distribution for Exponential {
    fn name(&self) -> &'static str {
        "exponential"
    }

    fn ln_density(&self, value: &Value, parents: &[Value]) -> Result<f64, BayesError> {
        let [rate] = params::<1>(self.name(), parents)?;
        if rate <= 0.0 {
            return Ok(f64::NEG_INFINITY);
        }
        each_component(value, self.name(), |x| {
            if x < 0.0 {
                f64::NEG_INFINITY
            } else {
                rate.ln() - rate * x
            }
        })
    }

    fn sample(&self, parents: &[Value], rng: &mut RngHandle) -> Result<Value, BayesError> {
        let [rate] = params::<1>(self.name(), parents)?;
        Ok(Value::Real(-(1.0 - rng.uniform01()).ln() / rate))
    }

    fn box_clone(&self) -> Box<dyn Distribution> {
        Box::new(*self)
    }
}

impl Distribution for Uniform {
    fn name(&self) -> &'static str {
        "uniform"
    }

    fn ln_density(&self, value: &Value, parents: &[Value]) -> Result<f64, BayesError> {
        let [lower, upper] = params::<2>(self.name(), parents)?;
        if upper <= lower {
            return Ok(f64::NEG_INFINITY);
        }
        each_component(value, self.name(), |x| {
            if x < lower || x > upper {
                f64::NEG_INFINITY
            } else {
                -(upper - lower).ln()
            }
        })
    }

    fn sample(&self, parents: &[Value], rng: &mut RngHandle) -> Result<Value, BayesError> {
        let [lower, upper] = params::<2>(self.name(), parents)?;
        Ok(Value::Real(lower + rng.uniform01() * (upper - lower)))
    }

    fn box_clone(&self) -> Box<dyn Distribution> {
        Box::new(*self)
    }
}

impl Distribution for LogNormal {
    fn name(&self) -> &'static str {
        "lognormal"
    }

    fn ln_density(&self, value: &Value, parents: &[Value]) -> Result<f64, BayesError> {
        let [meanlog, sdlog] = params::<2>(self.name(), parents)?;
        if sdlog <= 0.0 {
            return Ok(f64::NEG_INFINITY);
        }
        each_component(value, self.name(), |x| {
            if x <= 0.0 {
                return f64::NEG_INFINITY;
            }
            let z = (x.ln() - meanlog) / sdlog;
            -x.ln() - sdlog.ln() - 0.5 * (2.0 * PI).ln() - 0.5 * z * z
        })
    }

    fn sample(&self, parents: &[Value], rng: &mut RngHandle) -> Result<Value, BayesError> {
        let [meanlog, sdlog] = params::<2>(self.name(), parents)?;
        Ok(Value::Real((meanlog + sdlog * standard_normal(rng)).exp()))
    }

    fn box_clone(&self) -> Box<dyn Distribution> {
        Box::new(*self)
    }
}

/// Box-Muller draw from N(0, 1).
fn standard_normal(rng: &mut RngHandle) -> f64 {
    let u1 = 1.0 - rng.uniform01();
    let u2 = rng.uniform01();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

fn params<const N: usize>(name: &str, parents: &[Value]) -> Result<[f64; N], BayesError> {
    if parents.len() != N {
        return Err(BayesError::Graph(
            ErrorInfo::new("arity-mismatch", "distribution received the wrong number of parameters")
                .with_context("distribution", name)
                .with_context("expected", N)
                .with_context("received", parents.len()),
        ));
    }
    let mut out = [0.0; N];
    for (slot, value) in out.iter_mut().zip(parents) {
        *slot = value.as_real().ok_or_else(|| {
            BayesError::Graph(
                ErrorInfo::new("parameter-type", "distribution parameter is not a real scalar")
                    .with_context("distribution", name)
                    .with_context("type", value.type_name()),
            )
        })?;
    }
    Ok(out)
}

fn each_component(
    value: &Value,
    name: &str,
    density: impl Fn(f64) -> f64,
) -> Result<f64, BayesError> {
    match value {
        Value::Real(_) | Value::Integer(_) | Value::RealVector(_) => {
            Ok(value.components().into_iter().map(density).sum())
        }
        Value::Boolean(_) => Err(BayesError::Graph(
            ErrorInfo::new("value-type", "distribution cannot score a boolean value")
                .with_context("distribution", name),
        )),
    }
}
