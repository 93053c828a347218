use bayes_core::errors::{BayesError, ErrorInfo};
use bayes_core::RngHandle;
use serde::{Deserialize, Serialize};

use crate::moves::Move;

/// How moves are picked within one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScheduleKind {
    /// `round(sum of weights)` draws, each proportional to weight.
    #[default]
    Random,
    /// Every move `round(weight)` times, in registration order.
    Sequential,
}

/// Move schedule fixed at sampler construction.
#[derive(Debug, Clone)]
pub struct MoveSchedule {
    kind: ScheduleKind,
    weights: Vec<f64>,
    total: f64,
}

impl MoveSchedule {
    /// Captures the weights of `moves`.
    pub fn new(kind: ScheduleKind, moves: &[Move]) -> Result<Self, BayesError> {
        let weights: Vec<f64> = moves.iter().map(Move::update_weight).collect();
        let total: f64 = weights.iter().sum();
        if weights.is_empty() || total <= 0.0 {
            return Err(BayesError::Sampler(
                ErrorInfo::new("empty-schedule", "schedule needs at least one move with positive weight")
                    .with_context("moves", weights.len()),
            ));
        }
        let schedule = Self {
            kind,
            weights,
            total,
        };
        if schedule.moves_per_generation() == 0 {
            return Err(BayesError::Sampler(
                ErrorInfo::new("empty-schedule", "every move weight rounds to zero applications")
                    .with_context("kind", format!("{kind:?}"))
                    .with_context("total_weight", total),
            ));
        }
        Ok(schedule)
    }

    /// Selection strategy.
    pub fn kind(&self) -> ScheduleKind {
        self.kind
    }

    /// Number of move applications per generation.
    pub fn moves_per_generation(&self) -> usize {
        match self.kind {
            ScheduleKind::Random => (self.total.round() as usize).max(1),
            ScheduleKind::Sequential => self.weights.iter().map(|w| w.round() as usize).sum(),
        }
    }

    /// Indices of the moves to apply in the next generation.
    pub fn plan(&self, rng: &mut RngHandle) -> Vec<usize> {
        match self.kind {
            ScheduleKind::Random => (0..self.moves_per_generation())
                .map(|_| self.pick(rng))
                .collect(),
            ScheduleKind::Sequential => self
                .weights
                .iter()
                .enumerate()
                .flat_map(|(idx, w)| std::iter::repeat(idx).take(w.round() as usize))
                .collect(),
        }
    }

    fn pick(&self, rng: &mut RngHandle) -> usize {
        let mut u = rng.uniform01() * self.total;
        for (idx, weight) in self.weights.iter().enumerate() {
            if u < *weight {
                return idx;
            }
            u -= weight;
        }
        // rounding can leave u just above the last bucket
        self.weights
            .iter()
            .rposition(|w| *w > 0.0)
            .unwrap_or(self.weights.len() - 1)
    }
}
