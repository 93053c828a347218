use bayes_core::errors::{BayesError, ErrorInfo};
use bayes_core::RngHandle;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::chain::Mcmc;
use crate::config::LadderConfig;
use crate::determinism;
use crate::monitor::TraceMonitor;

/// Log swap ratios below this are rejected without drawing.
const MIN_LN_SWAP_RATIO: f64 = -100.0;

/// Heat of chain `index` on an incremental ladder.
pub fn incremental_heat(delta: f64, index: usize) -> f64 {
    1.0 / (1.0 + delta * index as f64)
}

/// Log acceptance ratio of exchanging the heats of two chains.
pub fn swap_ln_ratio(heat_j: f64, ln_posterior_j: f64, heat_k: f64, ln_posterior_k: f64) -> f64 {
    heat_j * (ln_posterior_k - ln_posterior_j) + heat_k * (ln_posterior_j - ln_posterior_k)
}

/// Swap attempts and acceptances across the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapStats {
    /// Proposed heat exchanges.
    pub attempted: u64,
    /// Accepted heat exchanges.
    pub accepted: u64,
}

impl SwapStats {
    /// Accepted over attempted; `None` before the first attempt.
    pub fn acceptance_ratio(&self) -> Option<f64> {
        (self.attempted > 0).then(|| self.accepted as f64 / self.attempted as f64)
    }
}

/// Metropolis-coupled chains exchanging heats.
///
/// Chains keep their state and swap heats; the chain currently at heat one
/// is the cold chain and is the only one written to the trace.
#[derive(Debug, Clone)]
pub struct Mcmcmc {
    chains: Vec<Mcmc>,
    swap_interval: usize,
    swap_rng: RngHandle,
    stats: SwapStats,
    cold: usize,
}

impl Mcmcmc {
    /// Replicates `base` into `ladder.chains` chains with independent seeds.
    pub fn new(base: Mcmc, ladder: &LadderConfig, master_seed: u64) -> Result<Self, BayesError> {
        if ladder.chains == 0 {
            return Err(BayesError::Sampler(
                ErrorInfo::new("invalid-tempering", "at least one chain is required")
                    .with_context("chains", ladder.chains),
            ));
        }
        let mut chains = Vec::with_capacity(ladder.chains);
        for index in 0..ladder.chains {
            let mut chain = base.clone().reseeded(determinism::chain_seed(master_seed, index));
            chain.set_heat(incremental_heat(ladder.delta, index));
            chain.set_active_pid(index, ladder.chains)?;
            chains.push(chain);
        }
        info!(chains = chains.len(), delta = ladder.delta, "tempered chains created");
        Ok(Self {
            chains,
            swap_interval: ladder.swap_interval,
            swap_rng: RngHandle::from_seed(determinism::swap_seed(master_seed)),
            stats: SwapStats::default(),
            cold: 0,
        })
    }

    /// Chains in construction order.
    pub fn chains(&self) -> &[Mcmc] {
        &self.chains
    }

    /// Current heat of every chain, in construction order.
    pub fn heats(&self) -> Vec<f64> {
        self.chains.iter().map(Mcmc::heat).collect()
    }

    /// The chain currently running at heat one.
    pub fn cold_chain(&self) -> &Mcmc {
        &self.chains[self.cold]
    }

    /// Mutable access to the cold chain.
    pub fn cold_chain_mut(&mut self) -> &mut Mcmc {
        &mut self.chains[self.cold]
    }

    /// Index of the cold chain.
    pub fn cold_index(&self) -> usize {
        self.cold
    }

    /// Swap bookkeeping so far.
    pub fn swap_stats(&self) -> SwapStats {
        self.stats
    }

    /// Initializes every chain.
    pub fn initialize(&mut self) -> Result<(), BayesError> {
        for chain in &mut self.chains {
            chain.initialize()?;
        }
        Ok(())
    }

    /// Burn-in on every chain with swaps, then resets the move counters.
    pub fn burnin(&mut self, generations: usize, tuning_interval: usize) -> Result<(), BayesError> {
        for step in 1..=generations {
            for chain in &mut self.chains {
                chain.burnin_step(step, tuning_interval)?;
            }
            self.maybe_swap(step as u64)?;
        }
        for chain in &mut self.chains {
            chain.reset_counters();
        }
        info!(generations, "tempered burn-in finished");
        Ok(())
    }

    /// Samples every chain; the cold chain writes to `monitor`.
    pub fn run(
        &mut self,
        generations: usize,
        thinning: usize,
        mut monitor: Option<&mut TraceMonitor>,
    ) -> Result<(), BayesError> {
        self.initialize_pending()?;
        if let Some(monitor) = monitor.as_deref_mut() {
            if self.cold_chain().generation() == 0 {
                self.chains[self.cold].record(monitor)?;
            }
        }
        for _ in 0..generations {
            for chain in &mut self.chains {
                chain.advance()?;
            }
            let generation = self.chains[self.cold].generation();
            self.maybe_swap(generation)?;
            if thinning > 0 && generation % thinning as u64 == 0 {
                if let Some(monitor) = monitor.as_deref_mut() {
                    self.chains[self.cold].record(monitor)?;
                }
            }
        }
        if let Some(monitor) = monitor {
            monitor.flush()?;
        }
        info!(
            generations,
            swaps = self.stats.attempted,
            accepted = self.stats.accepted,
            "tempered sampling finished"
        );
        Ok(())
    }

    /// Proposes one heat exchange between a random pair of chains.
    ///
    /// Returns whether the exchange was accepted; a single chain never swaps.
    pub fn swap_chains(&mut self) -> Result<bool, BayesError> {
        let n = self.chains.len();
        if n < 2 {
            return Ok(false);
        }
        let j = self.swap_rng.index(n);
        let mut k = self.swap_rng.index(n - 1);
        if k >= j {
            k += 1;
        }
        let ln_posterior_j = self.chains[j].ln_posterior()?;
        let ln_posterior_k = self.chains[k].ln_posterior()?;
        let heat_j = self.chains[j].heat();
        let heat_k = self.chains[k].heat();
        let ln_ratio = swap_ln_ratio(heat_j, ln_posterior_j, heat_k, ln_posterior_k);

        let accepted = if ln_ratio.is_nan() {
            false
        } else if ln_ratio >= 0.0 {
            true
        } else if ln_ratio < MIN_LN_SWAP_RATIO {
            false
        } else {
            self.swap_rng.uniform01() < ln_ratio.exp()
        };
        self.stats.attempted += 1;
        if accepted {
            self.stats.accepted += 1;
            self.chains[j].set_heat(heat_k);
            self.chains[k].set_heat(heat_j);
            if self.cold == j {
                self.cold = k;
            } else if self.cold == k {
                self.cold = j;
            }
        }
        debug!(j, k, ln_ratio, accepted, cold = self.cold, "heat swap");
        Ok(accepted)
    }

    /// Move summaries of every chain, cold chain first.
    pub fn move_summary(&self) -> String {
        let mut out = String::new();
        let order = std::iter::once(self.cold).chain((0..self.chains.len()).filter(|i| *i != self.cold));
        for index in order {
            let chain = &self.chains[index];
            out.push_str(&format!("Chain {} (heat {:.4})\n", index, chain.heat()));
            out.push_str(&chain.move_summary());
        }
        out
    }

    fn maybe_swap(&mut self, generation: u64) -> Result<(), BayesError> {
        if self.swap_interval > 0 && generation % self.swap_interval as u64 == 0 {
            self.swap_chains()?;
        }
        Ok(())
    }

    fn initialize_pending(&mut self) -> Result<(), BayesError> {
        for chain in &mut self.chains {
            chain.initialize_if_needed()?;
        }
        Ok(())
    }
}
