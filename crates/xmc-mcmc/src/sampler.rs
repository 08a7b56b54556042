use std::ops::Range;

use ndarray::{s, Array1, Array2};
use rand::Rng;
use xmc_core::errors::ErrorInfo;
use xmc_core::{EvaluationPool, RngHandle, XmcError};

/// Current ensemble positions with per-walker acceptance counters.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkerState {
    /// Positions, shape `[nwalkers, ndims]`.
    pub positions: Array2<f64>,
    /// Log-probability of each walker at its position.
    pub log_probs: Array1<f64>,
    /// Accepted proposals per walker since the last reset.
    pub accepted: Array1<u64>,
    /// Proposals made to each walker since the last reset.
    pub proposed: u64,
}

impl WalkerState {
    /// Wraps evaluated positions with zeroed counters.
    pub fn new(positions: Array2<f64>, log_probs: Array1<f64>) -> Self {
        let nwalkers = positions.nrows();
        Self {
            positions,
            log_probs,
            accepted: Array1::zeros(nwalkers),
            proposed: 0,
        }
    }

    /// Number of walkers.
    pub fn nwalkers(&self) -> usize {
        self.positions.nrows()
    }

    /// Number of parameters per walker.
    pub fn ndims(&self) -> usize {
        self.positions.ncols()
    }

    /// Fraction of accepted proposals across the ensemble, 0 before any step.
    pub fn mean_acceptance(&self) -> f64 {
        if self.proposed == 0 || self.nwalkers() == 0 {
            return 0.0;
        }
        let accepted: u64 = self.accepted.sum();
        accepted as f64 / (self.proposed as f64 * self.nwalkers() as f64)
    }

    /// Mean finite log-probability, or `-inf` if no walker has one.
    pub fn mean_log_prob(&self) -> f64 {
        let (sum, count) = self
            .log_probs
            .iter()
            .filter(|value| value.is_finite())
            .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
        if count == 0 {
            f64::NEG_INFINITY
        } else {
            sum / count as f64
        }
    }

    /// Clears the acceptance counters, used between burn-in and sampling.
    pub fn reset_acceptance(&mut self) {
        self.accepted.fill(0);
        self.proposed = 0;
    }
}

/// One ensemble update over every walker.
pub trait EnsembleSampler {
    /// Advances `state` by one iteration, evaluating proposals through `pool`.
    fn step(
        &mut self,
        state: &mut WalkerState,
        pool: &mut dyn EvaluationPool,
    ) -> Result<(), XmcError>;
}

/// Affine-invariant stretch move (Goodman & Weare) with red/blue halves.
///
/// The ensemble is split into two halves. Each walker of the active half is
/// stretched towards a random member of the other half by a factor `z` drawn
/// from `g(z) ∝ 1/sqrt(z)` on `[1/a, a]`; a whole half is evaluated as one
/// batch.
#[derive(Debug, Clone)]
pub struct StretchSampler {
    scale: f64,
    rng: RngHandle,
}

impl StretchSampler {
    /// Creates a sampler with scale `a` and a seeded proposal stream.
    pub fn new(scale: f64, seed: u64) -> Result<Self, XmcError> {
        if scale.is_nan() || scale <= 1.0 {
            return Err(XmcError::Config(
                ErrorInfo::new("config-stretch-scale", "stretch scale must exceed 1")
                    .with_context("stretch_scale", scale.to_string()),
            ));
        }
        Ok(Self {
            scale,
            rng: RngHandle::from_seed(seed),
        })
    }

    /// Scale parameter `a`.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    fn sample_z(&mut self) -> f64 {
        let u: f64 = self.rng.gen();
        ((self.scale - 1.0) * u + 1.0).powi(2) / self.scale
    }

    fn update_half(
        &mut self,
        state: &mut WalkerState,
        active: Range<usize>,
        complement: Range<usize>,
        pool: &mut dyn EvaluationPool,
    ) -> Result<(), XmcError> {
        let ndims = state.ndims();
        let mut proposals = Array2::zeros((active.len(), ndims));
        let mut factors = Vec::with_capacity(active.len());
        for (row, walker) in active.clone().enumerate() {
            let partner = self.rng.gen_range(complement.clone());
            let z = self.sample_z();
            let current = state.positions.row(walker);
            let other = state.positions.row(partner);
            let mut proposal = proposals.row_mut(row);
            for ((target, &x), &c) in proposal.iter_mut().zip(current.iter()).zip(other.iter()) {
                *target = c + z * (x - c);
            }
            factors.push(z);
        }

        let scores = pool.evaluate(proposals.view())?;
        if scores.len() != active.len() {
            return Err(XmcError::Sampler(
                ErrorInfo::new("pool-length", "pool returned the wrong number of scores")
                    .with_context("expected", active.len().to_string())
                    .with_context("found", scores.len().to_string()),
            ));
        }

        for (row, walker) in active.enumerate() {
            let new_lnp = scores[row];
            let u: f64 = self.rng.gen();
            if !new_lnp.is_finite() {
                continue;
            }
            let log_ratio =
                (ndims as f64 - 1.0) * factors[row].ln() + (new_lnp - state.log_probs[walker]);
            if u.ln() < log_ratio {
                state
                    .positions
                    .row_mut(walker)
                    .assign(&proposals.slice(s![row, ..]));
                state.log_probs[walker] = new_lnp;
                state.accepted[walker] += 1;
            }
        }
        Ok(())
    }
}

impl EnsembleSampler for StretchSampler {
    fn step(
        &mut self,
        state: &mut WalkerState,
        pool: &mut dyn EvaluationPool,
    ) -> Result<(), XmcError> {
        let nwalkers = state.nwalkers();
        if nwalkers < 2 || nwalkers % 2 != 0 {
            return Err(XmcError::Sampler(
                ErrorInfo::new("sampler-walkers", "stretch move needs an even number of walkers")
                    .with_context("nwalkers", nwalkers.to_string()),
            ));
        }
        let half = nwalkers / 2;
        self.update_half(state, 0..half, half..nwalkers, pool)?;
        self.update_half(state, half..nwalkers, 0..half, pool)?;
        state.proposed += 1;
        Ok(())
    }
}
