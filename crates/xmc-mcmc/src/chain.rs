use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3};
use xmc_core::errors::ErrorInfo;
use xmc_core::XmcError;

use crate::checkpoint::CheckpointRecord;

/// Pre-allocated chain and log-probability buffers with a fill cursor.
///
/// `chain` is indexed `[walker, iteration, parameter]` and `lnprob`
/// `[walker, iteration]`. Both are only ever written together through
/// [`ChainBuffer::record`], so every filled iteration has positions and
/// log-probabilities from the same step. Entries past the cursor are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainBuffer {
    chain: Array3<f64>,
    lnprob: Array2<f64>,
    filled: usize,
}

impl ChainBuffer {
    /// Allocates an empty buffer with room for `capacity` iterations.
    pub fn new(nwalkers: usize, capacity: usize, ndims: usize) -> Self {
        Self {
            chain: Array3::zeros((nwalkers, capacity, ndims)),
            lnprob: Array2::zeros((nwalkers, capacity)),
            filled: 0,
        }
    }

    /// Rebuilds a buffer from a checkpoint, extended to `capacity` iterations.
    pub fn from_checkpoint(record: &CheckpointRecord, capacity: usize) -> Result<Self, XmcError> {
        let filled = record.filled();
        if capacity <= filled {
            return Err(XmcError::Config(
                ErrorInfo::new(
                    "resume-niters",
                    "requested iterations do not extend the existing chain",
                )
                .with_context("niters", capacity.to_string())
                .with_context("filled", filled.to_string())
                .with_hint("pass --niters larger than the number of saved iterations"),
            ));
        }
        let mut buffer = Self::new(record.nwalkers(), capacity, record.ndims());
        buffer
            .chain
            .slice_mut(s![.., ..filled, ..])
            .assign(&record.chain);
        buffer
            .lnprob
            .slice_mut(s![.., ..filled])
            .assign(&record.lnprobability);
        buffer.filled = filled;
        Ok(buffer)
    }

    /// Writes one iteration for every walker and advances the cursor.
    pub fn record(
        &mut self,
        positions: ArrayView2<'_, f64>,
        log_probs: ArrayView1<'_, f64>,
    ) -> Result<usize, XmcError> {
        if self.is_full() {
            return Err(XmcError::Sampler(
                ErrorInfo::new("chain-full", "chain buffer has no free iterations")
                    .with_context("capacity", self.capacity().to_string()),
            ));
        }
        if positions.dim() != (self.nwalkers(), self.ndims()) || log_probs.len() != self.nwalkers()
        {
            return Err(XmcError::Sampler(
                ErrorInfo::new("chain-shape", "step shape does not match the chain buffer")
                    .with_context("walkers", self.nwalkers().to_string())
                    .with_context("parameters", self.ndims().to_string()),
            ));
        }
        let index = self.filled;
        self.chain.slice_mut(s![.., index, ..]).assign(&positions);
        self.lnprob.slice_mut(s![.., index]).assign(&log_probs);
        self.filled += 1;
        Ok(index)
    }

    /// Number of iterations written so far.
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Number of iterations the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.lnprob.ncols()
    }

    /// Whether every pre-allocated iteration has been written.
    pub fn is_full(&self) -> bool {
        self.filled >= self.capacity()
    }

    /// Number of walkers.
    pub fn nwalkers(&self) -> usize {
        self.lnprob.nrows()
    }

    /// Number of parameters per walker.
    pub fn ndims(&self) -> usize {
        self.chain.dim().2
    }

    /// Full chain, including unfilled iterations.
    pub fn chain(&self) -> ArrayView3<'_, f64> {
        self.chain.view()
    }

    /// Full log-probability buffer, including unfilled iterations.
    pub fn lnprob(&self) -> ArrayView2<'_, f64> {
        self.lnprob.view()
    }

    /// Chain restricted to the filled iterations.
    pub fn filled_chain(&self) -> ArrayView3<'_, f64> {
        self.chain.slice(s![.., ..self.filled, ..])
    }

    /// Log-probabilities restricted to the filled iterations.
    pub fn filled_lnprob(&self) -> ArrayView2<'_, f64> {
        self.lnprob.slice(s![.., ..self.filled])
    }

    /// Walker positions of the last filled iteration.
    pub fn last_positions(&self) -> Option<Array2<f64>> {
        let last = self.filled.checked_sub(1)?;
        Some(self.chain.slice(s![.., last, ..]).to_owned())
    }

    /// Log-probabilities of the last filled iteration.
    pub fn last_log_probs(&self) -> Option<Array1<f64>> {
        let last = self.filled.checked_sub(1)?;
        Some(self.lnprob.slice(s![.., last]).to_owned())
    }
}
