#![allow(dead_code)]

use std::path::Path;

use ndarray::{Array1, ArrayView1, ArrayView2};
use xmc_core::errors::ErrorInfo;
use xmc_core::{EvaluationPool, ParameterDescriptor, ParameterModel, XmcError};
use xmc_mcmc::RunConfig;

pub fn parameter(index: u32, name: &str, log: bool) -> ParameterDescriptor {
    ParameterDescriptor {
        index,
        name: name.to_string(),
        unit: String::new(),
        val_init: 0.5,
        val_delta: 0.1,
        val_sigma: 0.0,
        val_hardmin: -5.0,
        val_hardmax: 5.0,
        log,
    }
}

pub fn model(ndims: usize) -> ParameterModel {
    ParameterModel::new(
        (0..ndims)
            .map(|idx| parameter(idx as u32 + 1, &format!("p{}", idx + 1), false))
            .collect(),
    )
}

pub fn quadratic(row: ArrayView1<'_, f64>) -> f64 {
    -0.5 * row.dot(&row)
}

/// Scores each row as a standard normal log-density and counts calls.
pub struct QuadraticPool {
    pub model: ParameterModel,
    pub calls: usize,
    pub batches: Vec<ndarray::Array2<f64>>,
    pub fail_after: Option<usize>,
}

impl QuadraticPool {
    pub fn new(model: ParameterModel) -> Self {
        Self {
            model,
            calls: 0,
            batches: Vec::new(),
            fail_after: None,
        }
    }
}

impl EvaluationPool for QuadraticPool {
    fn parameter_model(&self) -> &ParameterModel {
        &self.model
    }

    fn evaluate(&mut self, batch: ArrayView2<'_, f64>) -> Result<Array1<f64>, XmcError> {
        if self.fail_after.is_some_and(|limit| self.calls >= limit) {
            return Err(XmcError::Pool(ErrorInfo::new(
                "worker-exited",
                "worker went away",
            )));
        }
        self.calls += 1;
        if self.batches.is_empty() {
            self.batches.push(batch.to_owned());
        }
        Ok(batch.rows().into_iter().map(quadratic).collect())
    }
}

/// Returns the same log-probability for every row.
pub struct ConstantPool {
    pub model: ParameterModel,
    pub value: f64,
}

impl EvaluationPool for ConstantPool {
    fn parameter_model(&self) -> &ParameterModel {
        &self.model
    }

    fn evaluate(&mut self, batch: ArrayView2<'_, f64>) -> Result<Array1<f64>, XmcError> {
        Ok(Array1::from_elem(batch.nrows(), self.value))
    }
}

pub fn config(dir: &Path, nwalkers: usize, niters: usize) -> RunConfig {
    let mut config = RunConfig::default();
    config.nwalkers = nwalkers;
    config.niters = niters;
    config.nburn = 0;
    config.output_checkpoint = dir.join("run.ckpt");
    config.output_chain = dir.join("run.chain");
    config.checkpoint.autosave = false;
    config
}
