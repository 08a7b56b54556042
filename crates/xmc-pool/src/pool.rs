use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use xmc_core::errors::ErrorInfo;
use xmc_core::{EvaluationPool, ParameterModel, XmcError};

use crate::worker::Worker;

/// Evaluation pool spreading chunks of a batch over a set of workers.
///
/// Rows outside a parameter's hard range are scored `-inf` without being
/// dispatched. Log-space parameters are converted back to physical values
/// before they reach a worker.
#[derive(Debug)]
pub struct ChunkedPool<W> {
    model: ParameterModel,
    workers: Vec<W>,
    chunk_size: usize,
}

impl<W: Worker + Send> ChunkedPool<W> {
    /// Builds a pool over already started workers.
    pub fn new(model: ParameterModel, workers: Vec<W>, chunk_size: usize) -> Result<Self, XmcError> {
        if workers.is_empty() {
            return Err(XmcError::Config(
                ErrorInfo::new("pool-empty", "no evaluation targets configured")
                    .with_hint("pass at least one system, e.g. --systems localhost"),
            ));
        }
        if chunk_size == 0 {
            return Err(XmcError::Config(ErrorInfo::new(
                "pool-chunk-size",
                "chunk size must be at least 1",
            )));
        }
        Ok(Self {
            model,
            workers,
            chunk_size,
        })
    }

    /// Number of workers backing the pool.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    fn in_bounds(&self, row: ArrayView1<'_, f64>) -> bool {
        row.iter()
            .zip(self.model.iter())
            .all(|(value, param)| *value >= param.val_hardmin && *value <= param.val_hardmax)
    }

    fn to_physical(&self, batch: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut physical = batch.to_owned();
        for (column, param) in self.model.iter().enumerate() {
            if param.log {
                physical
                    .column_mut(column)
                    .mapv_inplace(|value| 10f64.powf(value));
            }
        }
        physical
    }

    fn dispatch(&mut self, batch: ArrayView2<'_, f64>) -> Result<Vec<f64>, XmcError> {
        let rows = batch.nrows();
        let chunks: Vec<Range<usize>> = (0..rows)
            .step_by(self.chunk_size)
            .map(|start| start..(start + self.chunk_size).min(rows))
            .collect();
        let next = AtomicUsize::new(0);
        let failed = AtomicBool::new(false);

        let per_worker: Vec<Result<Vec<(usize, Vec<f64>)>, XmcError>> = thread::scope(|scope| {
            let handles: Vec<_> = self
                .workers
                .iter_mut()
                .map(|worker| {
                    let next = &next;
                    let failed = &failed;
                    let chunks = &chunks;
                    scope.spawn(move || {
                        let mut done = Vec::new();
                        while !failed.load(Ordering::SeqCst) {
                            let index = next.fetch_add(1, Ordering::SeqCst);
                            let Some(range) = chunks.get(index) else {
                                break;
                            };
                            let result = worker.evaluate_chunk(batch.slice(s![range.clone(), ..]));
                            match result {
                                Ok(values) if values.len() == range.len() => {
                                    done.push((index, values));
                                }
                                Ok(values) => {
                                    failed.store(true, Ordering::SeqCst);
                                    return Err(XmcError::Pool(
                                        ErrorInfo::new(
                                            "worker-short-chunk",
                                            "worker returned the wrong number of values",
                                        )
                                        .with_context("target", worker.target().to_string())
                                        .with_context("expected", range.len().to_string())
                                        .with_context("received", values.len().to_string()),
                                    ));
                                }
                                Err(err) => {
                                    failed.store(true, Ordering::SeqCst);
                                    return Err(err);
                                }
                            }
                        }
                        Ok(done)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(XmcError::Pool(ErrorInfo::new(
                            "worker-panic",
                            "worker thread panicked",
                        )))
                    })
                })
                .collect()
        });

        let mut values = vec![f64::NAN; rows];
        for result in per_worker {
            for (index, chunk_values) in result? {
                let range = chunks[index].clone();
                values[range].copy_from_slice(&chunk_values);
            }
        }
        Ok(values)
    }
}

impl<W: Worker + Send> EvaluationPool for ChunkedPool<W> {
    fn parameter_model(&self) -> &ParameterModel {
        &self.model
    }

    fn evaluate(&mut self, batch: ArrayView2<'_, f64>) -> Result<Array1<f64>, XmcError> {
        if batch.ncols() != self.model.ndims() {
            return Err(XmcError::Pool(
                ErrorInfo::new("pool-shape", "batch width does not match the parameter model")
                    .with_context("columns", batch.ncols().to_string())
                    .with_context("parameters", self.model.ndims().to_string()),
            ));
        }
        let mut result = Array1::from_elem(batch.nrows(), f64::NEG_INFINITY);
        let inside: Vec<usize> = batch
            .rows()
            .into_iter()
            .enumerate()
            .filter(|(_, row)| self.in_bounds(*row))
            .map(|(index, _)| index)
            .collect();
        if inside.is_empty() {
            return Ok(result);
        }

        let dispatched = inside.len();
        let selected = batch.select(Axis(0), &inside);
        let physical = self.to_physical(selected.view());
        let values = self.dispatch(physical.view())?;
        for (row, value) in inside.into_iter().zip(values) {
            result[row] = value;
        }
        tracing::trace!(rows = batch.nrows(), dispatched, "evaluated batch");
        Ok(result)
    }
}
