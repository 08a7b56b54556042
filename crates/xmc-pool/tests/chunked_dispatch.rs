use std::sync::{Arc, Mutex};

use ndarray::{array, Array2, ArrayView2};
use xmc_core::errors::ErrorInfo;
use xmc_core::{EvaluationPool, ParameterDescriptor, ParameterModel, XmcError};
use xmc_pool::{ChunkedPool, Worker};

#[derive(Clone, Debug)]
struct RecordingWorker {
    name: String,
    seen: Arc<Mutex<Vec<Vec<f64>>>>,
    fail: bool,
}

impl Worker for RecordingWorker {
    fn target(&self) -> &str {
        &self.name
    }

    fn evaluate_chunk(&mut self, chunk: ArrayView2<'_, f64>) -> Result<Vec<f64>, XmcError> {
        if self.fail {
            return Err(XmcError::Pool(ErrorInfo::new("worker-exited", "boom")));
        }
        let mut seen = self.seen.lock().unwrap();
        Ok(chunk
            .rows()
            .into_iter()
            .map(|row| {
                seen.push(row.to_vec());
                -row.sum()
            })
            .collect())
    }
}

fn param(name: &str, log: bool) -> ParameterDescriptor {
    ParameterDescriptor {
        index: 1,
        name: name.into(),
        unit: String::new(),
        val_init: 0.0,
        val_delta: 0.1,
        val_sigma: 0.0,
        val_hardmin: -100.0,
        val_hardmax: 100.0,
        log,
    }
}

fn workers(count: usize, seen: &Arc<Mutex<Vec<Vec<f64>>>>) -> Vec<RecordingWorker> {
    (0..count)
        .map(|idx| RecordingWorker {
            name: format!("w{idx}"),
            seen: Arc::clone(seen),
            fail: false,
        })
        .collect()
}

#[test]
fn results_come_back_in_row_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let model = ParameterModel::new(vec![param("a", false), param("b", false)]);
    let mut pool = ChunkedPool::new(model, workers(3, &seen), 4).unwrap();
    let batch = Array2::from_shape_fn((10, 2), |(row, col)| (row * 10 + col) as f64);

    let result = pool.evaluate(batch.view()).unwrap();

    assert_eq!(result.len(), 10);
    for (row, value) in result.iter().enumerate() {
        let expected = -((row * 10) as f64 + (row * 10 + 1) as f64);
        assert_eq!(*value, expected);
    }
    assert_eq!(seen.lock().unwrap().len(), 10);
}

#[test]
fn out_of_bounds_rows_are_not_dispatched() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let model = ParameterModel::new(vec![param("a", false)]);
    let mut pool = ChunkedPool::new(model, workers(2, &seen), 1).unwrap();
    let batch = array![[1.0], [500.0], [f64::NAN], [-2.0]];

    let result = pool.evaluate(batch.view()).unwrap();

    assert_eq!(result[0], -1.0);
    assert_eq!(result[1], f64::NEG_INFINITY);
    assert_eq!(result[2], f64::NEG_INFINITY);
    assert_eq!(result[3], 2.0);
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[test]
fn log_parameters_reach_workers_as_physical_values() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let model = ParameterModel::new(vec![param("norm", true), param("kT", false)]);
    let mut pool = ChunkedPool::new(model, workers(1, &seen), 8).unwrap();
    let batch = array![[2.0, 3.0], [-1.0, 0.5]];

    pool.evaluate(batch.view()).unwrap();

    let seen = seen.lock().unwrap();
    assert!((seen[0][0] - 100.0).abs() < 1e-9);
    assert_eq!(seen[0][1], 3.0);
    assert!((seen[1][0] - 0.1).abs() < 1e-12);
}

#[test]
fn worker_failures_propagate() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut all = workers(1, &seen);
    all[0].fail = true;
    let model = ParameterModel::new(vec![param("a", false)]);
    let mut pool = ChunkedPool::new(model, all, 1).unwrap();
    let batch = Array2::zeros((6, 1));

    let err = pool.evaluate(batch.view()).unwrap_err();
    assert_eq!(err.info().code, "worker-exited");
}

#[test]
fn empty_worker_list_is_a_config_error() {
    let model = ParameterModel::new(vec![param("a", false)]);
    let err = ChunkedPool::<RecordingWorker>::new(model, Vec::new(), 4).unwrap_err();
    assert!(err.is_config());
}

#[test]
fn width_mismatch_is_rejected() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let model = ParameterModel::new(vec![param("a", false)]);
    let mut pool = ChunkedPool::new(model, workers(1, &seen), 4).unwrap();
    let err = pool.evaluate(Array2::zeros((2, 3)).view()).unwrap_err();
    assert_eq!(err.info().code, "pool-shape");
}
