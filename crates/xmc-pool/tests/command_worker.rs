use std::fs;
use std::time::{Duration, Instant};

use ndarray::array;
use tempfile::tempdir;
use xmc_core::{EvaluationPool, XmcError};
use xmc_pool::{connect, CommandWorker, PoolOptions, ProjectSpec, Worker, WorkerOptions};

const PROJECT: &str = r#"
command: "while read a b; do echo \"$a\"; done"
parameters:
  - { index: 1, name: alpha, unit: "", val_init: 0.0, val_delta: 0.1, val_hardmin: -10.0, val_hardmax: 10.0 }
  - { index: 3, name: norm, unit: "", val_init: 1.0, val_delta: 0.1, val_hardmin: 0.0, val_hardmax: 1.0e6 }
"#;

#[test]
fn line_protocol_round_trip() {
    let options = WorkerOptions {
        command: "while read a rest; do echo \"-$a\"; done".into(),
        working_dir: None,
        debug: false,
    };
    let mut worker = CommandWorker::spawn("localhost", &options).unwrap();
    assert_eq!(worker.target(), "localhost");
    let first = worker.evaluate_chunk(array![[1.5, 2.0], [3.0, 4.0]].view()).unwrap();
    assert_eq!(first, vec![-1.5, -3.0]);
    let second = worker.evaluate_chunk(array![[0.25, 0.0]].view()).unwrap();
    assert_eq!(second, vec![-0.25]);
}

#[test]
fn exited_worker_reports_pool_error() {
    let options = WorkerOptions {
        command: "exit 0".into(),
        working_dir: None,
        debug: false,
    };
    let mut worker = CommandWorker::spawn("localhost", &options).unwrap();
    let err = worker.evaluate_chunk(array![[1.0]].view()).unwrap_err();
    assert!(matches!(err, XmcError::Pool(_)));
}

#[test]
fn non_numeric_output_is_rejected() {
    let options = WorkerOptions {
        command: "while read line; do echo oops; done".into(),
        working_dir: None,
        debug: false,
    };
    let mut worker = CommandWorker::spawn("localhost", &options).unwrap();
    let err = worker.evaluate_chunk(array![[1.0]].view()).unwrap_err();
    assert_eq!(err.info().code, "worker-response");
}

#[test]
fn dropped_worker_exits_on_eof() {
    let dir = tempdir().unwrap();
    let options = WorkerOptions {
        command: "while read a b; do echo 1; done; touch done.marker".into(),
        working_dir: Some(dir.path().to_path_buf()),
        debug: false,
    };
    let mut worker = CommandWorker::spawn("localhost", &options).unwrap();
    assert_eq!(worker.evaluate_chunk(array![[1.0, 2.0]].view()).unwrap(), vec![1.0]);
    drop(worker);
    assert!(dir.path().join("done.marker").exists());
}

#[test]
fn worker_ignoring_eof_is_killed_after_grace_period() {
    let options = WorkerOptions {
        command: "while read a b; do echo 1; done; sleep 30".into(),
        working_dir: None,
        debug: false,
    };
    let mut worker = CommandWorker::spawn("localhost", &options).unwrap();
    worker.evaluate_chunk(array![[1.0, 2.0]].view()).unwrap();
    let started = Instant::now();
    drop(worker);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[cfg(target_os = "linux")]
#[test]
fn worker_leads_its_own_process_group() {
    let options = WorkerOptions {
        command: r#"read a; if [ "$(cut -d' ' -f5 /proc/$$/stat)" = "$$" ]; then echo 1; else echo 0; fi"#
            .into(),
        working_dir: None,
        debug: false,
    };
    let mut worker = CommandWorker::spawn("localhost", &options).unwrap();
    assert_eq!(worker.evaluate_chunk(array![[0.0]].view()).unwrap(), vec![1.0]);
}

#[test]
fn connect_builds_pool_from_project_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fit.yaml");
    fs::write(&path, PROJECT).unwrap();
    let project = ProjectSpec::load(&path).unwrap();

    let options = PoolOptions {
        systems: vec!["localhost*2".into()],
        chunk_size: 1,
        log_norm: true,
        debug: false,
        working_dir: Some(dir.path().to_path_buf()),
    };
    let mut pool = connect(&project, &options).unwrap();
    assert_eq!(pool.worker_count(), 2);
    assert!(pool.parameter_model().parameters()[1].log);

    let result = pool.evaluate(array![[0.5, 0.0], [-1.0, 1.0], [20.0, 0.0]].view()).unwrap();
    assert_eq!(result[0], 0.5);
    assert_eq!(result[1], -1.0);
    assert_eq!(result[2], f64::NEG_INFINITY);
}
