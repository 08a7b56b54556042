mod common;

use std::fs;

use tempfile::tempdir;
use xmc_mcmc::{run, CancelToken};

use common::{config, model, QuadraticPool};

#[test]
fn resume_without_checkpoint_is_a_config_error() {
    let dir = tempdir().unwrap();
    let mut config = config(dir.path(), 4, 10);
    config.continue_run = true;
    let mut pool = QuadraticPool::new(model(2));

    let err = run(&config, &mut pool, &CancelToken::new(), &mut |_| {}).unwrap_err();
    assert!(err.is_config());
    assert_eq!(err.info().code, "resume-without-checkpoint");
    assert_eq!(pool.calls, 0);
    assert!(!config.output_checkpoint.exists());
    assert!(!config.output_chain.exists());
}

#[test]
fn resume_must_extend_the_chain() {
    let dir = tempdir().unwrap();
    let mut config = config(dir.path(), 4, 5);
    run(
        &config,
        &mut QuadraticPool::new(model(2)),
        &CancelToken::new(),
        &mut |_| {},
    )
    .unwrap();
    let before = fs::read(&config.output_checkpoint).unwrap();

    config.continue_run = true;
    for niters in [3, 5] {
        config.niters = niters;
        let mut pool = QuadraticPool::new(model(2));
        let err = run(&config, &mut pool, &CancelToken::new(), &mut |_| {}).unwrap_err();
        assert_eq!(err.info().code, "resume-niters");
        assert_eq!(pool.calls, 0);
    }
    assert_eq!(fs::read(&config.output_checkpoint).unwrap(), before);
}

#[test]
fn resume_rejects_mismatched_walkers_or_parameters() {
    let dir = tempdir().unwrap();
    let mut config = config(dir.path(), 4, 3);
    run(
        &config,
        &mut QuadraticPool::new(model(2)),
        &CancelToken::new(),
        &mut |_| {},
    )
    .unwrap();
    config.continue_run = true;
    config.niters = 6;

    config.nwalkers = 6;
    let err = run(
        &config,
        &mut QuadraticPool::new(model(2)),
        &CancelToken::new(),
        &mut |_| {},
    )
    .unwrap_err();
    assert_eq!(err.info().code, "resume-shape");

    config.nwalkers = 4;
    let err = run(
        &config,
        &mut QuadraticPool::new(model(3)),
        &CancelToken::new(),
        &mut |_| {},
    )
    .unwrap_err();
    assert_eq!(err.info().code, "resume-shape");
}

#[test]
fn initial_parameters_must_match_the_ensemble() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("start.txt");
    fs::write(&path, "0.1 0.2\n0.3 0.4\n").unwrap();
    let mut config = config(dir.path(), 4, 3);
    config.initial_parameters = Some(path);
    let mut pool = QuadraticPool::new(model(2));

    let err = run(&config, &mut pool, &CancelToken::new(), &mut |_| {}).unwrap_err();
    assert!(err.is_config());
    assert_eq!(err.info().code, "initial-dimensions");
    assert_eq!(pool.calls, 0);
}

#[test]
fn malformed_initial_parameters_are_rejected_before_sampling() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("start.txt");
    fs::write(&path, "0.1 0.2\n0.3 abc\n").unwrap();
    let mut config = config(dir.path(), 2, 3);
    config.initial_parameters = Some(path.clone());
    let mut pool = QuadraticPool::new(model(2));

    let err = run(&config, &mut pool, &CancelToken::new(), &mut |_| {}).unwrap_err();
    assert_eq!(err.info().code, "initial-parse");

    fs::write(&path, "0.1 0.2\n0.3\n").unwrap();
    let err = run(&config, &mut pool, &CancelToken::new(), &mut |_| {}).unwrap_err();
    assert_eq!(err.info().code, "initial-ragged");
    assert_eq!(pool.calls, 0);
    assert!(!config.output_checkpoint.exists());
}

#[test]
fn initial_parameters_are_used_verbatim_even_out_of_bounds() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("start.txt");
    fs::write(&path, "# walkers\n100.0 -0.5\n\n0.25 -200.0\n").unwrap();
    let mut config = config(dir.path(), 2, 1);
    config.initial_parameters = Some(path);
    let mut pool = QuadraticPool::new(model(2));

    run(&config, &mut pool, &CancelToken::new(), &mut |_| {}).unwrap();
    assert_eq!(
        pool.batches[0],
        ndarray::array![[100.0, -0.5], [0.25, -200.0]]
    );
}

#[test]
fn invalid_config_values_are_rejected() {
    let dir = tempdir().unwrap();
    let mut pool = QuadraticPool::new(model(2));

    let mut odd = config(dir.path(), 3, 5);
    let err = run(&odd, &mut pool, &CancelToken::new(), &mut |_| {}).unwrap_err();
    assert_eq!(err.info().code, "config-nwalkers");

    odd.nwalkers = 4;
    odd.niters = 0;
    let err = run(&odd, &mut pool, &CancelToken::new(), &mut |_| {}).unwrap_err();
    assert_eq!(err.info().code, "config-niters");
    assert_eq!(pool.calls, 0);
}
