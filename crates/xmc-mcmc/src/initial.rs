use std::fs;
use std::path::Path;

use ndarray::Array2;
use rand::Rng;
use rand_distr::StandardNormal;
use xmc_core::errors::ErrorInfo;
use xmc_core::{ParameterDescriptor, ParameterModel, XmcError};

/// Spread of the initial draw for a parameter.
///
/// The fitting tool's `val_delta` is used unless a tenth of the estimated
/// sigma is positive and narrower, which guards against a badly tuned delta.
pub fn initial_width(param: &ParameterDescriptor) -> f64 {
    let sigma_width = param.val_sigma * 0.1;
    if sigma_width > 0.0 && sigma_width < param.val_delta {
        sigma_width
    } else {
        param.val_delta
    }
}

/// Draws a `[nwalkers, ndims]` starting population around the initial values.
///
/// Each value is `val_init + width * N(0, 1)` clipped into the hard range.
/// Out-of-range draws are clipped, never redrawn.
pub fn build_population<R: Rng + ?Sized>(
    model: &ParameterModel,
    nwalkers: usize,
    rng: &mut R,
) -> Array2<f64> {
    let mut population = Array2::zeros((nwalkers, model.ndims()));
    for mut walker in population.rows_mut() {
        for (value, param) in walker.iter_mut().zip(model.iter()) {
            let z: f64 = rng.sample(StandardNormal);
            let draw = param.val_init + initial_width(param) * z;
            *value = clip(draw, param.val_hardmin, param.val_hardmax);
        }
    }
    population
}

fn clip(value: f64, min: f64, max: f64) -> f64 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Reads starting positions from a whitespace-delimited matrix file.
///
/// Rows are walkers and columns parameters; blank lines and `#` comments
/// are skipped. Values are taken verbatim, without bounds checks.
pub fn load_population(path: &Path) -> Result<Array2<f64>, XmcError> {
    let contents = fs::read_to_string(path).map_err(|err| {
        XmcError::Config(
            ErrorInfo::new("initial-read", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;

    let mut values = Vec::new();
    let mut rows = 0usize;
    let mut width: Option<usize> = None;
    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut count = 0usize;
        for token in line.split_whitespace() {
            let value: f64 = token.parse().map_err(|_| {
                XmcError::Config(
                    ErrorInfo::new("initial-parse", "initial parameters contain a non-numeric value")
                        .with_context("path", path.display().to_string())
                        .with_context("line", (line_no + 1).to_string())
                        .with_context("token", token.to_string()),
                )
            })?;
            values.push(value);
            count += 1;
        }
        match width {
            None => width = Some(count),
            Some(expected) if expected != count => {
                return Err(XmcError::Config(
                    ErrorInfo::new("initial-ragged", "initial parameter rows differ in length")
                        .with_context("path", path.display().to_string())
                        .with_context("line", (line_no + 1).to_string())
                        .with_context("expected", expected.to_string())
                        .with_context("found", count.to_string()),
                ));
            }
            Some(_) => {}
        }
        rows += 1;
    }

    let width = width.ok_or_else(|| {
        XmcError::Config(
            ErrorInfo::new("initial-empty", "initial parameters file contains no rows")
                .with_context("path", path.display().to_string()),
        )
    })?;
    Array2::from_shape_vec((rows, width), values).map_err(|err| {
        XmcError::Config(
            ErrorInfo::new("initial-shape", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })
}
