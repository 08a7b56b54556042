use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayView2, ArrayView3};
use tempfile::NamedTempFile;
use xmc_core::errors::ErrorInfo;
use xmc_core::{ParameterModel, XmcError};

const PROVENANCE_LINE: &str = "! Markov chain file generated by xspec \"chain\" command.";
const WARNING_LINE: &str = "!    Do not modify, else file may not reload properly.";

/// Label of the trailing `-2 lnprob` column.
pub const CHI_SQUARED_LABEL: &str = "Chi-Squared";

/// Contents of a text chain read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedChain {
    /// Row count declared in the header.
    pub length: usize,
    /// Column count declared in the header, including the chi-squared column.
    pub width: usize,
    /// One `index name unit` label per parameter followed by `Chi-Squared`.
    pub labels: Vec<String>,
    /// Data rows, shape `[length, width]`.
    pub rows: Array2<f64>,
}

/// Writes an xspec-compatible text chain.
///
/// Rows are walker-major: all iterations of walker 0, then walker 1, and so
/// on. Parameters flagged `log` are written as `10^v`; the last column is
/// `-2 * lnprob`. Returns the number of data rows written.
pub fn write_chain(
    path: &Path,
    chain: ArrayView3<'_, f64>,
    lnprob: ArrayView2<'_, f64>,
    model: &ParameterModel,
) -> Result<usize, XmcError> {
    let (nwalkers, niters, ndims) = chain.dim();
    if ndims != model.ndims() || lnprob.dim() != (nwalkers, niters) {
        return Err(XmcError::Export(
            ErrorInfo::new("export-shape", "chain does not match the parameter model")
                .with_context("chain", format!("{:?}", chain.dim()))
                .with_context("lnprobability", format!("{:?}", lnprob.dim()))
                .with_context("parameters", model.ndims().to_string()),
        ));
    }
    let length = nwalkers * niters;
    let io_err = |code: &str, err: std::io::Error| {
        XmcError::Export(
            ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
        )
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file = NamedTempFile::new_in(&dir).map_err(|err| io_err("export-tempfile", err))?;
    let mut out = BufWriter::new(file);

    let mut header = String::new();
    for param in model {
        header.push_str(&format!(
            "{} {} {} ",
            param.index,
            param.name,
            param.unit_label()
        ));
    }
    header.push_str(CHI_SQUARED_LABEL);

    writeln!(out, "{PROVENANCE_LINE}")
        .and_then(|_| writeln!(out, "{WARNING_LINE}"))
        .and_then(|_| writeln!(out, "!Length: {}  Width: {}", length, ndims + 1))
        .and_then(|_| writeln!(out, "!{header}"))
        .map_err(|err| io_err("export-write", err))?;

    let mut line = String::new();
    for walker in 0..nwalkers {
        for iteration in 0..niters {
            line.clear();
            for (dim, param) in model.iter().enumerate() {
                let value = chain[[walker, iteration, dim]];
                let value = if param.log { 10f64.powf(value) } else { value };
                line.push_str(&format_g(value));
                line.push('\t');
            }
            line.push_str(&format_g(-2.0 * lnprob[[walker, iteration]]));
            writeln!(out, "{line}").map_err(|err| io_err("export-write", err))?;
        }
    }

    let file = out
        .into_inner()
        .map_err(|err| io_err("export-write", err.into_error()))?;
    file.as_file()
        .sync_all()
        .map_err(|err| io_err("export-write", err))?;
    file.persist(path)
        .map_err(|err| io_err("export-rename", err.error))?;
    tracing::info!(path = %path.display(), rows = length, "wrote text chain");
    Ok(length)
}

/// Parses a text chain written by [`write_chain`] (or by xspec itself).
pub fn read_chain(path: &Path) -> Result<ExportedChain, XmcError> {
    let error = |code: &str, message: String| {
        XmcError::Export(
            ErrorInfo::new(code, message).with_context("path", path.display().to_string()),
        )
    };
    let contents =
        fs::read_to_string(path).map_err(|err| error("export-read", err.to_string()))?;

    let mut length = None;
    let mut labels = None;
    let mut values = Vec::new();
    let mut rows = 0usize;
    for (line_no, line) in contents.lines().enumerate() {
        if let Some(comment) = line.strip_prefix('!') {
            if let Some(dims) = comment.strip_prefix("Length:") {
                length = Some(parse_dimensions(dims).ok_or_else(|| {
                    error("export-header", format!("malformed length line: {line}"))
                })?);
            } else if comment.trim_end().ends_with(CHI_SQUARED_LABEL) {
                labels = Some(parse_labels(comment));
            }
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        let before = values.len();
        for token in line.split('\t') {
            let value: f64 = token.trim().parse().map_err(|_| {
                error(
                    "export-parse",
                    format!("non-numeric value {token:?} on line {}", line_no + 1),
                )
            })?;
            values.push(value);
        }
        if let Some((_, width)) = length {
            if values.len() - before != width {
                return Err(error(
                    "export-width",
                    format!(
                        "line {} has {} columns, header declares {width}",
                        line_no + 1,
                        values.len() - before
                    ),
                ));
            }
        }
        rows += 1;
    }

    let (length, width) =
        length.ok_or_else(|| error("export-header", "missing Length/Width line".to_string()))?;
    let labels =
        labels.ok_or_else(|| error("export-header", "missing column label line".to_string()))?;
    if rows != length {
        return Err(error(
            "export-length",
            format!("header declares {length} rows, found {rows}"),
        ));
    }
    if labels.len() != width {
        return Err(error(
            "export-labels",
            format!("header declares {width} columns, found {} labels", labels.len()),
        ));
    }
    let rows = Array2::from_shape_vec((length, width), values)
        .map_err(|err| error("export-shape", err.to_string()))?;
    Ok(ExportedChain {
        length,
        width,
        labels,
        rows,
    })
}

fn parse_dimensions(text: &str) -> Option<(usize, usize)> {
    let (length, width) = text.split_once("Width:")?;
    Some((length.trim().parse().ok()?, width.trim().parse().ok()?))
}

fn parse_labels(text: &str) -> Vec<String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let params = &tokens[..tokens.len().saturating_sub(1)];
    let mut labels: Vec<String> = params.chunks(3).map(|chunk| chunk.join(" ")).collect();
    labels.push(CHI_SQUARED_LABEL.to_string());
    labels
}

/// Formats a value the way C's `%g` does with the default precision of 6.
pub fn format_g(value: f64) -> String {
    const PRECISION: i32 = 6;
    if value.is_nan() {
        return if value.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let scientific = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some(parts) => parts,
        None => return scientific,
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            strip_fraction_zeros(mantissa),
            sign,
            exponent.abs()
        )
    } else {
        let decimals = (PRECISION - 1 - exponent) as usize;
        strip_fraction_zeros(&format!("{value:.decimals$}")).to_string()
    }
}

fn strip_fraction_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}
