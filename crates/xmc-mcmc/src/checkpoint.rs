use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use xmc_core::errors::ErrorInfo;
use xmc_core::{SchemaVersion, XmcError};

use crate::chain::ChainBuffer;

const MAGIC: &[u8; 8] = b"XMCCKPT\0";

/// Schema written into every checkpoint.
pub const CHECKPOINT_SCHEMA: SchemaVersion = SchemaVersion::new(1, 0, 0);

/// Serializable snapshot of the filled part of a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// Schema of the payload.
    pub schema_version: SchemaVersion,
    /// Positions indexed `[walker, iteration, parameter]`.
    pub chain: Array3<f64>,
    /// Log-probabilities indexed `[walker, iteration]`.
    pub lnprobability: Array2<f64>,
}

impl CheckpointRecord {
    /// Copies the filled prefix of `buffer` into a record.
    pub fn from_buffer(buffer: &ChainBuffer) -> Self {
        Self {
            schema_version: CHECKPOINT_SCHEMA,
            chain: buffer.filled_chain().to_owned(),
            lnprobability: buffer.filled_lnprob().to_owned(),
        }
    }

    /// Number of walkers.
    pub fn nwalkers(&self) -> usize {
        self.chain.dim().0
    }

    /// Number of iterations stored.
    pub fn filled(&self) -> usize {
        self.chain.dim().1
    }

    /// Number of parameters per walker.
    pub fn ndims(&self) -> usize {
        self.chain.dim().2
    }
}

/// Binary checkpoint file holding the filled prefix of the chain.
///
/// Files start with an 8-byte magic followed by a bincode encoded
/// [`CheckpointRecord`]. Writes go to a temporary file in the same directory
/// that is renamed over the destination once flushed, so an interrupted save
/// leaves the previous checkpoint in place.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Creates a store writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Destination path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a checkpoint file exists at the destination.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Persists the filled iterations of `buffer`, returning how many were written.
    pub fn save(&self, buffer: &ChainBuffer) -> Result<usize, XmcError> {
        let record = CheckpointRecord::from_buffer(buffer);
        self.save_record(&record)?;
        tracing::info!(
            path = %self.path.display(),
            iterations = record.filled(),
            "wrote checkpoint"
        );
        Ok(record.filled())
    }

    /// Persists an already truncated record.
    pub fn save_record(&self, record: &CheckpointRecord) -> Result<(), XmcError> {
        let body = bincode::serialize(record).map_err(|err| self.error("checkpoint-serialize", err))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|err| {
            XmcError::Checkpoint(
                ErrorInfo::new("checkpoint-mkdir", err.to_string())
                    .with_context("path", dir.display().to_string()),
            )
        })?;
        let mut file =
            NamedTempFile::new_in(&dir).map_err(|err| self.error("checkpoint-tempfile", err))?;
        file.write_all(MAGIC)
            .and_then(|_| file.write_all(&body))
            .and_then(|_| file.as_file().sync_all())
            .map_err(|err| self.error("checkpoint-write", err))?;
        file.persist(&self.path)
            .map_err(|err| self.error("checkpoint-rename", err.error))?;
        Ok(())
    }

    /// Loads and validates the checkpoint.
    pub fn load(&self) -> Result<CheckpointRecord, XmcError> {
        let bytes = fs::read(&self.path).map_err(|err| self.error("checkpoint-read", err))?;
        let body = match bytes.strip_prefix(MAGIC.as_slice()) {
            Some(body) => body,
            None => {
                return Err(XmcError::Checkpoint(
                    ErrorInfo::new("checkpoint-magic", "file is not an XMC checkpoint")
                        .with_context("path", self.path.display().to_string()),
                ))
            }
        };
        let record: CheckpointRecord =
            bincode::deserialize(body).map_err(|err| self.error("checkpoint-parse", err))?;

        if !CHECKPOINT_SCHEMA.is_compatible(&record.schema_version) {
            return Err(XmcError::Checkpoint(
                ErrorInfo::new("checkpoint-schema", "unsupported checkpoint schema")
                    .with_context("path", self.path.display().to_string())
                    .with_context(
                        "found",
                        format!(
                            "{}.{}.{}",
                            record.schema_version.major,
                            record.schema_version.minor,
                            record.schema_version.patch
                        ),
                    ),
            ));
        }
        let (walkers, iterations, _) = record.chain.dim();
        if record.lnprobability.dim() != (walkers, iterations) {
            return Err(XmcError::Checkpoint(
                ErrorInfo::new(
                    "checkpoint-shape",
                    "chain and lnprobability shapes disagree",
                )
                .with_context("path", self.path.display().to_string())
                .with_context("chain", format!("{:?}", record.chain.dim()))
                .with_context("lnprobability", format!("{:?}", record.lnprobability.dim())),
            ));
        }
        Ok(record)
    }

    fn error(&self, code: &str, err: impl ToString) -> XmcError {
        XmcError::Checkpoint(
            ErrorInfo::new(code, err.to_string())
                .with_context("path", self.path.display().to_string()),
        )
    }
}
