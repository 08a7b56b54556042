use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use xmc_core::errors::ErrorInfo;
use xmc_core::{ParameterModel, XmcError};

/// YAML project file describing the fit handed to the worker processes.
///
/// ```yaml
/// command: xspec-worker fit.xcm
/// parameters:
///   - { index: 1, name: nH, unit: "10^22", val_init: 0.1, val_delta: 0.001,
///       val_hardmin: 0.0, val_hardmax: 100.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSpec {
    /// Command line started once per evaluation target.
    pub command: String,
    /// Free parameters of the fit, in column order.
    pub parameters: ParameterModel,
}

impl ProjectSpec {
    /// Reads and parses a project file.
    pub fn load(path: &Path) -> Result<Self, XmcError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            XmcError::Config(
                ErrorInfo::new("project-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        let spec: ProjectSpec = serde_yaml::from_str(&contents).map_err(|err| {
            XmcError::Config(
                ErrorInfo::new("project-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        spec.validate(path)?;
        Ok(spec)
    }

    fn validate(&self, path: &Path) -> Result<(), XmcError> {
        if self.command.trim().is_empty() {
            return Err(XmcError::Config(
                ErrorInfo::new("project-command", "project file has an empty worker command")
                    .with_context("path", path.display().to_string()),
            ));
        }
        if self.parameters.is_empty() {
            return Err(XmcError::Config(
                ErrorInfo::new("project-parameters", "project file lists no free parameters")
                    .with_context("path", path.display().to_string()),
            ));
        }
        for param in &self.parameters {
            if param.val_hardmin > param.val_hardmax {
                return Err(XmcError::Config(
                    ErrorInfo::new("project-bounds", "hard minimum exceeds hard maximum")
                        .with_context("path", path.display().to_string())
                        .with_context("parameter", param.name.clone()),
                ));
            }
        }
        Ok(())
    }

    /// Hex encoded SHA-256 of the project file, recorded in run manifests.
    pub fn hash_file(path: &Path) -> Result<String, XmcError> {
        let bytes = fs::read(path).map_err(|err| {
            XmcError::Config(
                ErrorInfo::new("project-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}
