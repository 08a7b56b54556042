use serde::{Deserialize, Serialize};

/// Static description of a single fitted parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    /// Index of the parameter in the spectral model (1-based).
    pub index: u32,
    /// Parameter name, e.g. `nH` or `norm`.
    pub name: String,
    /// Physical unit; may be empty.
    #[serde(default)]
    pub unit: String,
    /// Starting value.
    pub val_init: f64,
    /// Proposal width supplied by the fitting tool.
    pub val_delta: f64,
    /// Estimated one-sigma uncertainty (zero when unknown).
    #[serde(default)]
    pub val_sigma: f64,
    /// Hard lower bound.
    pub val_hardmin: f64,
    /// Hard upper bound.
    pub val_hardmax: f64,
    /// Sampled as log10 of the physical value.
    #[serde(default)]
    pub log: bool,
}

impl ParameterDescriptor {
    /// Unit label used in exported chain headers.
    pub fn unit_label(&self) -> &str {
        if self.unit.is_empty() {
            "0"
        } else {
            &self.unit
        }
    }
}

/// Ordered set of free parameters for a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterModel {
    parameters: Vec<ParameterDescriptor>,
}

impl ParameterModel {
    /// Creates a model from descriptors in fit order.
    pub fn new(parameters: Vec<ParameterDescriptor>) -> Self {
        Self { parameters }
    }

    /// Number of free parameters.
    pub fn ndims(&self) -> usize {
        self.parameters.len()
    }

    /// Whether the model has no free parameters.
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Descriptors in fit order.
    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    /// Mutable access used by pools that rewrite the model (e.g. log-space sampling).
    pub fn parameters_mut(&mut self) -> &mut [ParameterDescriptor] {
        &mut self.parameters
    }

    /// Iterates over the descriptors.
    pub fn iter(&self) -> std::slice::Iter<'_, ParameterDescriptor> {
        self.parameters.iter()
    }
}

impl<'a> IntoIterator for &'a ParameterModel {
    type Item = &'a ParameterDescriptor;
    type IntoIter = std::slice::Iter<'a, ParameterDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.parameters.iter()
    }
}
