#![deny(missing_docs)]
#![doc = "Core data types, errors and the evaluation-pool contract for the XMC sampler."]

use ndarray::{Array1, ArrayView2};

pub mod errors;
pub mod provenance;
pub mod rng;
mod types;

pub use errors::{ErrorInfo, XmcError};
pub use provenance::{RunProvenance, SchemaVersion};
pub use rng::{derive_substream_seed, RngHandle};
pub use types::{ParameterDescriptor, ParameterModel};

/// Synchronous likelihood evaluation capability consumed by the sampler.
///
/// A pool owns the parameter model of the fit and turns a batch of walker
/// vectors (`[n, ndims]`) into one log-probability per row. The call blocks
/// until every row has a result; partial batches are never returned. How the
/// work is spread across processes or hosts is the pool's own business.
pub trait EvaluationPool {
    /// Free parameters of the fit, in column order.
    fn parameter_model(&self) -> &ParameterModel;

    /// Evaluates the log-probability of every row in `batch`.
    fn evaluate(&mut self, batch: ArrayView2<'_, f64>) -> Result<Array1<f64>, XmcError>;
}

impl<P: EvaluationPool + ?Sized> EvaluationPool for Box<P> {
    fn parameter_model(&self) -> &ParameterModel {
        (**self).parameter_model()
    }

    fn evaluate(&mut self, batch: ArrayView2<'_, f64>) -> Result<Array1<f64>, XmcError> {
        (**self).evaluate(batch)
    }
}
