use ndarray::{array, Array1, ArrayView2};
use xmc_core::{EvaluationPool, ParameterModel, XmcError};

struct SumPool {
    model: ParameterModel,
}

impl EvaluationPool for SumPool {
    fn parameter_model(&self) -> &ParameterModel {
        &self.model
    }

    fn evaluate(&mut self, batch: ArrayView2<'_, f64>) -> Result<Array1<f64>, XmcError> {
        Ok(batch.rows().into_iter().map(|row| -row.sum()).collect())
    }
}

#[test]
fn boxed_pools_forward_calls() {
    let mut pool: Box<dyn EvaluationPool> = Box::new(SumPool {
        model: ParameterModel::default(),
    });
    let batch = array![[1.0, 2.0], [3.0, 4.0]];
    let result = pool.evaluate(batch.view()).expect("evaluate");
    assert_eq!(result, array![-3.0, -7.0]);
    assert!(pool.parameter_model().is_empty());
}
