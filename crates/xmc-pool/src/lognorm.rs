use std::f64::consts::LN_10;

use xmc_core::ParameterModel;

const NORM_NAME: &str = "norm";

/// Switches every normalisation parameter to log10 sampling.
///
/// Initial value and bounds are mapped through `log10`; widths are mapped
/// to first order around the initial value. Non-positive lower bounds are
/// floored at the smallest positive double so the range stays finite.
pub fn apply_log_norm(model: &mut ParameterModel) {
    for param in model.parameters_mut() {
        if param.name != NORM_NAME || param.log {
            continue;
        }
        let init = param.val_init.max(f64::MIN_POSITIVE);
        param.val_delta = relative_width(param.val_delta, init);
        param.val_sigma = relative_width(param.val_sigma, init);
        param.val_init = init.log10();
        param.val_hardmin = param.val_hardmin.max(f64::MIN_POSITIVE).log10();
        param.val_hardmax = param.val_hardmax.max(f64::MIN_POSITIVE).log10();
        param.log = true;
    }
}

fn relative_width(width: f64, init: f64) -> f64 {
    width / (init * LN_10)
}
