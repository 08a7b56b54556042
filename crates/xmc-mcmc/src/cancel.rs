use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use xmc_core::errors::ErrorInfo;
use xmc_core::XmcError;

/// Shared flag polled by the sampling loop between iterations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; the loop stops at the next iteration boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Routes SIGINT/SIGTERM to this token.
    ///
    /// Only one handler can be installed per process.
    pub fn install_interrupt_handler(&self) -> Result<(), XmcError> {
        let token = self.clone();
        ctrlc::set_handler(move || {
            tracing::warn!("interrupt received, stopping after the current iteration");
            token.cancel();
        })
        .map_err(|err| {
            XmcError::Config(
                ErrorInfo::new("interrupt-handler", err.to_string())
                    .with_hint("only one interrupt handler may be installed per process"),
            )
        })
    }
}
