//! User-interface surfaces driven by the controller.

use crate::{Console, Indicators};

/// Every UI surface the controller writes to.
///
/// Implementations are only ever touched from the host event loop.
pub trait Frontend: Indicators + Console {
    /// Replaces the status line.
    fn set_status(&mut self, text: &str);

    /// Enables or disables the run control.
    fn set_run_enabled(&mut self, enabled: bool);

    /// Enables or disables the stop control.
    fn set_stop_enabled(&mut self, enabled: bool);

    /// Raises a blocking, user-visible alert.
    fn alert(&mut self, message: &str);
}
