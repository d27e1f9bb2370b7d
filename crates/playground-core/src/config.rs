//! Session controller configuration.

use crate::PortLayout;

/// Default simulated clock: an ATmega328P at 16 MHz.
pub const DEFAULT_CLOCK_HZ: u32 = 16_000_000;

/// Top-level immutable configuration for a session controller.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionConfig {
    /// Clock used to convert cycles to seconds when a tick reports none.
    pub clock_hz: u32,
    /// Port window the indicator bindings are validated against.
    pub port: PortLayout,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            clock_hz: DEFAULT_CLOCK_HZ,
            port: PortLayout::default(),
        }
    }
}

impl SessionConfig {
    /// Converts a cycle count to elapsed seconds.
    ///
    /// `reported_hz` wins when non-zero; otherwise the configured clock is
    /// used, and a zero configured clock yields zero seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn elapsed_seconds(&self, cycles: u64, reported_hz: f64) -> f64 {
        let hz = if reported_hz.is_finite() && reported_hz > 0.0 {
            reported_hz
        } else {
            f64::from(self.clock_hz)
        };
        if hz > 0.0 {
            cycles as f64 / hz
        } else {
            0.0
        }
    }
}
