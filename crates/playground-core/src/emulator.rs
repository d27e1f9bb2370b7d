//! Emulator collaborator contract.
//!
//! The instruction-level emulator is a black box. A factory builds one
//! instance per session from a validated image; the instance reports port
//! changes, transmitted bytes and run-loop progress through the observers
//! registered here, all on the host's single event loop.

use thiserror::Error;

use crate::BinaryImage;

/// Callback invoked with the digital-I/O-port value on every change.
pub type PortObserver = Box<dyn FnMut(u32)>;
/// Callback invoked once per transmitted serial byte.
pub type ByteObserver = Box<dyn FnMut(u8)>;
/// Callback invoked by the run loop.
pub type RunObserver = Box<dyn FnMut(RunEvent)>;

/// Progress report from one run-loop slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Cycles executed since the session started.
    pub cycles: u64,
    /// Simulated clock frequency in hertz; zero when unknown.
    pub clock_hz: f64,
}

/// Event emitted by the emulator's run loop.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// The loop finished a slice.
    Tick(TickReport),
    /// The loop hit an unrecoverable fault and will not continue.
    Fault(SessionFault),
}

/// Unrecoverable emulator run-loop fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SessionFault {
    message: String,
}

impl SessionFault {
    /// Wraps a fault description reported by the emulator.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Fault description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The emulator refused to build an instance from an image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to load program: {message}")]
pub struct LoadError {
    message: String,
}

impl LoadError {
    /// Wraps a load failure description.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One running emulator instance.
pub trait Emulator {
    /// Registers the digital-I/O-port observer.
    fn subscribe_port(&mut self, observer: PortObserver);

    /// Registers the serial transmit observer.
    fn subscribe_transmit(&mut self, observer: ByteObserver);

    /// Starts the background run loop, which reports through `observer`
    /// until stopped or faulted.
    fn run(&mut self, observer: RunObserver);

    /// Halts the run loop. Calling it again must be harmless.
    fn stop(&mut self);
}

/// Builds emulator instances from firmware images.
pub trait EmulatorFactory {
    /// Instance type produced by this factory.
    type Emulator: Emulator;

    /// Loads `image` into a fresh emulator instance.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the emulator rejects the image.
    fn load(&mut self, image: &BinaryImage) -> Result<Self::Emulator, LoadError>;
}
