//! Simulation session controller for the firmware playground.
//!
//! Bridges a remote compile service and an instruction-level emulator to a
//! set of UI surfaces: LED indicators, a serial console, a status line and
//! run/stop controls. Host-agnostic; the browser front end lives in
//! `playground-wasm`.

/// Simulated-time formatting for the status line.
pub mod time;
pub use time::{format_time, parse_time};

/// Pin binding table and port observation bridge.
pub mod pins;
pub use pins::{
    BindingError, IndicatorId, Indicators, PeripheralBridge, PinBinding, PinBindingTable,
    PinState, PortLayout, MAX_PORT_WIDTH,
};

/// Serial transmit stream accumulation.
pub mod serial;
pub use serial::{Console, SerialAccumulator};

/// Intel HEX firmware image validation.
pub mod image;
pub use image::{BinaryImage, ImageError};

/// Controller configuration.
pub mod config;
pub use config::{SessionConfig, DEFAULT_CLOCK_HZ};

/// Compile service contract.
pub mod compile;
pub use compile::{
    BuildResult, CompileRequest, CompileResponse, CompileTicket, CompileTransportError,
};

/// Emulator collaborator contract.
pub mod emulator;
pub use emulator::{
    ByteObserver, Emulator, EmulatorFactory, LoadError, PortObserver, RunEvent, RunObserver,
    SessionFault, TickReport,
};

/// UI surfaces driven by the controller.
pub mod frontend;
pub use frontend::Frontend;

mod subscription;
pub use subscription::SessionId;

mod session;

/// Session lifecycle controller.
pub mod controller;
pub use controller::{
    CompileOutcome, ControllerState, RunRefused, SessionController, COMPILING_STATUS,
    RUNNING_NOTICE,
};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
