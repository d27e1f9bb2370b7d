//! Run/stop lifecycle of simulation sessions.
//!
//! The controller is the only owner of the active session. Compiling is
//! asynchronous and happens outside: [`SessionController::request_run`] hands
//! out a [`CompileRequest`], and the host resumes the controller with
//! [`SessionController::complete_compile`] once the compile service answers.
//!
//! ```text
//! Idle ──request_run──▶ Compiling ──complete_compile──▶ Running ──stop/fault──▶ Stopped
//!   ▲                        │ (failure)                                          │
//!   └────────────────────────┘◀──────────────────────request_run──────────────────┘
//! ```

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::session::Session;
use crate::{
    BinaryImage, BuildResult, CompileRequest, CompileTicket, CompileTransportError,
    EmulatorFactory, Frontend, PeripheralBridge, PinBindingTable, SessionConfig, SessionFault,
    SessionId,
};

/// Status line shown while a compile is in flight.
pub const COMPILING_STATUS: &str = "Compiling...";

/// Console line appended when a session starts.
pub const RUNNING_NOTICE: &str = "\nProgram running...";

/// Host-visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ControllerState {
    /// No session and no compile in flight.
    Idle,
    /// Waiting for the compile service.
    Compiling,
    /// A session is executing.
    Running,
    /// The last session was stopped or faulted.
    Stopped,
}

/// What [`SessionController::complete_compile`] did with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompileOutcome {
    /// A new session started.
    Started(SessionId),
    /// The build produced no usable image; diagnostics are on the console.
    DiagnosticFailure,
    /// The image was invalid or the emulator refused it.
    LoadFailed,
    /// The compile call itself failed; the user was alerted.
    TransportFailed,
    /// The ticket was stale; nothing changed.
    Ignored,
}

/// A run request that was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum RunRefused {
    /// Another compile has not completed yet.
    #[error("compile request #{} is still in flight", .pending.get())]
    CompileInFlight {
        /// Ticket of the compile in flight.
        pending: CompileTicket,
    },
}

enum Phase<E: crate::Emulator> {
    Idle,
    Compiling(CompileTicket),
    Running(Session<E>),
    Stopped,
}

/// Owns the single active session and drives the UI through its lifecycle.
pub struct SessionController<F: EmulatorFactory, U: Frontend> {
    config: SessionConfig,
    bindings: Rc<PinBindingTable>,
    factory: F,
    frontend: Rc<RefCell<U>>,
    phase: Phase<F::Emulator>,
    next_ticket: u64,
    next_session: u64,
}

impl<F, U> SessionController<F, U>
where
    F: EmulatorFactory,
    U: Frontend + 'static,
{
    /// Creates an idle controller and puts the controls in their idle state.
    pub fn new(
        config: SessionConfig,
        bindings: PinBindingTable,
        factory: F,
        frontend: Rc<RefCell<U>>,
    ) -> Self {
        {
            let mut ui = frontend.borrow_mut();
            ui.set_run_enabled(true);
            ui.set_stop_enabled(false);
        }
        Self {
            config,
            bindings: Rc::new(bindings),
            factory,
            frontend,
            phase: Phase::Idle,
            next_ticket: 0,
            next_session: 0,
        }
    }

    /// Current lifecycle state.
    ///
    /// A session that faulted reports [`ControllerState::Stopped`] even
    /// before [`SessionController::poll`] releases it.
    #[must_use]
    pub fn state(&self) -> ControllerState {
        match &self.phase {
            Phase::Idle => ControllerState::Idle,
            Phase::Compiling(_) => ControllerState::Compiling,
            Phase::Running(session) if session.is_faulted() => ControllerState::Stopped,
            Phase::Running(_) => ControllerState::Running,
            Phase::Stopped => ControllerState::Stopped,
        }
    }

    /// Identity of the session currently held, faulted or not.
    #[must_use]
    pub fn active_session(&self) -> Option<SessionId> {
        match &self.phase {
            Phase::Running(session) => Some(session.id()),
            _ => None,
        }
    }

    /// Latest cycle count reported by the active session.
    #[must_use]
    pub fn session_cycles(&self) -> Option<u64> {
        match &self.phase {
            Phase::Running(session) => Some(session.cycles()),
            _ => None,
        }
    }

    /// Ticket of the compile in flight, if any.
    #[must_use]
    pub const fn pending_compile(&self) -> Option<CompileTicket> {
        match &self.phase {
            Phase::Compiling(ticket) => Some(*ticket),
            _ => None,
        }
    }

    /// Pin bindings shared by every session.
    #[must_use]
    pub fn bindings(&self) -> &PinBindingTable {
        &self.bindings
    }

    /// Configuration the controller was built with.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Starts a run: snapshots `source` and enters the compiling state.
    ///
    /// Any active session is torn down first. Every bound indicator is turned
    /// off, both controls are disabled and the status line reads
    /// [`COMPILING_STATUS`].
    ///
    /// # Errors
    ///
    /// Returns [`RunRefused::CompileInFlight`] while a previous compile has
    /// not completed; nothing changes in that case.
    pub fn request_run(&mut self, source: impl Into<String>) -> Result<CompileRequest, RunRefused> {
        if let Phase::Compiling(pending) = self.phase {
            debug!(ticket = pending.get(), "run refused: compile in flight");
            return Err(RunRefused::CompileInFlight { pending });
        }

        self.release_session();

        self.next_ticket += 1;
        let ticket = CompileTicket(self.next_ticket);
        {
            let mut ui = self.frontend.borrow_mut();
            PeripheralBridge::new(&self.bindings).reset(&mut *ui);
            ui.set_run_enabled(false);
            ui.set_stop_enabled(false);
            ui.set_status(COMPILING_STATUS);
        }
        self.phase = Phase::Compiling(ticket);
        debug!(ticket = ticket.get(), "compile requested");

        Ok(CompileRequest {
            ticket,
            source: source.into(),
        })
    }

    /// Resumes the controller with the result of a compile request.
    ///
    /// Results for any ticket other than the one in flight are ignored.
    pub fn complete_compile(
        &mut self,
        ticket: CompileTicket,
        result: Result<BuildResult, CompileTransportError>,
    ) -> CompileOutcome {
        if !matches!(self.phase, Phase::Compiling(pending) if pending == ticket) {
            debug!(ticket = ticket.get(), "ignoring stale compile result");
            return CompileOutcome::Ignored;
        }
        self.phase = Phase::Idle;

        let build = match result {
            Ok(build) => build,
            Err(err) => {
                warn!(ticket = ticket.get(), %err, "compile request failed");
                {
                    let mut ui = self.frontend.borrow_mut();
                    ui.set_status("");
                    ui.set_run_enabled(true);
                    ui.alert(&format!("Failed: {err}"));
                }
                return CompileOutcome::TransportFailed;
            }
        };

        {
            let mut ui = self.frontend.borrow_mut();
            ui.set_status("");
            ui.set_streaming(false);
            ui.replace_text(&build.diagnostic_text);
        }

        let Some(hex) = build.image_text() else {
            debug!(ticket = ticket.get(), "build produced no image");
            self.frontend.borrow_mut().set_run_enabled(true);
            return CompileOutcome::DiagnosticFailure;
        };

        let image = match BinaryImage::parse(hex) {
            Ok(image) => image,
            Err(err) => return self.abort_load(&format!("invalid binary image: {err}")),
        };
        let emulator = match self.factory.load(&image) {
            Ok(emulator) => emulator,
            Err(err) => return self.abort_load(&err.to_string()),
        };

        {
            let mut ui = self.frontend.borrow_mut();
            ui.append_text(RUNNING_NOTICE);
            ui.set_stop_enabled(true);
        }

        self.next_session += 1;
        let id = SessionId(self.next_session);
        let session = Session::start(
            id,
            emulator,
            Rc::clone(&self.bindings),
            Rc::clone(&self.frontend),
            &self.config,
        );
        self.phase = Phase::Running(session);
        info!(session = %id, image_bytes = image.data_len(), "session started");

        CompileOutcome::Started(id)
    }

    /// Stops the active session, or abandons the compile in flight.
    ///
    /// Afterwards the stop control is disabled and the run control enabled.
    pub fn stop(&mut self) {
        match mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Running(session) => {
                let id = session.id();
                match session.teardown() {
                    Some(fault) => info!(session = %id, %fault, "faulted session released"),
                    None => info!(session = %id, "session stopped"),
                }
                self.phase = Phase::Stopped;
            }
            Phase::Compiling(ticket) => {
                debug!(ticket = ticket.get(), "compile abandoned");
                self.frontend.borrow_mut().set_status("");
            }
            Phase::Stopped => self.phase = Phase::Stopped,
            Phase::Idle => {}
        }

        let mut ui = self.frontend.borrow_mut();
        ui.set_stop_enabled(false);
        ui.set_run_enabled(true);
    }

    /// Releases a session whose run loop faulted.
    ///
    /// Returns the fault when a session was released.
    pub fn poll(&mut self) -> Option<SessionFault> {
        if !matches!(&self.phase, Phase::Running(session) if session.is_faulted()) {
            return None;
        }
        match mem::replace(&mut self.phase, Phase::Stopped) {
            Phase::Running(session) => {
                let id = session.id();
                let fault = session.teardown();
                info!(session = %id, "faulted session released");
                fault
            }
            _ => None,
        }
    }

    fn release_session(&mut self) {
        if let Phase::Running(session) = mem::replace(&mut self.phase, Phase::Idle) {
            info!(session = %session.id(), "replacing active session");
            let _ = session.teardown();
        }
    }

    fn abort_load(&mut self, message: &str) -> CompileOutcome {
        warn!(%message, "program not loaded");
        {
            let mut ui = self.frontend.borrow_mut();
            ui.append_text(&format!("\n{message}"));
            ui.set_run_enabled(true);
        }
        CompileOutcome::LoadFailed
    }
}
