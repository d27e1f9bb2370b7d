//! One live emulator instance wired to the UI surfaces.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::subscription::{guard, SessionLink, Subscription};
use crate::{
    format_time, Emulator, Frontend, PeripheralBridge, PinBindingTable, RunEvent, SerialAccumulator,
    SessionConfig, SessionFault, SessionId,
};

pub(crate) struct Session<E: Emulator> {
    link: Rc<SessionLink>,
    emulator: E,
    subscriptions: Vec<Subscription>,
    stopped: bool,
}

impl<E: Emulator> Session<E> {
    /// Attaches the bridge and accumulator to `emulator` and starts its run loop.
    pub(crate) fn start<U: Frontend + 'static>(
        id: SessionId,
        mut emulator: E,
        bindings: Rc<PinBindingTable>,
        frontend: Rc<RefCell<U>>,
        config: &SessionConfig,
    ) -> Self {
        let link = Rc::new(SessionLink::new(id));
        let mut subscriptions = Vec::with_capacity(3);

        let indicators = Rc::clone(&frontend);
        let (subscription, on_port) = guard(&link, "port", move |value: u32| {
            PeripheralBridge::new(&bindings).apply(value, &mut *indicators.borrow_mut());
        });
        subscriptions.push(subscription);
        emulator.subscribe_port(on_port);

        let console = Rc::clone(&frontend);
        let mut accumulator = SerialAccumulator::new();
        let (subscription, on_byte) = guard(&link, "serial", move |byte: u8| {
            accumulator.on_byte(byte, &mut *console.borrow_mut());
        });
        subscriptions.push(subscription);
        emulator.subscribe_transmit(on_byte);

        let run_link = Rc::clone(&link);
        let config = config.clone();
        let (subscription, on_run) = guard(&link, "run", move |event: RunEvent| match event {
            RunEvent::Tick(report) => {
                if !run_link.advance_cycles(report.cycles) {
                    warn!(
                        session = %run_link.id(),
                        cycles = report.cycles,
                        last = run_link.cycles(),
                        "cycle counter went backwards; ignoring tick"
                    );
                    return;
                }
                let seconds = config.elapsed_seconds(report.cycles, report.clock_hz);
                let status = format!("Simulation time: {}", format_time(seconds));
                run_link.set_status(&status);
                frontend.borrow_mut().set_status(&status);
            }
            RunEvent::Fault(fault) => {
                warn!(session = %run_link.id(), %fault, "emulator faulted");
                let status = run_link.latch_fault(fault);
                let mut ui = frontend.borrow_mut();
                ui.set_status(&status);
                ui.set_stop_enabled(false);
                ui.set_run_enabled(true);
            }
        });
        subscriptions.push(subscription);
        emulator.run(on_run);

        debug!(session = %id, "observers attached, run loop started");
        Self {
            link,
            emulator,
            subscriptions,
            stopped: false,
        }
    }

    pub(crate) fn id(&self) -> SessionId {
        self.link.id()
    }

    pub(crate) fn is_faulted(&self) -> bool {
        self.link.is_faulted()
    }

    pub(crate) fn cycles(&self) -> u64 {
        self.link.cycles()
    }

    /// Stops the emulator and returns the fault that ended the session, if any.
    pub(crate) fn teardown(mut self) -> Option<SessionFault> {
        self.shutdown();
        self.link.take_fault()
    }

    fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        for subscription in &self.subscriptions {
            subscription.unsubscribe();
        }
        self.link.kill();
        self.emulator.stop();
        debug!(session = %self.link.id(), "session torn down");
    }
}

impl<E: Emulator> Drop for Session<E> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
