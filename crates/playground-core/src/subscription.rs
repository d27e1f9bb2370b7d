//! Session-scoped liveness and observer subscriptions.
//!
//! Every observer handed to an emulator is wrapped in a guard tied to the
//! session that registered it. Once the session is torn down (or the
//! observer unsubscribed) the guard swallows late events, so a slow emulator
//! can never write into the next session's UI state.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::SessionFault;

/// Identity of one simulation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub(crate) u64);

impl SessionId {
    /// Raw sequence number, for logging.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session #{}", self.0)
    }
}

/// State shared between a session and the observers it registered.
#[derive(Debug)]
pub(crate) struct SessionLink {
    id: SessionId,
    alive: Cell<bool>,
    cycles: Cell<u64>,
    status: RefCell<String>,
    fault: RefCell<Option<SessionFault>>,
}

impl SessionLink {
    pub(crate) fn new(id: SessionId) -> Self {
        Self {
            id,
            alive: Cell::new(true),
            cycles: Cell::new(0),
            status: RefCell::new(String::new()),
            fault: RefCell::new(None),
        }
    }

    pub(crate) const fn id(&self) -> SessionId {
        self.id
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.get()
    }

    pub(crate) fn kill(&self) {
        self.alive.set(false);
    }

    pub(crate) fn cycles(&self) -> u64 {
        self.cycles.get()
    }

    /// Records a new cycle count; returns `false` when it went backwards.
    pub(crate) fn advance_cycles(&self, cycles: u64) -> bool {
        if cycles < self.cycles.get() {
            return false;
        }
        self.cycles.set(cycles);
        true
    }

    pub(crate) fn set_status(&self, text: &str) {
        let mut status = self.status.borrow_mut();
        status.clear();
        status.push_str(text);
    }

    /// Latches `fault`, kills the link and returns the terminal status line.
    pub(crate) fn latch_fault(&self, fault: SessionFault) -> String {
        self.kill();
        let last = self.status.borrow();
        let line = if last.is_empty() {
            format!("Simulation stopped: {fault}")
        } else {
            format!("{last} (stopped: {fault})")
        };
        *self.fault.borrow_mut() = Some(fault);
        line
    }

    pub(crate) fn is_faulted(&self) -> bool {
        self.fault.borrow().is_some()
    }

    pub(crate) fn take_fault(&self) -> Option<SessionFault> {
        self.fault.borrow_mut().take()
    }
}

/// Handle to one registered observer; unsubscribing mutes it for good.
#[derive(Debug)]
pub(crate) struct Subscription {
    active: Rc<Cell<bool>>,
}

impl Subscription {
    #[cfg(test)]
    pub(crate) fn is_active(&self) -> bool {
        self.active.get()
    }

    pub(crate) fn unsubscribe(&self) {
        self.active.set(false);
    }
}

/// Wraps `observer` so it only runs while its subscription and session live.
pub(crate) fn guard<T: 'static>(
    link: &Rc<SessionLink>,
    channel: &'static str,
    mut observer: impl FnMut(T) + 'static,
) -> (Subscription, Box<dyn FnMut(T)>) {
    let active = Rc::new(Cell::new(true));
    let subscription = Subscription {
        active: Rc::clone(&active),
    };
    let link = Rc::clone(link);
    let guarded = Box::new(move |event: T| {
        if active.get() && link.is_alive() {
            observer(event);
        } else {
            trace!(session = %link.id(), channel, "discarding late event");
        }
    });
    (subscription, guarded)
}
