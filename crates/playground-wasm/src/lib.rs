//! Browser front end for the firmware playground.
//!
//! Wires a [`SessionController`] to the page: LED elements, the compiler
//! output console, the status label and the run/stop buttons. Compiling and
//! emulation are supplied by the page as JS functions.

mod compiler;
mod dom;
mod logging;
mod options;
mod runner;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use js_sys::Function;
use playground_core::{CompileTicket, ControllerState, SessionController, SessionFault};
use tracing::{debug, info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{Element, Event};

pub use dom::DomFrontend;
pub use options::PlaygroundOptions;
pub use runner::{JsEmulator, JsEmulatorFactory, JsRunner};

use compiler::{CompileResult, PendingCompile};

type Controller = SessionController<JsEmulatorFactory, DomFrontend>;

struct Listener {
    target: Element,
    callback: Closure<dyn FnMut(Event)>,
}

struct Inner {
    controller: RefCell<Controller>,
    editor_text: Function,
    compile: Function,
    pending: RefCell<Vec<PendingCompile>>,
    listeners: Vec<Listener>,
}

impl Inner {
    fn run(self: &Rc<Self>) -> Result<(), JsValue> {
        let source = self
            .editor_text
            .call0(&JsValue::NULL)?
            .as_string()
            .unwrap_or_default();

        let request = match self.controller.borrow_mut().request_run(source) {
            Ok(request) => request,
            Err(refused) => {
                debug!(%refused, "run ignored");
                return Ok(());
            }
        };

        let weak = Rc::downgrade(self);
        let ticket = request.ticket;
        let pending = compiler::start(&self.compile, &request.source, move |result| {
            finish_compile(&weak, ticket, result);
        });

        {
            let mut callbacks = self.pending.borrow_mut();
            callbacks.retain(|callback| !callback.is_settled());
            callbacks.extend(pending);
        }
        Ok(())
    }

    fn complete(&self, ticket: CompileTicket, result: CompileResult) {
        let outcome = self.controller.borrow_mut().complete_compile(ticket, result);
        debug!(ticket = ticket.get(), ?outcome, "compile completed");
    }

    fn stop(&self) {
        self.controller.borrow_mut().stop();
    }

    fn poll(&self) -> Option<SessionFault> {
        self.controller.borrow_mut().poll()
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        for listener in &self.listeners {
            let _ = listener.target.remove_event_listener_with_callback(
                "click",
                listener.callback.as_ref().unchecked_ref(),
            );
        }
    }
}

fn finish_compile(weak: &Weak<Inner>, ticket: CompileTicket, result: CompileResult) {
    if let Some(inner) = weak.upgrade() {
        inner.complete(ticket, result);
    } else {
        debug!(ticket = ticket.get(), "playground dropped before compile finished");
    }
}

fn schedule_reap(weak: Weak<Inner>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let reap = Closure::once_into_js(move || {
        if let Some(inner) = weak.upgrade() {
            if let Some(fault) = inner.poll() {
                info!(%fault, "faulted session released");
            }
        }
    });
    if let Err(err) = window.set_timeout_with_callback(reap.unchecked_ref()) {
        warn!(error = ?err, "could not schedule session release");
    }
}

fn listen(
    target: Element,
    weak: Weak<Inner>,
    action: fn(&Rc<Inner>),
) -> Result<Listener, JsValue> {
    let callback = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
        if let Some(inner) = weak.upgrade() {
            action(&inner);
        }
    });
    target.add_event_listener_with_callback("click", callback.as_ref().unchecked_ref())?;
    Ok(Listener { target, callback })
}

fn on_run_click(inner: &Rc<Inner>) {
    if let Err(err) = inner.run() {
        warn!(error = %runner::describe_js_error(&err), "run failed");
    }
}

fn on_stop_click(inner: &Rc<Inner>) {
    inner.stop();
}

/// The playground as seen from the page.
#[wasm_bindgen]
pub struct Playground {
    inner: Rc<Inner>,
}

#[wasm_bindgen]
impl Playground {
    /// Discovers the page surfaces and wires the run/stop buttons.
    ///
    /// `editor_text()` returns the current source, `compile(source)` returns
    /// a promise of `{hex?, stderr?, stdout?}` and `create_runner(hex)`
    /// returns a runner object.
    #[wasm_bindgen(constructor)]
    pub fn new(
        options: JsValue,
        editor_text: Function,
        compile: Function,
        create_runner: Function,
    ) -> Result<Self, JsValue> {
        let options = PlaygroundOptions::from_js(options)?;
        logging::init(&options.log_filter)?;

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))?;
        let (frontend, bindings) = DomFrontend::discover(window, &options)?;
        let (run_button, stop_button) = frontend.buttons();
        info!(leds = bindings.bindings().len(), "playground surfaces discovered");

        let mut wiring_error = None;
        let inner = Rc::new_cyclic(|weak: &Weak<Inner>| {
            let reaper = weak.clone();
            let factory = JsEmulatorFactory::new(
                create_runner,
                Rc::new(move || schedule_reap(reaper.clone())),
            );
            let controller = SessionController::new(
                options.session,
                bindings,
                factory,
                Rc::new(RefCell::new(frontend)),
            );

            let mut listeners = Vec::new();
            let buttons = [
                (run_button, on_run_click as fn(&Rc<Inner>)),
                (stop_button, on_stop_click),
            ];
            for (button, action) in buttons {
                let Some(button) = button else { continue };
                match listen(button, weak.clone(), action) {
                    Ok(listener) => listeners.push(listener),
                    Err(err) => wiring_error = Some(err),
                }
            }

            Inner {
                controller: RefCell::new(controller),
                editor_text,
                compile,
                pending: RefCell::new(Vec::new()),
                listeners,
            }
        });

        match wiring_error {
            Some(err) => Err(err),
            None => Ok(Self { inner }),
        }
    }

    /// Same as clicking the run button.
    pub fn run(&self) -> Result<(), JsValue> {
        self.inner.run()
    }

    /// Same as clicking the stop button.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Releases a faulted session; returns the fault message, if any.
    pub fn poll(&self) -> Option<String> {
        self.inner.poll().map(|fault| fault.message().to_string())
    }

    /// Current lifecycle state as a string such as `"Running"`.
    pub fn state(&self) -> Result<JsValue, JsValue> {
        let state: ControllerState = self.inner.controller.borrow().state();
        serde_wasm_bindgen::to_value(&state).map_err(|err| JsValue::from_str(&err.to_string()))
    }
}
