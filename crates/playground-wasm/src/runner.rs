//! Emulator adapter over a JavaScript runner object.
//!
//! The runner is created by a page-supplied factory from the hex image and
//! exposes `onPortChange(cb)`, `onByteTransmit(cb)`,
//! `execute(onTick, onFault)` and `stop()`. Callbacks handed to it are owned
//! by the JS side, so a runner that fires after teardown reaches a muted
//! observer instead of a freed closure.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Function;
use playground_core::{
    BinaryImage, ByteObserver, Emulator, EmulatorFactory, LoadError, PortObserver, RunEvent,
    RunObserver, SessionFault, TickReport,
};
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    /// Page-side emulator instance.
    pub type JsRunner;

    #[wasm_bindgen(method, catch, js_name = onPortChange)]
    fn on_port_change(this: &JsRunner, callback: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = onByteTransmit)]
    fn on_byte_transmit(this: &JsRunner, callback: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch)]
    fn execute(this: &JsRunner, on_tick: &JsValue, on_fault: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch)]
    fn stop(this: &JsRunner) -> Result<(), JsValue>;
}

/// Builds [`JsEmulator`]s through the page's `createRunner(hex)` function.
pub struct JsEmulatorFactory {
    create_runner: Function,
    on_fault: Rc<dyn Fn()>,
}

impl JsEmulatorFactory {
    /// `on_fault` runs after a fault has been delivered to the session.
    pub fn new(create_runner: Function, on_fault: Rc<dyn Fn()>) -> Self {
        Self {
            create_runner,
            on_fault,
        }
    }
}

impl EmulatorFactory for JsEmulatorFactory {
    type Emulator = JsEmulator;

    fn load(&mut self, image: &BinaryImage) -> Result<JsEmulator, LoadError> {
        let runner = self
            .create_runner
            .call1(&JsValue::NULL, &JsValue::from_str(image.hex()))
            .map_err(|err| LoadError::new(describe_js_error(&err)))?;
        if !runner.is_object() {
            return Err(LoadError::new("runner factory did not return an object"));
        }
        debug!(bytes = image.data_len(), "runner created");
        Ok(JsEmulator {
            runner: runner.unchecked_into(),
            on_fault: Rc::clone(&self.on_fault),
        })
    }
}

/// One page-side runner driven through the [`Emulator`] contract.
pub struct JsEmulator {
    runner: JsRunner,
    on_fault: Rc<dyn Fn()>,
}

impl Emulator for JsEmulator {
    fn subscribe_port(&mut self, mut observer: PortObserver) {
        let callback =
            Closure::<dyn FnMut(f64)>::new(move |value: f64| observer(port_value(value)));
        if let Err(err) = self.runner.on_port_change(&callback.into_js_value()) {
            warn!(error = %describe_js_error(&err), "runner rejected port observer");
        }
    }

    fn subscribe_transmit(&mut self, mut observer: ByteObserver) {
        let callback = Closure::<dyn FnMut(f64)>::new(move |value: f64| {
            observer(transmitted_byte(value));
        });
        if let Err(err) = self.runner.on_byte_transmit(&callback.into_js_value()) {
            warn!(error = %describe_js_error(&err), "runner rejected transmit observer");
        }
    }

    fn run(&mut self, observer: RunObserver) {
        let observer = Rc::new(RefCell::new(observer));

        let tick_observer = Rc::clone(&observer);
        let on_tick = Closure::<dyn FnMut(f64, f64)>::new(move |cycles: f64, clock_hz: f64| {
            (tick_observer.borrow_mut())(RunEvent::Tick(TickReport {
                cycles: cycle_count(cycles),
                clock_hz,
            }));
        });

        let fault_observer = Rc::clone(&observer);
        let on_fault = Rc::clone(&self.on_fault);
        let deliver_fault = move |message: String| {
            (fault_observer.borrow_mut())(RunEvent::Fault(SessionFault::new(message)));
            on_fault();
        };
        let fault_sink = deliver_fault.clone();
        let on_fault_js = Closure::<dyn FnMut(JsValue)>::new(move |message: JsValue| {
            fault_sink(describe_js_error(&message));
        });

        if let Err(err) = self
            .runner
            .execute(&on_tick.into_js_value(), &on_fault_js.into_js_value())
        {
            deliver_fault(format!("runner failed to start: {}", describe_js_error(&err)));
        }
    }

    fn stop(&mut self) {
        if let Err(err) = self.runner.stop() {
            warn!(error = %describe_js_error(&err), "runner stop failed");
        }
    }
}

/// Converts a JS port value to the register bits it carries.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn port_value(value: f64) -> u32 {
    if value.is_finite() {
        value as i64 as u32
    } else {
        0
    }
}

/// Converts a JS byte value; only the low eight bits are kept.
#[allow(clippy::cast_possible_truncation)]
pub fn transmitted_byte(value: f64) -> u8 {
    port_value(value) as u8
}

/// Converts a JS cycle count; negative and non-finite counts read as zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn cycle_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}

/// Best-effort text for a thrown JS value.
pub fn describe_js_error(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    format!("{value:?}")
}
