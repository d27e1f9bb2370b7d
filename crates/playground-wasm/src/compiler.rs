//! Bridge to the page's asynchronous `compile(source)` function.

use std::cell::Cell;
use std::rc::Rc;

use js_sys::{Function, Promise};
use playground_core::{BuildResult, CompileResponse, CompileTransportError};
use wasm_bindgen::prelude::*;

use crate::runner::describe_js_error;

/// Result handed back to the controller for one compile.
pub type CompileResult = Result<BuildResult, CompileTransportError>;

/// Promise reactions for one compile, kept alive until the promise settles.
pub struct PendingCompile {
    settled: Rc<Cell<bool>>,
    _on_resolve: Closure<dyn FnMut(JsValue)>,
    _on_reject: Closure<dyn FnMut(JsValue)>,
}

impl PendingCompile {
    /// `true` once either reaction has run.
    pub fn is_settled(&self) -> bool {
        self.settled.get()
    }
}

/// Calls `compile(source)` and routes its settlement to `done`.
///
/// A synchronous throw or a non-promise return is settled immediately.
pub fn start(
    compile: &Function,
    source: &str,
    done: impl FnOnce(CompileResult) + 'static,
) -> Option<PendingCompile> {
    let promise = match compile.call1(&JsValue::NULL, &JsValue::from_str(source)) {
        Ok(value) => Promise::resolve(&value),
        Err(err) => {
            done(Err(transport_error(&err)));
            return None;
        }
    };

    let settled = Rc::new(Cell::new(false));
    let done = Rc::new(Cell::new(Some(done)));

    let resolve_done = Rc::clone(&done);
    let resolve_settled = Rc::clone(&settled);
    let on_resolve = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
        resolve_settled.set(true);
        if let Some(done) = resolve_done.take() {
            done(decode_response(value));
        }
    });

    let reject_settled = Rc::clone(&settled);
    let on_reject = Closure::<dyn FnMut(JsValue)>::new(move |err: JsValue| {
        reject_settled.set(true);
        if let Some(done) = done.take() {
            done(Err(transport_error(&err)));
        }
    });

    let _ = promise.then2(&on_resolve, &on_reject);
    Some(PendingCompile {
        settled,
        _on_resolve: on_resolve,
        _on_reject: on_reject,
    })
}

/// Decodes a compile service body into a build result.
pub fn decode_response(value: JsValue) -> CompileResult {
    serde_wasm_bindgen::from_value::<CompileResponse>(value)
        .map(BuildResult::from)
        .map_err(|err| CompileTransportError::new(format!("malformed compile response: {err}")))
}

fn transport_error(err: &JsValue) -> CompileTransportError {
    CompileTransportError::new(describe_js_error(err))
}
