//! Page wiring options for the playground front end.

use playground_core::SessionConfig;
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

/// Page wiring and controller settings passed to `Playground::new`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlaygroundOptions {
    /// Selector matching every LED element, in binding order.
    pub led_selector: String,
    /// Attribute holding an LED's pin number.
    pub pin_attribute: String,
    /// Element that shows the session status line.
    pub status_selector: String,
    /// Element that holds compiler diagnostics and serial output.
    pub console_selector: String,
    /// Button that compiles and starts a session.
    pub run_button_selector: String,
    /// Button that stops the running session.
    pub stop_button_selector: String,
    /// Console text colour while serial output is streaming.
    pub streaming_color: String,
    /// `EnvFilter` directives for the console logger.
    pub log_filter: String,
    /// Clock and port window used for every session.
    pub session: SessionConfig,
}

impl Default for PlaygroundOptions {
    fn default() -> Self {
        Self {
            led_selector: "wokwi-led[pin]".to_string(),
            pin_attribute: "pin".to_string(),
            status_selector: "#status-label".to_string(),
            console_selector: "#compiler-output-text".to_string(),
            run_button_selector: "#run-button".to_string(),
            stop_button_selector: "#stop-button".to_string(),
            streaming_color: "blue".to_string(),
            log_filter: "info".to_string(),
            session: SessionConfig::default(),
        }
    }
}

impl PlaygroundOptions {
    /// Reads options from a JS object; `undefined` and `null` mean defaults.
    pub fn from_js(value: JsValue) -> Result<Self, JsValue> {
        if value.is_undefined() || value.is_null() {
            return Ok(Self::default());
        }
        serde_wasm_bindgen::from_value(value)
            .map_err(|err| JsValue::from_str(&format!("invalid playground options: {err}")))
    }
}
