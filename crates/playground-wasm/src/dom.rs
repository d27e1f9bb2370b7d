//! DOM-backed UI surfaces.

use js_sys::Reflect;
use playground_core::{
    BindingError, Console, Frontend, IndicatorId, Indicators, PinBindingTable, PortLayout,
};
use tracing::warn;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement, Window};

use crate::options::PlaygroundOptions;

/// Drives LEDs, the console, the status line and the run/stop buttons.
///
/// Missing optional surfaces are skipped; LEDs are looked up once.
pub struct DomFrontend {
    window: Window,
    leds: Vec<Element>,
    status: Option<Element>,
    console: Option<HtmlElement>,
    run_button: Option<Element>,
    stop_button: Option<Element>,
    streaming_color: String,
}

impl DomFrontend {
    /// Finds every surface named in `options` and builds the pin table.
    pub fn discover(
        window: Window,
        options: &PlaygroundOptions,
    ) -> Result<(Self, PinBindingTable), JsValue> {
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("window has no document"))?;

        let nodes = document.query_selector_all(&options.led_selector)?;
        let mut leds = Vec::new();
        let mut pins = Vec::new();
        for index in 0..nodes.length() {
            let Some(led) = nodes.item(index).and_then(|node| node.dyn_into::<Element>().ok())
            else {
                continue;
            };
            pins.push(led.get_attribute(&options.pin_attribute).unwrap_or_default());
            leds.push(led);
        }
        let table = bind_pins(options.session.port, &pins)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;

        let frontend = Self {
            status: find(&document, &options.status_selector)?,
            console: find(&document, &options.console_selector)?
                .and_then(|element| element.dyn_into::<HtmlElement>().ok()),
            run_button: find(&document, &options.run_button_selector)?,
            stop_button: find(&document, &options.stop_button_selector)?,
            streaming_color: options.streaming_color.clone(),
            window,
            leds,
        };
        Ok((frontend, table))
    }

    /// The run and stop buttons, when present.
    pub fn buttons(&self) -> (Option<Element>, Option<Element>) {
        (self.run_button.clone(), self.stop_button.clone())
    }
}

fn find(document: &Document, selector: &str) -> Result<Option<Element>, JsValue> {
    let element = document.query_selector(selector)?;
    if element.is_none() {
        warn!(selector, "surface not found; updates will be skipped");
    }
    Ok(element)
}

/// Binds LED `n` (in document order) to the pin named by its attribute.
pub fn bind_pins(layout: PortLayout, pins: &[String]) -> Result<PinBindingTable, BindingError> {
    PinBindingTable::from_attributes(
        layout,
        pins.iter()
            .enumerate()
            .map(|(index, pin)| (IndicatorId(index), pin.as_str())),
    )
}

fn set_disabled(button: Option<&Element>, disabled: bool) {
    let Some(button) = button else {
        return;
    };
    let result = if disabled {
        button.set_attribute("disabled", "")
    } else {
        button.remove_attribute("disabled")
    };
    if let Err(err) = result {
        warn!(error = ?err, "could not toggle button");
    }
}

impl Indicators for DomFrontend {
    fn set_lit(&mut self, indicator: IndicatorId, lit: bool) {
        let Some(led) = self.leds.get(indicator.0) else {
            warn!(%indicator, "no element for indicator");
            return;
        };
        if let Err(err) = Reflect::set(led, &JsValue::from_str("value"), &JsValue::from_bool(lit)) {
            warn!(%indicator, error = ?err, "could not set LED value");
        }
    }
}

impl Console for DomFrontend {
    fn replace_text(&mut self, text: &str) {
        if let Some(console) = &self.console {
            console.set_text_content(Some(text));
        }
    }

    fn append_text(&mut self, text: &str) {
        if let Some(console) = &self.console {
            let mut content = console.text_content().unwrap_or_default();
            content.push_str(text);
            console.set_text_content(Some(&content));
        }
    }

    fn set_streaming(&mut self, streaming: bool) {
        let Some(console) = &self.console else {
            return;
        };
        let style = console.style();
        let result = if streaming {
            style.set_property("color", &self.streaming_color)
        } else {
            style.remove_property("color").map(drop)
        };
        if let Err(err) = result {
            warn!(error = ?err, "could not restyle console");
        }
    }
}

impl Frontend for DomFrontend {
    fn set_status(&mut self, text: &str) {
        if let Some(status) = &self.status {
            status.set_text_content(Some(text));
        }
    }

    fn set_run_enabled(&mut self, enabled: bool) {
        set_disabled(self.run_button.as_ref(), !enabled);
    }

    fn set_stop_enabled(&mut self, enabled: bool) {
        set_disabled(self.stop_button.as_ref(), !enabled);
    }

    fn alert(&mut self, message: &str) {
        if let Err(err) = self.window.alert_with_message(message) {
            warn!(error = ?err, message, "alert failed");
        }
    }
}
