//! Fake collaborators shared by the integration suites.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use playground_core::{
    BinaryImage, ByteObserver, Console, Emulator, EmulatorFactory, Frontend, IndicatorId,
    Indicators, LoadError, PinBinding, PinBindingTable, PortLayout, PortObserver, RunEvent,
    RunObserver, SessionConfig, SessionController, SessionFault, TickReport,
};

/// Minimal valid image: one 16-byte data record plus EOF.
pub const BLINK_HEX: &str = ":100000000C9434000C944E000C944E000C944E0052\n:00000001FF\n";

/// Observers and call counts captured from one fake emulator.
#[derive(Default)]
pub struct Wiring {
    pub hex: String,
    pub port: Option<PortObserver>,
    pub transmit: Option<ByteObserver>,
    pub run: Option<RunObserver>,
    pub running: bool,
    pub stop_calls: u32,
}

pub type Handle = Rc<RefCell<Wiring>>;

pub fn fire_port(handle: &Handle, value: u32) {
    let mut wiring = handle.borrow_mut();
    let observer = wiring.port.as_mut().expect("port observer registered");
    observer(value);
}

pub fn fire_byte(handle: &Handle, byte: u8) {
    let mut wiring = handle.borrow_mut();
    let observer = wiring.transmit.as_mut().expect("transmit observer registered");
    observer(byte);
}

pub fn fire_run(handle: &Handle, event: RunEvent) {
    let mut wiring = handle.borrow_mut();
    let observer = wiring.run.as_mut().expect("run loop started");
    observer(event);
}

pub fn fire_tick(handle: &Handle, cycles: u64, clock_hz: f64) {
    fire_run(handle, RunEvent::Tick(TickReport { cycles, clock_hz }));
}

pub fn fire_fault(handle: &Handle, message: &str) {
    fire_run(handle, RunEvent::Fault(SessionFault::new(message)));
}

pub struct FakeEmulator {
    wiring: Handle,
}

impl Emulator for FakeEmulator {
    fn subscribe_port(&mut self, observer: PortObserver) {
        self.wiring.borrow_mut().port = Some(observer);
    }

    fn subscribe_transmit(&mut self, observer: ByteObserver) {
        self.wiring.borrow_mut().transmit = Some(observer);
    }

    fn run(&mut self, observer: RunObserver) {
        let mut wiring = self.wiring.borrow_mut();
        wiring.run = Some(observer);
        wiring.running = true;
    }

    fn stop(&mut self) {
        let mut wiring = self.wiring.borrow_mut();
        wiring.running = false;
        wiring.stop_calls += 1;
    }
}

#[derive(Default)]
pub struct FakeFactory {
    pub created: Rc<RefCell<Vec<Handle>>>,
    pub reject_with: Option<String>,
}

impl EmulatorFactory for FakeFactory {
    type Emulator = FakeEmulator;

    fn load(&mut self, image: &BinaryImage) -> Result<FakeEmulator, LoadError> {
        if let Some(message) = &self.reject_with {
            return Err(LoadError::new(message.clone()));
        }
        let wiring = Rc::new(RefCell::new(Wiring {
            hex: image.hex().to_string(),
            ..Wiring::default()
        }));
        self.created.borrow_mut().push(Rc::clone(&wiring));
        Ok(FakeEmulator { wiring })
    }
}

/// Frontend that records every surface write.
#[derive(Debug, Default)]
pub struct RecordingFrontend {
    pub lit: BTreeMap<IndicatorId, bool>,
    pub console: String,
    pub streaming: bool,
    pub streaming_marks: usize,
    pub status: String,
    pub run_enabled: bool,
    pub stop_enabled: bool,
    pub alerts: Vec<String>,
    pub writes: usize,
}

impl Indicators for RecordingFrontend {
    fn set_lit(&mut self, indicator: IndicatorId, lit: bool) {
        self.writes += 1;
        self.lit.insert(indicator, lit);
    }
}

impl Console for RecordingFrontend {
    fn replace_text(&mut self, text: &str) {
        self.writes += 1;
        self.console = text.to_string();
    }

    fn append_text(&mut self, text: &str) {
        self.writes += 1;
        self.console.push_str(text);
    }

    fn set_streaming(&mut self, streaming: bool) {
        self.writes += 1;
        if streaming {
            self.streaming_marks += 1;
        }
        self.streaming = streaming;
    }
}

impl Frontend for RecordingFrontend {
    fn set_status(&mut self, text: &str) {
        self.writes += 1;
        self.status = text.to_string();
    }

    fn set_run_enabled(&mut self, enabled: bool) {
        self.run_enabled = enabled;
    }

    fn set_stop_enabled(&mut self, enabled: bool) {
        self.stop_enabled = enabled;
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }
}

/// LEDs on pins 13, 12 and 11, as indicators 0, 1 and 2.
pub fn uno_leds() -> PinBindingTable {
    PinBindingTable::new(
        PortLayout::default(),
        [13, 12, 11]
            .into_iter()
            .enumerate()
            .map(|(index, pin)| PinBinding {
                indicator: IndicatorId(index),
                pin,
            }),
    )
    .expect("pins 11..=13 sit on PORTB")
}

pub struct Rig {
    pub controller: SessionController<FakeFactory, RecordingFrontend>,
    pub ui: Rc<RefCell<RecordingFrontend>>,
    pub emulators: Rc<RefCell<Vec<Handle>>>,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_factory(FakeFactory::default())
    }

    pub fn with_factory(factory: FakeFactory) -> Self {
        let emulators = Rc::clone(&factory.created);
        let ui = Rc::new(RefCell::new(RecordingFrontend::default()));
        let controller =
            SessionController::new(SessionConfig::default(), uno_leds(), factory, Rc::clone(&ui));
        Self {
            controller,
            ui,
            emulators,
        }
    }

    pub fn emulator(&self, index: usize) -> Handle {
        Rc::clone(&self.emulators.borrow()[index])
    }

    /// Runs `source` through a successful compile and returns its emulator.
    pub fn start(&mut self, diagnostics: &str) -> Handle {
        let request = self.controller.request_run("void loop() {}").expect("run accepted");
        let outcome = self.controller.complete_compile(
            request.ticket,
            Ok(playground_core::BuildResult {
                binary_image: Some(BLINK_HEX.to_string()),
                diagnostic_text: diagnostics.to_string(),
            }),
        );
        assert!(matches!(outcome, playground_core::CompileOutcome::Started(_)));
        let last = self.emulators.borrow().len() - 1;
        self.emulator(last)
    }
}
