//! Lifecycle controller integration coverage: compile outcomes, run/stop
//! control states, the single-session invariant and late-event discarding.

mod common;

use common::{fire_byte, fire_fault, fire_port, fire_tick, FakeFactory, Rig, BLINK_HEX};
use playground_core::{
    BuildResult, CompileOutcome, CompileTransportError, ControllerState, IndicatorId, RunRefused,
    SessionFault, COMPILING_STATUS,
};
use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

fn image_build(diagnostics: &str) -> BuildResult {
    BuildResult {
        binary_image: Some(BLINK_HEX.to_string()),
        diagnostic_text: diagnostics.to_string(),
    }
}

#[test]
fn new_controller_is_idle_with_run_enabled() {
    let rig = Rig::new();
    let ui = rig.ui.borrow();

    assert_eq!(rig.controller.state(), ControllerState::Idle);
    assert!(rig.controller.active_session().is_none());
    assert!(ui.run_enabled);
    assert!(!ui.stop_enabled);
}

#[test]
fn request_run_resets_indicators_and_disables_run() {
    let mut rig = Rig::new();
    rig.ui.borrow_mut().lit.insert(IndicatorId(1), true);

    let request = rig.controller.request_run("int x;").expect("idle controller accepts run");

    let ui = rig.ui.borrow();
    assert_eq!(request.source, "int x;");
    assert_eq!(rig.controller.state(), ControllerState::Compiling);
    assert_eq!(rig.controller.pending_compile(), Some(request.ticket));
    assert_eq!(ui.status, COMPILING_STATUS);
    assert!(!ui.run_enabled);
    assert!(!ui.stop_enabled);
    assert_eq!(ui.lit.len(), 3);
    assert!(ui.lit.values().all(|lit| !lit));
}

#[test]
fn successful_compile_starts_a_running_session() {
    let mut rig = Rig::new();
    let request = rig.controller.request_run("void setup() {}").expect("run accepted");

    let outcome = rig
        .controller
        .complete_compile(request.ticket, Ok(image_build("warning: unused variable")));

    let CompileOutcome::Started(id) = outcome else {
        panic!("expected a started session, got {outcome:?}");
    };
    assert_eq!(rig.controller.state(), ControllerState::Running);
    assert_eq!(rig.controller.active_session(), Some(id));

    let ui = rig.ui.borrow();
    assert!(ui.stop_enabled);
    assert!(!ui.run_enabled);
    assert_eq!(ui.status, "");
    assert!(!ui.streaming);
    assert_eq!(ui.console, "warning: unused variable\nProgram running...");

    let emulator = rig.emulator(0);
    assert!(emulator.borrow().running);
    assert_eq!(emulator.borrow().hex, BLINK_HEX);
}

#[test]
fn transport_failure_alerts_and_returns_to_idle() {
    let mut rig = Rig::new();
    let request = rig.controller.request_run("").expect("run accepted");

    let outcome = rig.controller.complete_compile(
        request.ticket,
        Err(CompileTransportError::new("TypeError: Failed to fetch")),
    );

    assert_eq!(outcome, CompileOutcome::TransportFailed);
    assert_eq!(rig.controller.state(), ControllerState::Idle);
    assert!(rig.controller.active_session().is_none());
    assert!(rig.emulators.borrow().is_empty());

    let ui = rig.ui.borrow();
    assert!(ui.run_enabled);
    assert!(!ui.stop_enabled);
    assert_eq!(ui.status, "");
    assert_eq!(ui.alerts, vec!["Failed: TypeError: Failed to fetch".to_string()]);
}

#[test]
fn build_without_image_shows_diagnostics_and_returns_to_idle() {
    let mut rig = Rig::new();
    rig.ui.borrow_mut().console = "old serial output".into();
    rig.ui.borrow_mut().streaming = true;
    let request = rig.controller.request_run("void loop( {").expect("run accepted");

    let outcome = rig.controller.complete_compile(
        request.ticket,
        Ok(BuildResult {
            binary_image: None,
            diagnostic_text: "sketch.ino:1:12: error: expected ')'".into(),
        }),
    );

    assert_eq!(outcome, CompileOutcome::DiagnosticFailure);
    assert_eq!(rig.controller.state(), ControllerState::Idle);
    assert!(rig.emulators.borrow().is_empty());

    let ui = rig.ui.borrow();
    assert!(ui.run_enabled);
    assert!(!ui.streaming);
    assert_eq!(ui.console, "sketch.ino:1:12: error: expected ')'");
    assert!(ui.alerts.is_empty());
}

#[rstest]
#[case(":10000000ZZ\n:00000001FF\n", "invalid binary image")]
#[case(":00000001FF\n", "contains no program data")]
fn unusable_image_is_reported_on_the_console(#[case] hex: &str, #[case] needle: &str) {
    let mut rig = Rig::new();
    let request = rig.controller.request_run("").expect("run accepted");

    let outcome = rig.controller.complete_compile(
        request.ticket,
        Ok(BuildResult {
            binary_image: Some(hex.into()),
            diagnostic_text: String::new(),
        }),
    );

    assert_eq!(outcome, CompileOutcome::LoadFailed);
    assert_eq!(rig.controller.state(), ControllerState::Idle);
    let ui = rig.ui.borrow();
    assert!(ui.console.contains(needle), "console was {:?}", ui.console);
    assert!(ui.run_enabled);
    assert!(!ui.stop_enabled);
}

#[test]
fn emulator_rejecting_the_image_is_a_load_failure() {
    let mut rig = Rig::with_factory(FakeFactory {
        reject_with: Some("flash too small".into()),
        ..FakeFactory::default()
    });
    let request = rig.controller.request_run("").expect("run accepted");

    let outcome = rig.controller.complete_compile(request.ticket, Ok(image_build("")));

    assert_eq!(outcome, CompileOutcome::LoadFailed);
    assert_eq!(rig.ui.borrow().console, "\nfailed to load program: flash too small");
    assert!(rig.controller.active_session().is_none());
}

#[test]
fn second_run_is_refused_while_compiling() {
    let mut rig = Rig::new();
    let first = rig.controller.request_run("a").expect("run accepted");

    let refused = rig.controller.request_run("b");

    assert_eq!(
        refused,
        Err(RunRefused::CompileInFlight {
            pending: first.ticket
        })
    );
    assert_eq!(rig.controller.pending_compile(), Some(first.ticket));
}

#[test]
fn stop_while_compiling_abandons_the_ticket() {
    let mut rig = Rig::new();
    let request = rig.controller.request_run("a").expect("run accepted");

    rig.controller.stop();
    assert_eq!(rig.controller.state(), ControllerState::Idle);
    assert!(rig.ui.borrow().run_enabled);
    assert_eq!(rig.ui.borrow().status, "");

    let late = rig.controller.complete_compile(request.ticket, Ok(image_build("")));
    assert_eq!(late, CompileOutcome::Ignored);
    assert!(rig.emulators.borrow().is_empty());
    assert_eq!(rig.controller.state(), ControllerState::Idle);
}

#[test]
fn superseded_ticket_is_ignored() {
    let mut rig = Rig::new();
    let old = rig.controller.request_run("a").expect("run accepted");
    rig.controller.stop();
    let current = rig.controller.request_run("b").expect("run accepted");
    assert_ne!(old.ticket, current.ticket);

    assert_eq!(
        rig.controller.complete_compile(old.ticket, Ok(image_build(""))),
        CompileOutcome::Ignored
    );
    assert_eq!(rig.controller.state(), ControllerState::Compiling);
    assert!(matches!(
        rig.controller.complete_compile(current.ticket, Ok(image_build(""))),
        CompileOutcome::Started(_)
    ));
}

#[test]
fn ticks_publish_simulation_time() {
    let mut rig = Rig::new();
    let emulator = rig.start("");

    fire_tick(&emulator, 16_000_000, 16_000_000.0);
    assert_eq!(rig.ui.borrow().status, "Simulation time: 00:01.000");

    fire_tick(&emulator, 24_000_000, 0.0);
    assert_eq!(rig.ui.borrow().status, "Simulation time: 00:01.500");
    assert_eq!(rig.controller.session_cycles(), Some(24_000_000));
}

#[test]
fn regressing_cycle_count_is_ignored() {
    let mut rig = Rig::new();
    let emulator = rig.start("");

    fire_tick(&emulator, 32_000_000, 16_000_000.0);
    fire_tick(&emulator, 16_000_000, 16_000_000.0);

    assert_eq!(rig.ui.borrow().status, "Simulation time: 00:02.000");
    assert_eq!(rig.controller.session_cycles(), Some(32_000_000));
}

#[test]
fn port_changes_drive_bound_indicators() {
    let mut rig = Rig::new();
    let emulator = rig.start("");

    fire_port(&emulator, 1 << 5);
    {
        let ui = rig.ui.borrow();
        assert!(ui.lit[&IndicatorId(0)]);
        assert!(!ui.lit[&IndicatorId(1)]);
        assert!(!ui.lit[&IndicatorId(2)]);
    }

    fire_port(&emulator, 0b0001_1000);
    let ui = rig.ui.borrow();
    assert!(!ui.lit[&IndicatorId(0)]);
    assert!(ui.lit[&IndicatorId(1)]);
    assert!(ui.lit[&IndicatorId(2)]);
}

#[test]
fn serial_bytes_replace_diagnostics_once_and_interleave_with_ports() {
    let mut rig = Rig::new();
    let emulator = rig.start("warning: x");
    assert_eq!(rig.ui.borrow().console, "warning: x\nProgram running...");

    fire_byte(&emulator, b'L');
    fire_port(&emulator, 1 << 3);
    fire_byte(&emulator, b'E');
    fire_tick(&emulator, 100, 16_000_000.0);
    fire_byte(&emulator, b'D');

    let ui = rig.ui.borrow();
    assert_eq!(ui.console, "LED");
    assert!(ui.streaming);
    assert_eq!(ui.streaming_marks, 1);
    assert!(ui.lit[&IndicatorId(2)]);
}

#[test]
fn stop_tears_down_and_silences_the_session() {
    let mut rig = Rig::new();
    let emulator = rig.start("");
    fire_byte(&emulator, b'A');

    rig.controller.stop();

    assert_eq!(rig.controller.state(), ControllerState::Stopped);
    assert!(rig.controller.active_session().is_none());
    assert_eq!(emulator.borrow().stop_calls, 1);
    assert!(!emulator.borrow().running);
    {
        let ui = rig.ui.borrow();
        assert!(ui.run_enabled);
        assert!(!ui.stop_enabled);
    }

    let before = rig.ui.borrow().writes;
    fire_port(&emulator, u32::MAX);
    fire_byte(&emulator, b'B');
    fire_tick(&emulator, 99_000_000, 16_000_000.0);
    fire_fault(&emulator, "late");

    let ui = rig.ui.borrow();
    assert_eq!(ui.writes, before);
    assert_eq!(ui.console, "A");
    assert!(ui.run_enabled);
    assert!(!ui.stop_enabled);
}

#[test]
fn repeated_stop_calls_emulator_stop_once() {
    let mut rig = Rig::new();
    let emulator = rig.start("");

    rig.controller.stop();
    rig.controller.stop();

    assert_eq!(emulator.borrow().stop_calls, 1);
    assert_eq!(rig.controller.state(), ControllerState::Stopped);
}

#[test]
fn new_run_replaces_the_active_session() {
    let mut rig = Rig::new();
    let first = rig.start("");
    let first_id = rig.controller.active_session().expect("first session");

    let second = rig.start("");
    let second_id = rig.controller.active_session().expect("second session");

    assert_ne!(first_id, second_id);
    assert_eq!(first.borrow().stop_calls, 1);
    assert!(!first.borrow().running);
    assert!(second.borrow().running);

    fire_port(&second, 1 << 4);
    fire_port(&first, 1 << 5);
    fire_byte(&first, b'X');

    let ui = rig.ui.borrow();
    assert!(!ui.lit[&IndicatorId(0)]);
    assert!(ui.lit[&IndicatorId(1)]);
    assert!(!ui.console.contains('X'));
}

#[test]
fn fault_surfaces_terminal_status_and_poll_releases_the_session() {
    let mut rig = Rig::new();
    let emulator = rig.start("");
    fire_tick(&emulator, 8_000_000, 16_000_000.0);

    fire_fault(&emulator, "illegal opcode at 0x0104");

    assert_eq!(rig.controller.state(), ControllerState::Stopped);
    {
        let ui = rig.ui.borrow();
        assert_eq!(
            ui.status,
            "Simulation time: 00:00.500 (stopped: illegal opcode at 0x0104)"
        );
        assert!(ui.run_enabled);
        assert!(!ui.stop_enabled);
    }

    let before = rig.ui.borrow().writes;
    fire_tick(&emulator, 9_000_000, 16_000_000.0);
    fire_byte(&emulator, b'Z');
    assert_eq!(rig.ui.borrow().writes, before);

    assert_eq!(
        rig.controller.poll(),
        Some(SessionFault::new("illegal opcode at 0x0104"))
    );
    assert_eq!(emulator.borrow().stop_calls, 1);
    assert!(rig.controller.active_session().is_none());
    assert_eq!(rig.controller.poll(), None);
    assert_eq!(rig.controller.state(), ControllerState::Stopped);
}

#[test]
fn poll_is_a_no_op_for_a_healthy_session() {
    let mut rig = Rig::new();
    let emulator = rig.start("");

    assert_eq!(rig.controller.poll(), None);
    assert_eq!(rig.controller.state(), ControllerState::Running);
    assert_eq!(emulator.borrow().stop_calls, 0);
}

#[test]
fn run_after_fault_releases_the_faulted_session_first() {
    let mut rig = Rig::new();
    let faulted = rig.start("");
    fire_fault(&faulted, "watchdog");

    let fresh = rig.start("");

    assert_eq!(faulted.borrow().stop_calls, 1);
    assert!(fresh.borrow().running);
    assert_eq!(rig.controller.state(), ControllerState::Running);
}

#[test]
fn dropping_the_controller_stops_the_emulator() {
    let mut rig = Rig::new();
    let emulator = rig.start("");

    drop(rig.controller);

    assert_eq!(emulator.borrow().stop_calls, 1);
}
