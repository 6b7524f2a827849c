//! Startup failures and shutdown: every line and listener released exactly
//! once, whatever ends the run.

use std::time::{Duration, Instant};

use crate::mock_hw::*;
use shoutshoot::adapters::time::MonotonicClock;
use shoutshoot::app::commands::Trigger;
use shoutshoot::app::events::AppEvent;
use shoutshoot::drivers::launcher::IgnoreReason;
use shoutshoot::error::{ConfigurationError, Error, ListenerError};
use shoutshoot::pins::PinRole;
use shoutshoot::{ControlLoop, LoopStatus, RunState, ShutdownCause};

fn assert_all_released_once(bank: &MockBank) {
    for line in ALL_LINES {
        assert_eq!(bank.opened(line), 1, "GPIO {line} opened");
        assert_eq!(bank.released(line), 1, "GPIO {line} released");
    }
}

// ── Shutdown ──────────────────────────────────────────────────

#[test]
fn shutdown_button_tears_everything_down() {
    let mut rig = Rig::new(1);
    rig.spotters[0].detect();
    rig.await_listener();

    let status = rig.press(SHUTDOWN, 10);
    let LoopStatus::Finished(report) = status else {
        panic!("loop still running after shutdown");
    };

    assert_eq!(report.cause, ShutdownCause::Button);
    assert!(report.cause.requests_power_off());
    assert_eq!(report.pulses_fired, 0);
    assert_eq!(report.ports_released, 6);
    assert_eq!(report.listeners_closed, 1);

    // The wake word that arrived in the same tick lost to shutdown.
    assert!(!rig.bank.ever_high(RELAY));
    assert!(rig.sink.events.contains(&AppEvent::FireIgnored {
        trigger: Trigger::Voice { source: 0 },
        reason: IgnoreReason::ShuttingDown,
    }));

    for led in [LED_FIRING, LED_LISTENING, LED_RUNNING] {
        assert!(!rig.bank.level(led), "GPIO {led} left high");
    }
    assert_all_released_once(&rig.bank);
    assert_eq!(rig.spotters[0].closes(), 1);
    assert_eq!(rig.control.run_state(), RunState::ShuttingDown);
}

#[test]
fn shutdown_mid_pulse_lets_the_pulse_finish() {
    let mut rig = Rig::new(1);
    rig.press(FIRE, 10);
    rig.release(FIRE, 20);

    assert_eq!(rig.press(SHUTDOWN, 100), LoopStatus::Continue);
    assert!(rig.bank.level(RELAY), "in-flight pulse cut short");
    assert_eq!(rig.bank.released(RELAY), 0);

    // Requests during the wind-down are dropped.
    rig.spotters[0].detect();
    rig.control.wait(Duration::from_millis(50));
    rig.press(FIRE, 300);
    assert_eq!(rig.control.pulses_fired(), 1);

    let LoopStatus::Finished(report) = rig.step(510) else {
        panic!("teardown did not follow the pulse");
    };
    assert_eq!(report.pulses_fired, 1);
    // Closed once, opened by the pulse timer, driven low again on release.
    assert_eq!(rig.bank.writes(RELAY), vec![true, false, false]);
    assert!(rig.sink.events.iter().any(|e| matches!(e, AppEvent::PulseComplete(_))));
    assert_all_released_once(&rig.bank);
}

#[test]
fn teardown_runs_once() {
    let mut rig = Rig::new(2);
    let LoopStatus::Finished(first) = rig.press(SHUTDOWN, 10) else {
        panic!("loop still running");
    };

    assert_eq!(rig.step(20), LoopStatus::Finished(first));
    assert_eq!(rig.control.teardown(&mut rig.sink), first);
    rig.press(FIRE, 100);

    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::Stopped(_))), 1);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, AppEvent::ShutdownRequested(_))),
        1
    );
    assert_all_released_once(&rig.bank);
    for spotter in &rig.spotters {
        assert_eq!(spotter.closes(), 1);
    }
    assert_eq!(first.listeners_closed, 2);
}

#[test]
fn first_shutdown_cause_is_kept() {
    let mut rig = Rig::new(1);
    rig.press(FIRE, 10);
    rig.press(SHUTDOWN, 20);
    rig.bank.break_line(FIRE);
    let LoopStatus::Finished(report) = rig.step(510) else {
        panic!("loop still running");
    };
    assert_eq!(report.cause, ShutdownCause::Button);
}

#[test]
fn lost_listener_is_still_closed_exactly_once() {
    let mut rig = Rig::new(1);
    rig.spotters[0].fail(ListenerError::Engine("crashed".into()));
    rig.await_listener();
    rig.step(10);

    let LoopStatus::Finished(report) = rig.press(SHUTDOWN, 20) else {
        panic!("loop still running");
    };
    assert_eq!(report.listeners_closed, 1);
    assert_eq!(rig.spotters[0].closes(), 1);
}

#[test]
fn dropping_the_loop_releases_lines() {
    let rig = Rig::new(1);
    let bank = rig.bank.clone();
    let spotter = rig.spotters[0].clone();
    drop(rig);
    assert_all_released_once(&bank);
    assert!(!bank.level(RELAY));

    // The listener thread notices the stop flag on its next window.
    let deadline = Instant::now() + Duration::from_secs(2);
    while spotter.closes() == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(spotter.closes(), 1);
}

// ── Startup failures ──────────────────────────────────────────

#[test]
fn credential_failure_aborts_before_running() {
    let mut bank = MockBank::new();
    let err = ControlLoop::init(
        &test_config(),
        &mut bank,
        vec![failing(ListenerError::Credentials("invalid AccessKey".into()))],
    )
    .err()
    .expect("init succeeded with bad credentials");

    assert!(matches!(
        err,
        Error::ListenerStartup(ListenerError::Credentials(_))
    ));
    assert!(!bank.ever_high(LED_RUNNING));
    assert_all_released_once(&bank);
}

#[test]
fn partial_listener_startup_is_unwound() {
    let mut bank = MockBank::new();
    let (ok, handle) = scripted("mic-0");
    let err = ControlLoop::init(
        &test_config(),
        &mut bank,
        vec![ok, failing(ListenerError::AudioDevice("busy".into()))],
    )
    .err()
    .expect("init succeeded with a failing device");

    assert!(matches!(
        err,
        Error::ListenerStartup(ListenerError::AudioDevice(_))
    ));
    assert_eq!(handle.closes(), 1);
    assert_all_released_once(&bank);
}

#[test]
fn no_input_devices_is_a_startup_error() {
    let mut bank = MockBank::new();
    let err = ControlLoop::init(&test_config(), &mut bank, Vec::new())
        .err()
        .expect("init succeeded without listeners");
    assert!(matches!(
        err,
        Error::ListenerStartup(ListenerError::NoInputDevices)
    ));
}

#[test]
fn duplicate_line_is_rejected() {
    let mut config = test_config();
    config.pins.led_firing = config.pins.relay;
    let mut bank = MockBank::new();
    let (factory, _handle) = scripted("mic");

    let err = ControlLoop::init(&config, &mut bank, vec![factory])
        .err()
        .expect("duplicate line accepted");
    assert!(matches!(
        err,
        Error::Configuration(ConfigurationError::LineAlreadyBound { .. })
    ));
    assert_eq!(bank.opened(RELAY), 0);
}

#[test]
fn unavailable_line_releases_what_was_opened() {
    let mut bank = MockBank::new();
    bank.refuse(SHUTDOWN);
    let (factory, handle) = scripted("mic");

    let err = ControlLoop::init(&test_config(), &mut bank, vec![factory])
        .err()
        .expect("refused line accepted");
    assert!(matches!(
        err,
        Error::Configuration(ConfigurationError::LineUnavailable {
            role: PinRole::ShutdownButton,
            ..
        })
    ));
    for line in [RELAY, LED_RUNNING, LED_LISTENING, LED_FIRING] {
        assert_eq!(bank.released(line), 1, "GPIO {line}");
    }
    // Lines come up before any listener is started.
    assert_eq!(handle.closes(), 0);
}

// ── Real-time run ─────────────────────────────────────────────

#[test]
fn run_fires_and_stops_in_real_time() {
    let mut config = test_config();
    config.timing.pulse_duration_ms = 60;
    let mut bank = MockBank::new();
    let (factory, handle) = scripted("mic");
    let control = ControlLoop::init(&config, &mut bank, vec![factory]).unwrap();

    let operator = {
        let bank = bank.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            handle.detect();
            std::thread::sleep(Duration::from_millis(200));
            bank.press(FIRE);
            std::thread::sleep(Duration::from_millis(30));
            bank.release_button(FIRE);
            std::thread::sleep(Duration::from_millis(200));
            bank.press(SHUTDOWN);
            handle
        })
    };

    let mut sink = CollectSink::new();
    let report = control.run(&MonotonicClock::new(), &mut sink);
    let handle = operator.join().unwrap();

    assert_eq!(report.cause, ShutdownCause::Button);
    assert_eq!(report.pulses_fired, 2);
    assert_eq!(bank.writes(RELAY), vec![true, false, true, false, false]);
    assert_eq!(handle.closes(), 1);
    assert_all_released_once(&bank);
    assert!(matches!(sink.events.first(), Some(AppEvent::Started { listeners: 1 })));
    assert!(matches!(sink.events.last(), Some(AppEvent::Stopped(_))));
}
