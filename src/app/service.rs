//! Control loop: the single-threaded coordinator.
//!
//! [`ControlLoop`] owns every port, the launch actuator and the listener
//! handles. It is the only writer of [`RunState`]. All I/O flows through
//! port traits, so the whole loop runs against mock pins and scripted
//! spotters in tests.
//!
//! ```text
//!  shutdown button ──┐
//!  fire button ──────┤   ┌──────────────┐ ──▶ relay
//!                    ├──▶│ ControlLoop  │ ──▶ LEDs
//!  listener threads ─┘   └──────────────┘ ──▶ EventSink
//!      (channel)
//! ```
//!
//! Each [`step`](ControlLoop::step) is pure with respect to time: the caller
//! passes `now_ms`, so tests drive the loop with synthetic time.

use std::collections::VecDeque;
use std::time::Duration;

use crossbeam_channel::{Receiver, select, unbounded};
use embedded_hal::digital::{InputPin, OutputPin};
use log::{debug, error, info, warn};

use crate::config::{ControllerConfig, TimingConfig};
use crate::drivers::launcher::{FireOutcome, FiringState, LaunchActuator};
use crate::drivers::port::{InputPort, PinRegistry};
use crate::drivers::status_led::{IndicatorLevels, StatusIndicators};
use crate::error::{HardwareFault, ListenerError};
use crate::listener::{ListenerMessage, SpotterFactory, WakeWordListener};
use crate::pins::PinRole;

use super::commands::Trigger;
use super::events::AppEvent;
use super::ports::{Clock, EventSink, PinBank};
use super::state::{LoopStatus, RunState, ShutdownCause, ShutdownReport};

// ───────────────────────────────────────────────────────────────
// ControlLoop
// ───────────────────────────────────────────────────────────────

pub struct ControlLoop<I: InputPin, O: OutputPin> {
    timing: TimingConfig,
    shutdown_button: InputPort<I>,
    fire_button: InputPort<I>,
    launcher: LaunchActuator<O>,
    indicators: StatusIndicators<O>,
    listeners: Vec<WakeWordListener>,
    rx: Receiver<ListenerMessage>,
    /// Messages taken off the channel by [`wait`](Self::wait).
    pending: VecDeque<ListenerMessage>,
    run_state: RunState,
    live_listeners: usize,
    shutdown_cause: Option<ShutdownCause>,
    report: Option<ShutdownReport>,
}

impl<I: InputPin, O: OutputPin> ControlLoop<I, O> {
    /// Bind every line and start one listener per factory.
    ///
    /// Any failure aborts before the loop exists; lines and listeners opened
    /// up to that point are released on the way out. No indicator is driven
    /// high here.
    pub fn init<B>(
        config: &ControllerConfig,
        bank: &mut B,
        factories: Vec<SpotterFactory>,
    ) -> crate::error::Result<Self>
    where
        B: PinBank<Input = I, Output = O>,
    {
        config.validate()?;
        let timing = config.timing;
        let pins = &config.pins;
        let mut registry = PinRegistry::new();

        // Relay first: held open before anything else is touched.
        let relay = registry.configure_output(bank, pins.relay, PinRole::Relay)?;
        let led_running = registry.configure_output(bank, pins.led_running, PinRole::RunningLed)?;
        let led_listening =
            registry.configure_output(bank, pins.led_listening, PinRole::ListeningLed)?;
        let led_firing = registry.configure_output(bank, pins.led_firing, PinRole::FiringLed)?;
        let shutdown_button = registry.configure_input(
            bank,
            pins.shutdown_button,
            PinRole::ShutdownButton,
            config.buttons_active_low,
            timing.debounce_window_ms,
        )?;
        let fire_button = registry.configure_input(
            bank,
            pins.manual_fire_button,
            PinRole::ManualFireButton,
            config.buttons_active_low,
            timing.debounce_window_ms,
        )?;
        info!("{} GPIO lines bound", registry.len());

        if factories.is_empty() {
            return Err(ListenerError::NoInputDevices.into());
        }
        let (tx, rx) = unbounded();
        let mut listeners: Vec<WakeWordListener> = Vec::with_capacity(factories.len());
        for (id, factory) in factories.into_iter().enumerate() {
            match WakeWordListener::spawn(id, factory, tx.clone()) {
                Ok(listener) => listeners.push(listener),
                Err(e) => {
                    error!("Listener {id} failed to start: {e}");
                    stop_all(&mut listeners, &timing);
                    return Err(e.into());
                }
            }
        }
        let live_listeners = listeners.len();

        Ok(Self {
            timing,
            shutdown_button,
            fire_button,
            launcher: LaunchActuator::new(relay, &timing),
            indicators: StatusIndicators::new(led_running, led_listening, led_firing),
            listeners,
            rx,
            pending: VecDeque::new(),
            run_state: RunState::Running,
            live_listeners,
            shutdown_cause: None,
            report: None,
        })
    }

    /// Enter Running: running indicator on, listening indicator on while a
    /// listener is alive.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.indicate(sink, |ind| ind.set_running(true));
        let listening = self.live_listeners > 0;
        self.indicate(sink, |ind| ind.set_listening(listening));
        info!(
            "Ready: {} listener(s), pulse {} ms",
            self.live_listeners, self.timing.pulse_duration_ms
        );
        sink.emit(&AppEvent::Started {
            listeners: self.live_listeners,
        });
    }

    /// One coordinator tick at `now_ms`.
    ///
    /// Order within a tick: buttons, listener messages, fire requests, then
    /// the pulse timer. A shutdown edge is applied before any fire request of
    /// the same tick, so shutdown wins. Requests collected while a pulse is
    /// in flight are answered before the timer can end it, so they are
    /// ignored rather than starting a back-to-back pulse. Once shutting down and the relay is
    /// open, teardown runs and the loop is finished.
    pub fn step(&mut self, now_ms: u64, sink: &mut impl EventSink) -> LoopStatus {
        if let Some(report) = self.report {
            return LoopStatus::Finished(report);
        }
        let mut triggers: Vec<Trigger> = Vec::new();

        match self.shutdown_button.poll(now_ms) {
            Ok(true) => {
                info!("Shutdown button pressed");
                self.begin_shutdown(ShutdownCause::Button, sink);
            }
            Ok(false) => {}
            Err(fault) => self.hardware_fault(fault, sink),
        }
        match self.fire_button.poll(now_ms) {
            Ok(true) => triggers.push(Trigger::Button),
            Ok(false) => {}
            Err(fault) => self.hardware_fault(fault, sink),
        }

        self.pending.extend(self.rx.try_iter());
        while let Some(msg) = self.pending.pop_front() {
            match msg {
                ListenerMessage::Detected { source } => triggers.push(Trigger::Voice { source }),
                ListenerMessage::Lost {
                    source,
                    name,
                    error,
                } => self.listener_lost(source, name, error, sink),
            }
        }

        for trigger in triggers {
            self.request_fire(trigger, now_ms, sink);
        }

        match self.launcher.tick(now_ms) {
            Ok(Some(pulse)) => {
                self.indicate(sink, |ind| ind.set_firing(false));
                sink.emit(&AppEvent::PulseComplete(pulse));
            }
            Ok(None) => {}
            Err(fault) => {
                self.indicate(sink, |ind| ind.set_firing(false));
                self.hardware_fault(fault, sink);
            }
        }

        if self.run_state == RunState::ShuttingDown && !self.launcher.is_firing() {
            return LoopStatus::Finished(self.teardown(sink));
        }
        LoopStatus::Continue
    }

    /// Block until a listener message arrives or `timeout` elapses.
    /// Returns `true` if a message is waiting for the next step.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        if !self.pending.is_empty() {
            return true;
        }
        select! {
            recv(self.rx) -> msg => match msg {
                Ok(msg) => {
                    self.pending.push_back(msg);
                    true
                }
                Err(_) => {
                    // Every listener thread has exited; keep the poll cadence.
                    std::thread::sleep(timeout);
                    false
                }
            },
            default(timeout) => false,
        }
    }

    /// Drive the loop in real time until teardown completes.
    pub fn run(mut self, clock: &impl Clock, sink: &mut impl EventSink) -> ShutdownReport {
        let poll = Duration::from_millis(u64::from(self.timing.poll_interval_ms));
        self.start(sink);
        loop {
            if let LoopStatus::Finished(report) = self.step(clock.now_ms(), sink) {
                return report;
            }
            self.wait(poll);
        }
    }

    /// Force shutdown from outside the button path (e.g. a signal handler
    /// wired by the binary). Takes effect on the next step.
    pub fn request_shutdown(&mut self, cause: ShutdownCause, sink: &mut impl EventSink) {
        self.begin_shutdown(cause, sink);
    }

    /// Indicators off, listeners stopped, every line released. Runs once;
    /// later calls return the same report.
    pub fn teardown(&mut self, sink: &mut impl EventSink) -> ShutdownReport {
        if let Some(report) = self.report {
            return report;
        }
        if let Err(fault) = self.indicators.all_off() {
            warn!("Indicator fault during teardown: {fault}");
            sink.emit(&AppEvent::IndicatorFault(fault));
        }

        let listeners_closed = stop_all(&mut self.listeners, &self.timing);

        let ports_released = usize::from(self.launcher.release())
            + self.indicators.release()
            + usize::from(self.shutdown_button.release())
            + usize::from(self.fire_button.release());

        self.run_state = RunState::ShuttingDown;
        let report = ShutdownReport {
            cause: *self.shutdown_cause.get_or_insert(ShutdownCause::Button),
            pulses_fired: self.launcher.pulses_fired(),
            ports_released,
            listeners_closed,
        };
        info!(
            "Stopped: {} pulse(s), {} line(s) released, {} listener(s) closed",
            report.pulses_fired, report.ports_released, report.listeners_closed
        );
        sink.emit(&AppEvent::Stopped(report));
        self.report = Some(report);
        report
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn shutdown_cause(&self) -> Option<ShutdownCause> {
        self.shutdown_cause
    }

    pub fn indicator_levels(&self) -> IndicatorLevels {
        self.indicators.levels()
    }

    pub fn relay_level(&self) -> bool {
        self.launcher.relay_level()
    }

    pub fn launcher_state(&self) -> FiringState {
        self.launcher.state()
    }

    pub fn live_listeners(&self) -> usize {
        self.live_listeners
    }

    pub fn pulses_fired(&self) -> u32 {
        self.launcher.pulses_fired()
    }

    pub fn is_finished(&self) -> bool {
        self.report.is_some()
    }

    // ── Internals ─────────────────────────────────────────────

    fn request_fire(&mut self, trigger: Trigger, now_ms: u64, sink: &mut impl EventSink) {
        match self.launcher.fire(now_ms, self.run_state) {
            Ok(FireOutcome::Started) => {
                info!("Fire ({trigger})");
                self.indicate(sink, |ind| ind.set_firing(true));
                sink.emit(&AppEvent::Fired { trigger });
            }
            Ok(FireOutcome::Ignored(reason)) => {
                debug!("Fire request ({trigger}) ignored: {reason:?}");
                sink.emit(&AppEvent::FireIgnored { trigger, reason });
            }
            Err(fault) => self.hardware_fault(fault, sink),
        }
    }

    fn listener_lost(
        &mut self,
        source: usize,
        name: String,
        error: Option<ListenerError>,
        sink: &mut impl EventSink,
    ) {
        self.live_listeners = self.live_listeners.saturating_sub(1);
        sink.emit(&AppEvent::ListenerLost {
            source,
            name,
            error,
        });
        if self.live_listeners == 0 {
            warn!("No wake-word listener left; manual fire only");
            self.indicate(sink, |ind| ind.set_listening(false));
        }
    }

    /// Relay and button faults end the run; indicator faults only degrade it.
    fn hardware_fault(&mut self, fault: HardwareFault, sink: &mut impl EventSink) {
        if !fault.is_safety_relevant() {
            warn!("{fault}");
            sink.emit(&AppEvent::IndicatorFault(fault));
            return;
        }
        error!("{fault}");
        self.begin_shutdown(ShutdownCause::HardwareFault(fault), sink);
    }

    /// Only the first cause is kept; later requests are no-ops.
    fn begin_shutdown(&mut self, cause: ShutdownCause, sink: &mut impl EventSink) {
        if self.run_state == RunState::ShuttingDown {
            return;
        }
        self.run_state = RunState::ShuttingDown;
        self.shutdown_cause = Some(cause);
        info!("Shutting down ({cause:?})");
        for listener in &self.listeners {
            listener.request_stop();
        }
        sink.emit(&AppEvent::ShutdownRequested(cause));
    }

    fn indicate<F>(&mut self, sink: &mut impl EventSink, f: F)
    where
        F: FnOnce(&mut StatusIndicators<O>) -> Result<(), HardwareFault>,
    {
        if let Err(fault) = f(&mut self.indicators) {
            self.hardware_fault(fault, sink);
        }
    }
}

/// Stop every listener, signalling all before waiting on any.
fn stop_all(listeners: &mut [WakeWordListener], timing: &TimingConfig) -> usize {
    let join = Duration::from_millis(u64::from(timing.listener_join_timeout_ms));
    for listener in listeners.iter() {
        listener.request_stop();
    }
    listeners
        .iter_mut()
        .map(|listener| listener.stop(join))
        .filter(|&stopped| stopped)
        .count()
}
