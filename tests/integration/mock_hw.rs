//! Mock hardware for integration tests.
//!
//! [`MockBank`] records every write and release per line and can inject
//! driver faults. [`scripted`] builds a keyword spotter the test drives
//! through a channel. Shared state sits behind `Arc<Mutex<_>>` so a helper
//! thread can press buttons while `ControlLoop::run` owns the loop.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin, OutputPin};
use shoutshoot::app::events::AppEvent;
use shoutshoot::app::ports::{EventSink, KeywordSpotter, PinBank};
use shoutshoot::config::{ControllerConfig, TimingConfig};
use shoutshoot::error::{ConfigurationError, ListenerError};
use shoutshoot::listener::SpotterFactory;
use shoutshoot::pins::PinRole;
use shoutshoot::{ControlLoop, LoopStatus};

// ── Reference wiring ──────────────────────────────────────────

pub const SHUTDOWN: u8 = 17;
pub const FIRE: u8 = 27;
pub const LED_FIRING: u8 = 5;
pub const LED_LISTENING: u8 = 6;
pub const LED_RUNNING: u8 = 13;
pub const RELAY: u8 = 26;
pub const ALL_LINES: [u8; 6] = [SHUTDOWN, FIRE, LED_FIRING, LED_LISTENING, LED_RUNNING, RELAY];

// ── Pin error ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct MockPinError;

impl digital::Error for MockPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

// ── MockBank ──────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Line {
    level: bool,
    writes: Vec<bool>,
    opened: u32,
    released: u32,
    faulty: bool,
}

#[derive(Debug, Default)]
struct Lines {
    lines: HashMap<u8, Line>,
    refused: HashSet<u8>,
}

#[derive(Clone, Default)]
pub struct MockBank {
    inner: Arc<Mutex<Lines>>,
}

#[allow(dead_code)]
impl MockBank {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, line: u8, f: impl FnOnce(&mut Line) -> R) -> R {
        let mut inner = self.inner.lock().unwrap();
        f(inner.lines.entry(line).or_default())
    }

    /// Active-low button pressed (line pulled to ground).
    pub fn press(&self, line: u8) {
        self.with(line, |l| l.level = false);
    }

    pub fn release_button(&self, line: u8) {
        self.with(line, |l| l.level = true);
    }

    pub fn level(&self, line: u8) -> bool {
        self.with(line, |l| l.level)
    }

    /// Every level written to an output since it was opened.
    pub fn writes(&self, line: u8) -> Vec<bool> {
        self.with(line, |l| l.writes.clone())
    }

    pub fn ever_high(&self, line: u8) -> bool {
        self.writes(line).contains(&true)
    }

    pub fn opened(&self, line: u8) -> u32 {
        self.with(line, |l| l.opened)
    }

    pub fn released(&self, line: u8) -> u32 {
        self.with(line, |l| l.released)
    }

    /// Every read and write on `line` fails from now on.
    pub fn break_line(&self, line: u8) {
        self.with(line, |l| l.faulty = true);
    }

    /// The backend refuses to open `line`.
    pub fn refuse(&self, line: u8) {
        self.inner.lock().unwrap().refused.insert(line);
    }

    fn open(&self, line: u8, role: PinRole, output: bool) -> Result<MockPin, ConfigurationError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.refused.contains(&line) {
            return Err(ConfigurationError::LineUnavailable {
                line,
                role,
                reason: "refused by mock".into(),
            });
        }
        let fresh = !inner.lines.contains_key(&line);
        let l = inner.lines.entry(line).or_default();
        l.opened += 1;
        if output {
            l.level = false;
        } else if fresh {
            // Pull-up: an untouched button reads idle.
            l.level = true;
        }
        Ok(MockPin {
            line,
            bank: self.clone(),
        })
    }
}

impl PinBank for MockBank {
    type Input = MockPin;
    type Output = MockPin;

    fn open_input(&mut self, line: u8, role: PinRole) -> Result<MockPin, ConfigurationError> {
        self.open(line, role, false)
    }

    fn open_output(&mut self, line: u8, role: PinRole) -> Result<MockPin, ConfigurationError> {
        self.open(line, role, true)
    }
}

pub struct MockPin {
    line: u8,
    bank: MockBank,
}

impl MockPin {
    fn read(&self) -> Result<bool, MockPinError> {
        self.bank
            .with(self.line, |l| if l.faulty { Err(MockPinError) } else { Ok(l.level) })
    }

    fn write(&mut self, level: bool) -> Result<(), MockPinError> {
        self.bank.with(self.line, |l| {
            if l.faulty {
                return Err(MockPinError);
            }
            l.level = level;
            l.writes.push(level);
            Ok(())
        })
    }
}

impl Drop for MockPin {
    fn drop(&mut self) {
        self.bank.with(self.line, |l| l.released += 1);
    }
}

impl ErrorType for MockPin {
    type Error = MockPinError;
}

impl InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, MockPinError> {
        self.read()
    }

    fn is_low(&mut self) -> Result<bool, MockPinError> {
        self.read().map(|level| !level)
    }
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), MockPinError> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), MockPinError> {
        self.write(true)
    }
}

// ── Scripted spotter ──────────────────────────────────────────

/// Each `next_window` waits this long for a scripted result, then reports a
/// silent window.
const WINDOW: Duration = Duration::from_millis(5);

struct ScriptedSpotter {
    name: String,
    script: Receiver<Result<bool, ListenerError>>,
    closes: Arc<AtomicUsize>,
}

impl KeywordSpotter for ScriptedSpotter {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_window(&mut self) -> Result<bool, ListenerError> {
        match self.script.recv_timeout(WINDOW) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => {
                Err(ListenerError::Engine("script dropped".into()))
            }
        }
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Test side of a scripted spotter.
#[derive(Clone)]
pub struct SpotterHandle {
    script: Sender<Result<bool, ListenerError>>,
    closes: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl SpotterHandle {
    /// One utterance of the wake word.
    pub fn detect(&self) {
        let _ = self.script.send(Ok(true));
        let _ = self.script.send(Ok(false));
    }

    /// Keyword held across `windows` consecutive windows.
    pub fn detect_for(&self, windows: usize) {
        for _ in 0..windows {
            let _ = self.script.send(Ok(true));
        }
        let _ = self.script.send(Ok(false));
    }

    pub fn fail(&self, error: ListenerError) {
        let _ = self.script.send(Err(error));
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub fn scripted(name: &str) -> (SpotterFactory, SpotterHandle) {
    let (tx, rx) = unbounded();
    let closes = Arc::new(AtomicUsize::new(0));
    let spotter = ScriptedSpotter {
        name: name.to_string(),
        script: rx,
        closes: Arc::clone(&closes),
    };
    let factory: SpotterFactory = Box::new(move || Ok(Box::new(spotter) as Box<dyn KeywordSpotter>));
    (factory, SpotterHandle { script: tx, closes })
}

#[allow(dead_code)]
pub fn failing(error: ListenerError) -> SpotterFactory {
    Box::new(move || -> Result<Box<dyn KeywordSpotter>, ListenerError> { Err(error) })
}

// ── Event collection ──────────────────────────────────────────

#[derive(Default)]
pub struct CollectSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn fired(&self) -> usize {
        self.count(|e| matches!(e, AppEvent::Fired { .. }))
    }
}

impl EventSink for CollectSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// Short, deterministic timings: 50 ms debounce, 500 ms pulse, no re-arm.
pub fn test_config() -> ControllerConfig {
    let mut config = ControllerConfig::new();
    config.timing = TimingConfig {
        debounce_window_ms: 50,
        pulse_duration_ms: 500,
        rearm_delay_ms: 0,
        poll_interval_ms: 10,
        listener_join_timeout_ms: 200,
    };
    config
}

/// A started control loop on a mock bank with scripted listeners.
pub struct Rig {
    pub bank: MockBank,
    pub sink: CollectSink,
    pub control: ControlLoop<MockPin, MockPin>,
    pub spotters: Vec<SpotterHandle>,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(listeners: usize) -> Self {
        Self::with_config(&test_config(), listeners)
    }

    /// Init, start, and seed the debouncers with one step at t = 0.
    pub fn with_config(config: &ControllerConfig, listeners: usize) -> Self {
        let mut bank = MockBank::new();
        let (factories, spotters): (Vec<_>, Vec<_>) =
            (0..listeners).map(|i| scripted(&format!("mic-{i}"))).unzip();
        let control = ControlLoop::init(config, &mut bank, factories).unwrap();
        let mut rig = Self {
            bank,
            sink: CollectSink::new(),
            control,
            spotters,
        };
        rig.control.start(&mut rig.sink);
        assert_eq!(rig.step(0), LoopStatus::Continue);
        rig
    }

    pub fn step(&mut self, now_ms: u64) -> LoopStatus {
        self.control.step(now_ms, &mut self.sink)
    }

    /// Wait for a listener message to reach the loop.
    pub fn await_listener(&mut self) {
        assert!(
            self.control.wait(Duration::from_secs(2)),
            "no listener message within 2 s"
        );
    }

    /// Press and hold `line`, stepping at `now_ms`.
    pub fn press(&mut self, line: u8, now_ms: u64) -> LoopStatus {
        self.bank.press(line);
        self.step(now_ms)
    }

    pub fn release(&mut self, line: u8, now_ms: u64) -> LoopStatus {
        self.bank.release_button(line);
        self.step(now_ms)
    }
}
