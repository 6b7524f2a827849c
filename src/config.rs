//! Controller configuration.
//!
//! Timing policy, pin map and wake-word settings. Defaults match the
//! reference wiring in [`crate::pins`]; a deployment overrides them with a
//! JSON file passed via `--config`. The Picovoice access key is never read
//! from the file, only from the command line or environment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::pins::{self, PinRole};

/// Longest relay closure accepted. The launcher remote only needs a
/// momentary press; anything longer risks a second throw.
pub const MAX_PULSE_MS: u32 = 5_000;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub timing: TimingConfig,
    pub pins: PinMap,
    /// Buttons pull the line low when pressed (external or internal pull-up).
    pub buttons_active_low: bool,
    pub wake_word: WakeWordConfig,
    /// Command run by the binary after a button-initiated shutdown, e.g.
    /// `["sudo", "shutdown", "-h", "now"]`. `None` leaves power to the OS.
    pub power_off_command: Option<Vec<String>>,
}

/// Timing policy. Everything is in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Refractory period after a reported button edge.
    pub debounce_window_ms: u32,
    /// How long the relay stays closed per shot.
    pub pulse_duration_ms: u32,
    /// Minimum time between the starts of two pulses. 0 disables.
    pub rearm_delay_ms: u32,
    /// Button sampling period of the control loop.
    pub poll_interval_ms: u32,
    /// How long teardown waits for a listener thread before detaching it.
    pub listener_join_timeout_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce_window_ms: 50,
            pulse_duration_ms: 500,
            rearm_delay_ms: 2_000,
            poll_interval_ms: 10,
            listener_join_timeout_ms: 500,
        }
    }
}

/// BCM line number for each role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinMap {
    pub shutdown_button: u8,
    pub manual_fire_button: u8,
    pub led_firing: u8,
    pub led_listening: u8,
    pub led_running: u8,
    pub relay: u8,
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            shutdown_button: pins::SHUTDOWN_BUTTON_GPIO,
            manual_fire_button: pins::MANUAL_FIRE_BUTTON_GPIO,
            led_firing: pins::LED_FIRING_GPIO,
            led_listening: pins::LED_LISTENING_GPIO,
            led_running: pins::LED_RUNNING_GPIO,
            relay: pins::RELAY_GPIO,
        }
    }
}

impl PinMap {
    pub fn line(&self, role: PinRole) -> u8 {
        match role {
            PinRole::ShutdownButton => self.shutdown_button,
            PinRole::ManualFireButton => self.manual_fire_button,
            PinRole::FiringLed => self.led_firing,
            PinRole::ListeningLed => self.led_listening,
            PinRole::RunningLed => self.led_running,
            PinRole::Relay => self.relay,
        }
    }

    pub fn assignments(&self) -> impl Iterator<Item = (PinRole, u8)> + '_ {
        PinRole::ALL.into_iter().map(|role| (role, self.line(role)))
    }
}

/// Wake-word engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WakeWordConfig {
    /// Picovoice access key. Supplied at runtime only.
    #[serde(skip)]
    pub access_key: String,
    /// Built-in keyword name, used when `keyword_path` is unset.
    pub keyword: String,
    /// Custom `.ppn` keyword file.
    pub keyword_path: Option<PathBuf>,
    /// Override for the engine's shared library.
    pub library_path: Option<PathBuf>,
    /// Override for the engine's model parameters.
    pub model_path: Option<PathBuf>,
    /// 0.0 – 1.0; higher misses less and false-triggers more.
    pub sensitivity: f32,
    /// Listen on this capture device only. `None` opens every usable one.
    pub device_index: Option<i32>,
    /// Dump captured audio as WAV here on shutdown (debugging aid).
    pub record_path: Option<PathBuf>,
}

impl Default for WakeWordConfig {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            keyword: "computer".to_string(),
            keyword_path: None,
            library_path: None,
            model_path: None,
            sensitivity: 1.0,
            device_index: None,
            record_path: None,
        }
    }
}

impl Default for ControllerConfig {
    /// Reference wiring with active-low buttons.
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            pins: PinMap::default(),
            buttons_active_low: true,
            wake_word: WakeWordConfig::default(),
            power_off_command: None,
        }
    }
}

impl ControllerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON config file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigurationError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json(&raw).map_err(|e| match e {
            ConfigurationError::Unreadable { reason, .. } => ConfigurationError::Unreadable {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(raw).map_err(|e| ConfigurationError::Unreadable {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })
    }

    /// Reject settings that would make the launcher unsafe or the loop
    /// unresponsive.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let t = &self.timing;
        if t.debounce_window_ms == 0 {
            return Err(invalid("timing.debounce_window_ms", "must be > 0"));
        }
        if t.pulse_duration_ms == 0 || t.pulse_duration_ms > MAX_PULSE_MS {
            return Err(invalid(
                "timing.pulse_duration_ms",
                format!("must be within 1..={MAX_PULSE_MS}"),
            ));
        }
        if t.poll_interval_ms == 0 {
            return Err(invalid("timing.poll_interval_ms", "must be > 0"));
        }
        if t.poll_interval_ms >= t.debounce_window_ms {
            return Err(invalid(
                "timing.poll_interval_ms",
                "must be shorter than the debounce window",
            ));
        }

        let mut seen: Vec<(PinRole, u8)> = Vec::with_capacity(PinRole::ALL.len());
        for (role, line) in self.pins.assignments() {
            if let Some(&(bound_to, _)) = seen.iter().find(|(_, l)| *l == line) {
                return Err(ConfigurationError::LineAlreadyBound {
                    line,
                    role,
                    bound_to,
                });
            }
            seen.push((role, line));
        }

        let w = &self.wake_word;
        if !(0.0..=1.0).contains(&w.sensitivity) {
            return Err(invalid("wake_word.sensitivity", "must be within 0.0..=1.0"));
        }
        if w.keyword_path.is_none() && w.keyword.trim().is_empty() {
            return Err(invalid(
                "wake_word.keyword",
                "set a built-in keyword or a keyword_path",
            ));
        }
        if matches!(&self.power_off_command, Some(cmd) if cmd.is_empty()) {
            return Err(invalid("power_off_command", "must name a program"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError::InvalidSetting {
        field,
        reason: reason.into(),
    }
}
