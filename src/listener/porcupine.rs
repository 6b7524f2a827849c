//! Picovoice Porcupine keyword spotter on a PvRecorder capture device.
//!
//! Needs the vendor runtime and a valid access key; only built with the
//! `porcupine` feature.

use std::path::PathBuf;

use ::porcupine::{BuiltinKeywords, Porcupine, PorcupineBuilder};
use log::{debug, warn};
use pv_recorder::{PvRecorder, PvRecorderBuilder};

use super::SpotterFactory;
use super::recording::{FrameRecorder, numbered};
use crate::app::ports::KeywordSpotter;
use crate::config::WakeWordConfig;
use crate::error::ListenerError;

/// Capture device names, indexed the way [`PvRecorderBuilder::device_index`]
/// expects.
pub fn available_devices() -> Result<Vec<String>, ListenerError> {
    PvRecorderBuilder::default()
        .get_available_devices()
        .map_err(|e| ListenerError::AudioDevice(e.to_string()))
}

fn builtin_keyword(name: &str) -> Option<BuiltinKeywords> {
    let keyword = match name.to_ascii_lowercase().as_str() {
        "alexa" => BuiltinKeywords::Alexa,
        "americano" => BuiltinKeywords::Americano,
        "blueberry" => BuiltinKeywords::Blueberry,
        "bumblebee" => BuiltinKeywords::Bumblebee,
        "computer" => BuiltinKeywords::Computer,
        "grapefruit" => BuiltinKeywords::Grapefruit,
        "grasshopper" => BuiltinKeywords::Grasshopper,
        "hey google" => BuiltinKeywords::HeyGoogle,
        "hey siri" => BuiltinKeywords::HeySiri,
        "jarvis" => BuiltinKeywords::Jarvis,
        "ok google" => BuiltinKeywords::OkGoogle,
        "picovoice" => BuiltinKeywords::Picovoice,
        "porcupine" => BuiltinKeywords::Porcupine,
        "terminator" => BuiltinKeywords::Terminator,
        _ => return None,
    };
    Some(keyword)
}

/// Sort engine init failures into the error kinds the operator can act on.
fn classify(message: String) -> ListenerError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("accesskey") || lower.contains("access key") || lower.contains("activation")
    {
        ListenerError::Credentials(message)
    } else if lower.contains("model") || lower.contains("keyword") || lower.contains(".ppn") {
        ListenerError::Model(message)
    } else {
        ListenerError::Engine(message)
    }
}

pub struct PorcupineSpotter {
    name: String,
    engine: Porcupine,
    recorder: PvRecorder,
    dump: Option<FrameRecorder>,
}

impl PorcupineSpotter {
    pub fn open(
        config: &WakeWordConfig,
        device_index: i32,
        name: String,
        record_path: Option<PathBuf>,
    ) -> Result<Self, ListenerError> {
        let mut builder = match &config.keyword_path {
            Some(path) => PorcupineBuilder::new_with_keyword_paths(&config.access_key, &[path]),
            None => {
                let keyword = builtin_keyword(&config.keyword).ok_or_else(|| {
                    ListenerError::Model(format!("unknown built-in keyword '{}'", config.keyword))
                })?;
                PorcupineBuilder::new_with_keywords(&config.access_key, &[keyword])
            }
        };
        builder.sensitivities(&[config.sensitivity]);
        if let Some(model) = &config.model_path {
            builder.model_path(model);
        }
        if let Some(library) = &config.library_path {
            builder.library_path(library);
        }
        let engine = builder.init().map_err(|e| classify(e.to_string()))?;

        let recorder = PvRecorderBuilder::new(engine.frame_length() as i32)
            .device_index(device_index)
            .init()
            .map_err(|e| ListenerError::AudioDevice(format!("{name}: {e}")))?;
        recorder
            .start()
            .map_err(|e| ListenerError::AudioDevice(format!("{name}: {e}")))?;
        debug!(
            "Porcupine on '{name}': frame {} @ {} Hz",
            engine.frame_length(),
            engine.sample_rate()
        );

        let dump = record_path.map(|path| FrameRecorder::new(path, engine.sample_rate()));
        Ok(Self {
            name,
            engine,
            recorder,
            dump,
        })
    }
}

impl KeywordSpotter for PorcupineSpotter {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_window(&mut self) -> Result<bool, ListenerError> {
        let frame = self
            .recorder
            .read()
            .map_err(|e| ListenerError::AudioDevice(e.to_string()))?;
        if let Some(dump) = self.dump.as_mut() {
            dump.push(&frame);
        }
        let index = self
            .engine
            .process(&frame)
            .map_err(|e| ListenerError::Engine(e.to_string()))?;
        Ok(index >= 0)
    }

    fn close(&mut self) {
        if let Err(e) = self.recorder.stop() {
            warn!("'{}': stopping capture failed: {e}", self.name);
        }
        if let Some(dump) = self.dump.take() {
            let path = dump.path().to_path_buf();
            if let Err(e) = dump.finish() {
                warn!("'{}': cannot write {}: {e}", self.name, path.display());
            }
        }
    }
}

/// Factory for listener `source` on capture device `device_index`.
pub fn factory(
    config: WakeWordConfig,
    source: usize,
    device_index: i32,
    name: String,
) -> SpotterFactory {
    Box::new(move || {
        let record = config
            .record_path
            .as_deref()
            .map(|path| numbered(path, source));
        let spotter = PorcupineSpotter::open(&config, device_index, name, record)?;
        Ok(Box::new(spotter) as Box<dyn KeywordSpotter>)
    })
}
