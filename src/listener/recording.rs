//! Raw capture dump for tuning keyword sensitivity.
//!
//! Frames are buffered in memory and written as a 16-bit mono WAV file when
//! the listener closes.

use std::path::{Path, PathBuf};

use log::info;

pub struct FrameRecorder {
    path: PathBuf,
    sample_rate: u32,
    samples: Vec<i16>,
}

impl FrameRecorder {
    pub fn new(path: impl Into<PathBuf>, sample_rate: u32) -> Self {
        Self {
            path: path.into(),
            sample_rate,
            samples: Vec::new(),
        }
    }

    pub fn push(&mut self, frame: &[i16]) {
        self.samples.extend_from_slice(frame);
    }

    /// Samples buffered so far.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the WAV file. Nothing is written when no audio was captured.
    /// Returns the number of samples written.
    pub fn finish(self) -> Result<usize, hound::Error> {
        if self.samples.is_empty() {
            return Ok(0);
        }
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&self.path, spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        info!(
            "Wrote {} samples to {}",
            self.samples.len(),
            self.path.display()
        );
        Ok(self.samples.len())
    }
}

/// Per-listener recording path: `dump.wav` → `dump-2.wav` for listener 2.
/// Listener 0 keeps the configured name.
pub fn numbered(path: &Path, index: usize) -> PathBuf {
    if index == 0 {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}-{index}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{index}"),
    };
    path.with_file_name(name)
}
