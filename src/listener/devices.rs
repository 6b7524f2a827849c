//! Capture device selection and keyword labels.

use std::path::Path;

/// Capture devices that never carry a microphone signal: PulseAudio monitor
/// sources, the null sink and sound-server passthroughs.
const IGNORED: [&str; 4] = [
    "Monitor of",
    "Discard all samples (playback) or generate zero samples (capture)",
    "JACK Audio Connection Kit",
    "PulseAudio Sound Server",
];

/// Whether a capture device is worth listening on.
pub fn is_usable_input(name: &str) -> bool {
    !IGNORED.iter().any(|ignored| name.contains(ignored))
}

/// Filter the audio backend's device list, keeping backend indices.
pub fn usable_devices(names: &[String]) -> Vec<(i32, &str)> {
    names
        .iter()
        .enumerate()
        .filter(|(_, name)| is_usable_input(name))
        .map(|(index, name)| (index as i32, name.as_str()))
        .collect()
}

/// Human label for a keyword model file.
///
/// The `.ppn` suffix is stripped and the stem split on `_`. Names with more
/// than six fields keep everything before the last six, joined with spaces;
/// shorter names keep only the first field.
pub fn keyword_label(path: &Path) -> String {
    let file = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    let stem = file.strip_suffix(".ppn").unwrap_or(&file);
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() > 6 {
        parts[..parts.len() - 6].join(" ")
    } else {
        parts[0].to_string()
    }
}
