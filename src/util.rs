use crate::format::{Format, FormatKind};
use log::info;
use std::path::Path;

pub fn parse_format(input: &str) -> Option<&'static Format> {
    match input.to_lowercase().as_str() {
        "m" | "mid" | "midi" | "smf" => Some(Format::of(FormatKind::StandardMidi)),
        "j" | "json" => Some(Format::of(FormatKind::ProjectJson)),
        other => {
            info!("Unknown format '{}'..! Supported: midi|json", other);
            None
        }
    }
}

/// An explicit format name wins, otherwise the extension of `path` decides.
pub fn resolve_format(name: Option<&str>, path: &Path) -> Option<&'static Format> {
    match name {
        Some(name) => parse_format(name),
        None => path
            .extension()
            .and_then(|extension| extension.to_str())
            .and_then(Format::from_extension),
    }
}
