//! Registry of the project formats this crate reads and writes, and the
//! import/export pipeline around them.

mod json;
mod midi;

pub use json::*;
pub use midi::*;

use crate::error::{ConvertError, Result};
use crate::model::project::{ExportNotification, ExportResult, Project};
use log::{debug, info, warn};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    StandardMidi,
    ProjectJson,
}

/// A project format: what it can carry and how to read and write it.
#[derive(Debug, Clone, Copy)]
pub struct Format {
    pub kind: FormatKind,
    pub name: &'static str,
    /// File extension without the dot, lowercase.
    pub extension: &'static str,
    pub supports_pitch: bool,
    pub multiple_tempos: bool,
    pub multiple_time_signatures: bool,
    /// Bytes and a fallback project name to a project.
    pub parse: fn(&[u8], &str) -> Result<Project>,
    pub generate: fn(&Project) -> Result<ExportResult>,
}

pub static STANDARD_MIDI: Format = Format {
    kind: FormatKind::StandardMidi,
    name: "Standard MIDI File",
    extension: "mid",
    supports_pitch: true,
    multiple_tempos: true,
    multiple_time_signatures: true,
    parse: parse_midi,
    generate: generate_midi,
};

pub static PROJECT_JSON: Format = Format {
    kind: FormatKind::ProjectJson,
    name: "Project JSON",
    extension: "json",
    supports_pitch: true,
    multiple_tempos: true,
    multiple_time_signatures: true,
    parse: parse_json,
    generate: generate_json,
};

pub static FORMATS: [&Format; 2] = [&STANDARD_MIDI, &PROJECT_JSON];

impl Format {
    pub fn of(kind: FormatKind) -> &'static Format {
        match kind {
            FormatKind::StandardMidi => &STANDARD_MIDI,
            FormatKind::ProjectJson => &PROJECT_JSON,
        }
    }

    /// Case-insensitive, with or without the leading dot.
    pub fn from_extension(extension: &str) -> Option<&'static Format> {
        let extension = extension.trim_start_matches('.').to_lowercase();
        let extension = match extension.as_str() {
            "midi" | "smf" => "mid",
            other => other,
        };
        FORMATS.iter().copied().find(|format| format.extension == extension)
    }
}

/// Library-side export options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportParams {
    /// Drop everything at or past this tick.
    pub length_limit: Option<i64>,
}

/// Read and parse a project file. Without an explicit format the file
/// extension decides.
pub fn import_project<P: AsRef<Path>>(path: P, format: Option<&Format>) -> Result<Project> {
    let path = path.as_ref();
    let format = match format {
        Some(format) => format,
        None => path
            .extension()
            .and_then(|extension| extension.to_str())
            .and_then(Format::from_extension)
            .ok_or_else(|| ConvertError::UnknownFormat(path.display().to_string()))?,
    };

    let bytes = fs::read(path)?;
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    import_bytes(&bytes, &name, format)
}

pub fn import_bytes(bytes: &[u8], name: &str, format: &Format) -> Result<Project> {
    info!("Importing '{}' as {}...", name, format.name);
    let project = (format.parse)(bytes, name)?.validated();

    debug!(
        "Imported project '{}' with {} track(s) and {} warning(s)..!",
        project.name,
        project.tracks.len(),
        project.import_warnings.len()
    );
    Ok(project)
}

/// Generate `format` from `project`, first fitting the project to what the
/// format can hold. Everything dropped on the way is reported as a
/// notification.
pub fn export_project(project: &Project, format: &Format, params: &ExportParams) -> Result<ExportResult> {
    if !project.has_content() {
        return Err(ConvertError::NothingToExport);
    }

    let mut notifications = Vec::new();
    let mut project = project.validated();

    if let Some(limit) = params.length_limit {
        let (limited, dropped) = project.limit_length(limit);
        if dropped {
            warn!("Dropping data past tick {}..!", limit);
            notifications.push(ExportNotification::DataOverLengthLimitIgnored);
        }
        project = limited;
        if !project.has_content() {
            return Err(ConvertError::NothingToExport);
        }
    }

    if !format.multiple_tempos {
        let (single, notification) = project.with_single_tempo();
        notifications.extend(notification);
        project = single;
    }
    if !format.multiple_time_signatures {
        let (single, notification) = project.with_single_time_signature();
        notifications.extend(notification);
        project = single;
    }
    if !format.supports_pitch {
        for track in project.tracks.iter_mut().filter(|track| track.pitch.is_some()) {
            debug!("{} carries no pitch, dropping the curve of '{}'..!", format.name, track.name);
            track.pitch = None;
        }
    }

    info!("Exporting '{}' as {}...", project.name, format.name);
    let generated = (format.generate)(&project)?;

    let mut result = ExportResult {
        data: generated.data,
        notifications: Vec::new(),
    };
    for notification in notifications.into_iter().chain(generated.notifications) {
        result.notify(notification);
    }
    Ok(result)
}
