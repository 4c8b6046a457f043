use crate::error::{ConvertError, Result};
use crate::model::project::{ExportResult, ImportWarning, Project};
use crate::time::{normalize_tempos, normalize_time_signatures};
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;

pub const JSON_FORMAT_VERSION: i64 = 1;
const FORMAT_NAME: &str = "json";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Document<'a> {
    format_version: i64,
    project: &'a Project,
}

fn malformed(reason: impl Into<String>) -> ConvertError {
    ConvertError::Malformed {
        format: FORMAT_NAME,
        reason: reason.into(),
    }
}

/// Read a versioned project document. Documents from a newer serializer are
/// read on a best-effort basis with a warning.
pub fn parse_json(bytes: &[u8], name: &str) -> Result<Project> {
    let mut document: Value = serde_json::from_slice(bytes)?;

    let version = document.get("formatVersion").and_then(Value::as_i64).unwrap_or(0);
    if version <= 0 {
        return Err(ConvertError::UnsupportedVersion {
            format: FORMAT_NAME,
            version,
        });
    }

    let mut warnings = Vec::new();
    if version > JSON_FORMAT_VERSION {
        warn!(
            "Document was written by format version {}, this build reads {}..!",
            version, JSON_FORMAT_VERSION
        );
        warnings.push(ImportWarning::IncompatibleFormatSerializationVersion {
            current: JSON_FORMAT_VERSION,
            imported: version,
        });
    }

    let body = document
        .get_mut("project")
        .map(Value::take)
        .ok_or_else(|| malformed("missing \"project\""))?;
    let mut project: Project = serde_json::from_value(body)?;

    if let Some(tempo) = project.tempos.iter().find(|t| !(t.bpm.is_finite() && t.bpm > 0.0)) {
        return Err(malformed(format!("invalid tempo {} at tick {}", tempo.bpm, tempo.tick_position)));
    }
    if let Some(signature) = project
        .time_signatures
        .iter()
        .find(|s| s.numerator <= 0 || s.denominator <= 0)
    {
        return Err(malformed(format!(
            "invalid time signature {}/{} at measure {}",
            signature.numerator, signature.denominator, signature.measure_position
        )));
    }

    project.tempos = normalize_tempos(std::mem::take(&mut project.tempos), 0, &mut warnings);
    project.time_signatures = normalize_time_signatures(std::mem::take(&mut project.time_signatures), 0, &mut warnings);
    if project.name.is_empty() {
        project.name = name.to_string();
    }
    project.import_warnings = warnings;

    info!("Read project '{}' with {} track(s)..!", project.name, project.tracks.len());
    Ok(project.validated())
}

pub fn generate_json(project: &Project) -> Result<ExportResult> {
    let document = Document {
        format_version: JSON_FORMAT_VERSION,
        project,
    };

    Ok(ExportResult {
        data: serde_json::to_vec_pretty(&document)?,
        notifications: Vec::new(),
    })
}
