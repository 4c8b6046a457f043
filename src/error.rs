use thiserror::Error;

/// Fatal conversion failures. Anything recoverable is reported as an
/// [`ImportWarning`](crate::ImportWarning) or
/// [`ExportNotification`](crate::ExportNotification) instead.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Relativity conversion needs sorted, non-overlapping notes.
    #[error("notes overlapping: note {index} ends at tick {tick_off} but the next one starts at {next_tick_on}")]
    NotesOverlapping {
        index: usize,
        tick_off: i64,
        next_tick_on: i64,
    },

    #[error("malformed {format} data: {reason}")]
    Malformed {
        format: &'static str,
        reason: String,
    },

    #[error("unsupported {format} version: {version}")]
    UnsupportedVersion { format: &'static str, version: i64 },

    #[error("unknown project format: {0}")]
    UnknownFormat(String),

    #[error("unsupported timing: {0}")]
    UnsupportedTiming(String),

    #[error("nothing to export: every track is empty")]
    NothingToExport,

    #[error("midi error: {0}")]
    Midi(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
