use crate::model::pitch::Pitch;
use crate::time::{scale_tick, signature_ticks};
use log::debug;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LYRIC: &str = "a";
pub const DEFAULT_BPM: f64 = 120.0;
pub const KEY_RANGE: std::ops::RangeInclusive<i32> = 0..=127;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i32,
    pub key: i32,
    pub lyric: String,
    #[serde(default)]
    pub phoneme: Option<String>,
    pub tick_on: i64,
    pub tick_off: i64,
}

impl Note {
    pub fn new(id: i32, key: i32, lyric: impl Into<String>, tick_on: i64, tick_off: i64) -> Self {
        Self {
            id,
            key,
            lyric: lyric.into(),
            phoneme: None,
            tick_on,
            tick_off,
        }
    }

    pub fn length(&self) -> i64 {
        self.tick_off - self.tick_on
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tempo {
    pub tick_position: i64,
    pub bpm: f64,
}

impl Tempo {
    pub const DEFAULT: Tempo = Tempo {
        tick_position: 0,
        bpm: DEFAULT_BPM,
    };

    pub fn new(tick_position: i64, bpm: f64) -> Self {
        Self { tick_position, bpm }
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeSignature {
    pub measure_position: i32,
    pub numerator: i32,
    pub denominator: i32,
}

impl TimeSignature {
    pub const DEFAULT: TimeSignature = TimeSignature {
        measure_position: 0,
        numerator: 4,
        denominator: 4,
    };

    pub fn new(measure_position: i32, numerator: i32, denominator: i32) -> Self {
        Self {
            measure_position,
            numerator,
            denominator,
        }
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: i32,
    pub name: String,
    pub notes: Vec<Note>,
    #[serde(default)]
    pub pitch: Option<Pitch>,
}

/// Non-fatal conditions met while importing. Attached to the parsed project.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportWarning {
    TempoNotFound,
    TempoIgnoredInTrack { track: usize, tempo: Tempo },
    TempoIgnoredInPreMeasure(Tempo),
    TimeSignatureNotFound,
    TimeSignatureIgnoredInTrack { track: usize, time_signature: TimeSignature },
    TimeSignatureIgnoredInPreMeasure(TimeSignature),
    IncompatibleFormatSerializationVersion { current: i64, imported: i64 },
}

/// User-facing advisories produced while exporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportNotification {
    PitchDataExported,
    PhonemeResetRequired,
    DataOverLengthLimitIgnored,
    TimeSignatureIgnored,
    TempoChangeIgnored,
}

#[derive(Debug, Clone)]
pub struct ExportResult {
    pub data: Vec<u8>,
    pub notifications: Vec<ExportNotification>,
}

impl ExportResult {
    pub fn notify(&mut self, notification: ExportNotification) {
        if !self.notifications.contains(&notification) {
            self.notifications.push(notification);
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    pub tracks: Vec<Track>,
    pub tempos: Vec<Tempo>,
    pub time_signatures: Vec<TimeSignature>,
    #[serde(default)]
    pub measure_prefix: i32,
    #[serde(skip)]
    pub import_warnings: Vec<ImportWarning>,
}

/// Sort notes by onset, cut each note off where the next one starts, drop
/// what ends up empty and renumber ids from zero.
pub fn validate_notes(notes: &[Note]) -> Vec<Note> {
    let mut sorted = notes.to_vec();
    sorted.sort_by_key(|note| (note.tick_on, note.tick_off));

    let next_onsets: Vec<Option<i64>> = (0..sorted.len())
        .map(|i| sorted.get(i + 1).map(|next| next.tick_on))
        .collect();

    let mut result: Vec<Note> = Vec::with_capacity(sorted.len());
    for (mut note, next_on) in sorted.into_iter().zip(next_onsets) {
        if let Some(next_on) = next_on
            && note.tick_off > next_on
        {
            debug!(
                "Truncating note at tick {} from {} to {} to remove an overlap..!",
                note.tick_on, note.tick_off, next_on
            );
            note.tick_off = next_on;
        }

        if note.tick_off <= note.tick_on {
            debug!("Dropping zero-length note at tick {}..!", note.tick_on);
            continue;
        }

        note.id = result.len() as i32;
        result.push(note);
    }

    result
}

impl Track {
    pub fn new(id: i32, name: impl Into<String>, notes: Vec<Note>) -> Self {
        Self {
            id,
            name: name.into(),
            notes,
            pitch: None,
        }
    }

    pub fn validated(&self) -> Self {
        Self {
            notes: validate_notes(&self.notes),
            ..self.clone()
        }
    }

    pub fn time_scaled(&self, factor: f64) -> Self {
        Self {
            notes: self
                .notes
                .iter()
                .map(|note| Note {
                    tick_on: scale_tick(note.tick_on, factor),
                    tick_off: scale_tick(note.tick_off, factor),
                    ..note.clone()
                })
                .collect(),
            pitch: self.pitch.as_ref().map(|pitch| pitch.time_scaled(factor)),
            ..self.clone()
        }
    }

    /// Returns the limited track and whether anything was dropped.
    pub fn limit_length(&self, max_tick: i64) -> (Self, bool) {
        let mut dropped = false;
        let notes: Vec<Note> = self
            .notes
            .iter()
            .filter_map(|note| {
                if note.tick_on >= max_tick {
                    dropped = true;
                    return None;
                }
                if note.tick_off > max_tick {
                    dropped = true;
                    return Some(Note {
                        tick_off: max_tick,
                        ..note.clone()
                    });
                }
                Some(note.clone())
            })
            .collect();

        let pitch = self.pitch.as_ref().map(|pitch| {
            let clipped = pitch.clipped(i64::MIN, max_tick);
            if clipped.points.len() != pitch.points.len() {
                dropped = true;
            }
            clipped
        });

        (
            Self {
                notes,
                pitch,
                ..self.clone()
            },
            dropped,
        )
    }
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracks: Vec::new(),
            tempos: vec![Tempo::DEFAULT],
            time_signatures: vec![TimeSignature::DEFAULT],
            measure_prefix: 0,
            import_warnings: Vec::new(),
        }
    }

    pub fn has_content(&self) -> bool {
        self.tracks.iter().any(|track| !track.notes.is_empty())
    }

    pub fn validated(&self) -> Self {
        Self {
            tracks: self.tracks.iter().map(Track::validated).collect(),
            ..self.clone()
        }
    }

    pub fn time_scaled(&self, factor: f64) -> Self {
        Self {
            tracks: self.tracks.iter().map(|t| t.time_scaled(factor)).collect(),
            tempos: self
                .tempos
                .iter()
                .map(|tempo| Tempo::new(scale_tick(tempo.tick_position, factor), tempo.bpm))
                .collect(),
            ..self.clone()
        }
    }

    /// Drop everything at or after `max_tick`. Returns whether anything was lost.
    pub fn limit_length(&self, max_tick: i64) -> (Self, bool) {
        let mut dropped = false;

        let tracks = self
            .tracks
            .iter()
            .map(|track| {
                let (limited, lost) = track.limit_length(max_tick);
                dropped |= lost;
                limited
            })
            .collect();

        let tempos: Vec<Tempo> = self
            .tempos
            .iter()
            .enumerate()
            .filter(|(i, tempo)| *i == 0 || tempo.tick_position < max_tick)
            .map(|(_, tempo)| *tempo)
            .collect();
        dropped |= tempos.len() != self.tempos.len();

        let signature_positions = signature_ticks(&self.time_signatures);
        let time_signatures: Vec<TimeSignature> = self
            .time_signatures
            .iter()
            .zip(signature_positions)
            .enumerate()
            .filter(|(i, (_, tick))| *i == 0 || *tick < max_tick)
            .map(|(_, (signature, _))| *signature)
            .collect();
        dropped |= time_signatures.len() != self.time_signatures.len();

        (
            Self {
                tracks,
                tempos,
                time_signatures,
                ..self.clone()
            },
            dropped,
        )
    }

    /// Keep only the first tempo, for targets that support a single value.
    pub fn with_single_tempo(&self) -> (Self, Option<ExportNotification>) {
        if self.tempos.len() <= 1 {
            return (self.clone(), None);
        }

        let first = self.tempos.first().copied().unwrap_or_default();
        (
            Self {
                tempos: vec![first],
                ..self.clone()
            },
            Some(ExportNotification::TempoChangeIgnored),
        )
    }

    pub fn with_single_time_signature(&self) -> (Self, Option<ExportNotification>) {
        if self.time_signatures.len() <= 1 {
            return (self.clone(), None);
        }

        let first = self.time_signatures.first().copied().unwrap_or_default();
        (
            Self {
                time_signatures: vec![first],
                ..self.clone()
            },
            Some(ExportNotification::TimeSignatureIgnored),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn note(tick_on: i64, tick_off: i64) -> Note {
        Note::new(99, 60, DEFAULT_LYRIC, tick_on, tick_off)
    }

    #[test]
    fn overlapping_notes_are_truncated() {
        env_logger::try_init().unwrap_or(());

        let validated = validate_notes(&[note(0, 10), note(5, 15)]);

        assert_eq!(validated.len(), 2);
        assert_eq!((validated[0].tick_on, validated[0].tick_off), (0, 5));
        assert_eq!((validated[1].tick_on, validated[1].tick_off), (5, 15));
        assert_eq!(validated[0].id, 0);
        assert_eq!(validated[1].id, 1);
    }

    #[test]
    fn validation_sorts_and_drops_empty_notes() {
        env_logger::try_init().unwrap_or(());

        let validated = validate_notes(&[note(480, 960), note(0, 480), note(480, 480), note(960, 1200)]);

        let spans: Vec<(i64, i64)> = validated.iter().map(|n| (n.tick_on, n.tick_off)).collect();
        assert_eq!(spans, vec![(0, 480), (480, 960), (960, 1200)]);
        assert!(validated.iter().enumerate().all(|(i, n)| n.id == i as i32));
    }

    #[test]
    fn same_onset_collapses_to_one_note() {
        let validated = validate_notes(&[note(0, 480), note(0, 960)]);
        assert_eq!(validated.len(), 1);
    }

    #[test]
    fn limit_length_reports_losses() {
        let mut project = Project::new("test");
        let mut track = Track::new(0, "vocal", vec![note(0, 480), note(480, 1200), note(1920, 2400)]);
        track.pitch = Some(Pitch::relative(vec![(0, 0.5), (1000, 0.25), (2000, 0.0)]));
        project.tracks.push(track);
        project.tempos.push(Tempo::new(3000, 90.0));

        let (limited, dropped) = project.limit_length(960);
        assert!(dropped);

        let notes = &limited.tracks[0].notes;
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[1].tick_off, 960);
        assert_eq!(limited.tracks[0].pitch.as_ref().unwrap().points.len(), 1);
        assert_eq!(limited.tempos, vec![Tempo::DEFAULT]);

        let (_, dropped) = limited.limit_length(960);
        assert!(!dropped);
    }

    #[test]
    fn limit_length_drops_late_time_signatures() {
        let mut project = Project::new("test");
        project.tracks.push(Track::new(0, "vocal", vec![note(0, 480)]));
        project.time_signatures.push(TimeSignature::new(2, 3, 4));

        // measure 2 in 4/4 starts at tick 3840
        let (kept, dropped) = project.limit_length(3841);
        assert!(!dropped);
        assert_eq!(kept.time_signatures.len(), 2);

        let (cut, dropped) = project.limit_length(3840);
        assert!(dropped);
        assert_eq!(cut.time_signatures, vec![TimeSignature::DEFAULT]);
    }

    #[test]
    fn time_scaling_returns_a_copy() {
        let mut project = Project::new("test");
        project.tracks.push(Track::new(0, "vocal", vec![note(0, 96), note(96, 192)]));
        project.tempos.push(Tempo::new(96, 60.0));

        let scaled = project.time_scaled(5.0);
        assert_eq!(scaled.tracks[0].notes[1].tick_on, 480);
        assert_eq!(scaled.tracks[0].notes[1].tick_off, 960);
        assert_eq!(scaled.tempos[1].tick_position, 480);
        assert_eq!(project.tracks[0].notes[1].tick_on, 96);
    }

    #[test]
    fn single_tempo_flattening() {
        let mut project = Project::new("test");
        let (same, notification) = project.with_single_tempo();
        assert_eq!(same.tempos.len(), 1);
        assert!(notification.is_none());

        project.tempos.push(Tempo::new(1920, 150.0));
        let (flat, notification) = project.with_single_tempo();
        assert_eq!(flat.tempos, vec![Tempo::DEFAULT]);
        assert_eq!(notification, Some(ExportNotification::TempoChangeIgnored));

        project.time_signatures.push(TimeSignature::new(4, 6, 8));
        let (flat, notification) = project.with_single_time_signature();
        assert_eq!(flat.time_signatures.len(), 1);
        assert_eq!(notification, Some(ExportNotification::TimeSignatureIgnored));
    }

    #[test]
    fn empty_tracks_have_no_content() {
        let mut project = Project::new("test");
        project.tracks.push(Track::new(0, "empty", Vec::new()));
        assert!(!project.has_content());

        project.tracks.push(Track::new(1, "vocal", vec![note(0, 480)]));
        assert!(project.has_content());
    }
}
