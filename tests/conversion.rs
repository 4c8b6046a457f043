use midly::{Format as SmfFormat, Header, MetaMessage, MidiMessage, PitchBend, Smf, Timing, TrackEvent, TrackEventKind};
use svs_convert::{
    ExportNotification, ExportParams, FormatKind, Format, ImportWarning, PROJECT_JSON, STANDARD_MIDI, export_project,
    import_bytes,
};

fn event(delta: u32, kind: TrackEventKind<'_>) -> TrackEvent<'_> {
    TrackEvent {
        delta: delta.into(),
        kind,
    }
}

fn midi(message: MidiMessage) -> TrackEventKind<'static> {
    TrackEventKind::Midi {
        channel: 0.into(),
        message,
    }
}

/// Two notes with lyrics, a bend up to one semitone inside the first, and a
/// tempo change at the second measure. Written at 960 ticks per quarter.
fn source_midi() -> Vec<u8> {
    let conductor = vec![
        event(0, TrackEventKind::Meta(MetaMessage::Tempo(500_000.into()))),
        event(0, TrackEventKind::Meta(MetaMessage::TimeSignature(4, 2, 24, 8))),
        event(3840, TrackEventKind::Meta(MetaMessage::Tempo(750_000.into()))),
        event(0, TrackEventKind::Meta(MetaMessage::EndOfTrack)),
    ];

    let vocal = vec![
        event(0, TrackEventKind::Meta(MetaMessage::TrackName(b"vocal"))),
        event(0, TrackEventKind::Meta(MetaMessage::Lyric(b"ka"))),
        event(
            0,
            midi(MidiMessage::NoteOn {
                key: 60.into(),
                vel: 100.into(),
            }),
        ),
        event(
            480,
            midi(MidiMessage::PitchBend {
                bend: PitchBend::from_int(4096),
            }),
        ),
        event(
            480,
            midi(MidiMessage::PitchBend {
                bend: PitchBend::from_int(0),
            }),
        ),
        event(
            960,
            midi(MidiMessage::NoteOff {
                key: 60.into(),
                vel: 0.into(),
            }),
        ),
        event(0, TrackEventKind::Meta(MetaMessage::Lyric(b"mi"))),
        event(
            0,
            midi(MidiMessage::NoteOn {
                key: 64.into(),
                vel: 100.into(),
            }),
        ),
        event(
            1920,
            midi(MidiMessage::NoteOff {
                key: 64.into(),
                vel: 0.into(),
            }),
        ),
        event(0, TrackEventKind::Meta(MetaMessage::EndOfTrack)),
    ];

    let smf = Smf {
        header: Header {
            format: SmfFormat::Parallel,
            timing: Timing::Metrical(960.into()),
        },
        tracks: vec![conductor, vocal],
    };
    let mut out = Vec::new();
    smf.write(&mut out).unwrap();
    out
}

#[test]
fn midi_to_json_and_back() {
    env_logger::try_init().unwrap_or(());

    let project = import_bytes(&source_midi(), "source", &STANDARD_MIDI).unwrap();
    assert!(project.import_warnings.is_empty());
    assert_eq!(project.tempos.len(), 2);
    assert_eq!(project.tempos[1].tick_position, 1920);
    assert!((project.tempos[1].bpm - 80.0).abs() < 1e-9);

    let track = &project.tracks[0];
    assert_eq!(track.name, "vocal");
    let notes: Vec<(i32, &str, i64, i64)> = track
        .notes
        .iter()
        .map(|n| (n.key, n.lyric.as_str(), n.tick_on, n.tick_off))
        .collect();
    assert_eq!(notes, vec![(60, "ka", 0, 960), (64, "mi", 960, 1920)]);

    let pitch = track.pitch.as_ref().unwrap();
    assert!(!pitch.is_absolute);
    let peak = pitch.defined_points()[0];
    assert_eq!(peak.0, 240);
    assert!((peak.1 - 1.0).abs() < 1e-3);

    let json = export_project(&project, &PROJECT_JSON, &ExportParams::default()).unwrap();
    assert!(json.notifications.is_empty());
    let from_json = import_bytes(&json.data, "ignored", &PROJECT_JSON).unwrap();
    assert_eq!(from_json.tracks, project.tracks);
    assert_eq!(from_json.tempos, project.tempos);
    assert_eq!(from_json.name, "source");

    let midi = export_project(&from_json, Format::of(FormatKind::StandardMidi), &ExportParams::default()).unwrap();
    assert_eq!(midi.notifications, vec![ExportNotification::PitchDataExported]);

    let back = import_bytes(&midi.data, "back", &STANDARD_MIDI).unwrap();
    assert_eq!(back.tracks[0].notes, project.tracks[0].notes);
    assert_eq!(back.time_signatures, project.time_signatures);

    let restored = back.tracks[0].pitch.as_ref().unwrap();
    let at_peak = restored
        .defined_points()
        .into_iter()
        .rev()
        .find(|(tick, _)| *tick <= 240)
        .map(|(_, value)| value)
        .unwrap();
    assert!((at_peak - 1.0).abs() < 1e-3);
}

#[test]
fn length_limit_through_the_pipeline() {
    let project = import_bytes(&source_midi(), "source", &STANDARD_MIDI).unwrap();
    let params = ExportParams {
        length_limit: Some(1200),
    };

    let result = export_project(&project, &STANDARD_MIDI, &params).unwrap();
    assert!(result.notifications.contains(&ExportNotification::DataOverLengthLimitIgnored));

    let limited = import_bytes(&result.data, "limited", &STANDARD_MIDI).unwrap();
    let last = limited.tracks[0].notes.last().unwrap();
    assert_eq!((last.tick_on, last.tick_off), (960, 1200));
    assert_eq!(limited.tempos.len(), 1);
}

#[test]
fn version_mismatch_is_a_warning() {
    let document = br#"{"formatVersion": 2, "project": {
        "name": "future",
        "tracks": [{"id": 0, "name": "t", "notes": [{"id": 0, "key": 60, "lyric": "a", "tickOn": 0, "tickOff": 480}]}],
        "tempos": [{"tickPosition": 0, "bpm": 120.0}],
        "timeSignatures": [{"measurePosition": 0, "numerator": 4, "denominator": 4}]
    }}"#;
    let project = import_bytes(document, "future", &PROJECT_JSON).unwrap();

    assert_eq!(
        project.import_warnings,
        vec![ImportWarning::IncompatibleFormatSerializationVersion { current: 1, imported: 2 }]
    );
    assert!(export_project(&project, &STANDARD_MIDI, &ExportParams::default()).is_ok());
}
