use crate::adapter::{BendData, BendEvent, PitchAdapter, SectionedBend};
use crate::error::{ConvertError, Result};
use crate::model::project::{
    DEFAULT_LYRIC, ExportNotification, ExportResult, KEY_RANGE, Note, Project, Tempo, TimeSignature, Track,
};
use crate::time::{
    TICKS_IN_BEAT, TickCounter, normalize_tempos, normalize_time_signatures, signature_ticks, tempos_from_tracks,
    time_signatures_from_tracks,
};
use log::{debug, warn};
use midly::{
    Format as SmfFormat, Header, MetaMessage, MidiMessage, PitchBend, Smf, Timing, Track as SmfTrack, TrackEvent,
    TrackEventKind, num::u28,
};
use std::collections::HashMap;

const MICROSECONDS_PER_MINUTE: f64 = 60_000_000.0;
const DEFAULT_VELOCITY: u8 = 100;
const CHANNEL: u8 = 0;
const MAX_DENOMINATOR_POWER: u8 = 6;
const MAX_MICROSECONDS_PER_QUARTER: f64 = 16_777_215.0;
const MAX_SMF_TICK: i64 = (1 << 28) - 1;

const CC_RPN_MSB: u8 = 101;
const CC_RPN_LSB: u8 = 100;
const CC_DATA_ENTRY_MSB: u8 = 6;
const CC_DATA_ENTRY_LSB: u8 = 38;

const MIDI_CLOCKS_PER_CLICK: u8 = 24;
const THIRTY_SECONDS_PER_QUARTER: u8 = 8;

#[derive(Debug, Default)]
struct ParsedTrack {
    name: Option<String>,
    notes: Vec<Note>,
    tempos: Vec<Tempo>,
    time_signatures: Vec<TimeSignature>,
    bends: BendData,
}

/// Registered parameter number selected on a channel, as far as we care.
#[derive(Debug, Default, Clone, Copy)]
struct RpnState {
    msb: Option<u8>,
    lsb: Option<u8>,
}

impl RpnState {
    fn selects_bend_sensitivity(&self) -> bool {
        self.msb == Some(0) && self.lsb == Some(0)
    }
}

struct NoteInterval {
    key: u8,
    start_tick: i64,
    end_tick: i64,
}

fn close_note(
    open_notes: &mut HashMap<(u8, u8), Vec<i64>>,
    intervals: &mut Vec<NoteInterval>,
    channel: u8,
    key: u8,
    tick: i64,
) {
    match open_notes.get_mut(&(channel, key)).and_then(|stack| stack.pop()) {
        Some(start_tick) => intervals.push(NoteInterval {
            key,
            start_tick,
            end_tick: tick,
        }),
        None => debug!("Orphaned NoteOff for {} ch{} at tick {}..!", key, channel, tick),
    }
}

/// Collect one track in the file's own resolution.
fn parse_track(events: &[TrackEvent<'_>], ticks_per_beat: i64, index: usize) -> ParsedTrack {
    let mut parsed = ParsedTrack::default();
    let mut tick: i64 = 0;

    let mut open_notes: HashMap<(u8, u8), Vec<i64>> = HashMap::new();
    let mut intervals: Vec<NoteInterval> = Vec::new();
    let mut lyrics: HashMap<i64, String> = HashMap::new();
    let mut rpn: HashMap<u8, RpnState> = HashMap::new();
    let mut signatures: Vec<(i64, i32, i32)> = Vec::new();

    for event in events {
        tick += event.delta.as_int() as i64;

        match &event.kind {
            TrackEventKind::Meta(meta) => match meta {
                MetaMessage::Tempo(micro) => {
                    let mpqn = micro.as_int();
                    if mpqn == 0 {
                        warn!("Ignoring a zero tempo at tick {} in track {}..!", tick, index);
                        continue;
                    }
                    let bpm = MICROSECONDS_PER_MINUTE / mpqn as f64;
                    debug!("Tempo change at tick {} -> {} bpm (track {})", tick, bpm, index);
                    parsed.tempos.push(Tempo::new(tick, bpm));
                }
                MetaMessage::TimeSignature(numerator, power, _, _) => {
                    if *power > MAX_DENOMINATOR_POWER || *numerator == 0 {
                        warn!(
                            "Ignoring invalid time signature {}/2^{} at tick {}..!",
                            numerator, power, tick
                        );
                        continue;
                    }
                    signatures.push((tick, *numerator as i32, 1 << power));
                }
                MetaMessage::TrackName(bytes) => {
                    if parsed.name.is_none() {
                        let name = String::from_utf8_lossy(bytes).into_owned();
                        debug!("Track name: {}", name);
                        parsed.name = Some(name);
                    }
                }
                MetaMessage::Lyric(bytes) => {
                    lyrics
                        .entry(tick)
                        .or_insert_with(|| String::from_utf8_lossy(bytes).trim().to_string());
                }
                _ => {}
            },
            TrackEventKind::Midi { channel, message } => {
                let channel = channel.as_int();

                match message {
                    MidiMessage::NoteOn { key, vel } => {
                        if vel.as_int() == 0 {
                            close_note(&mut open_notes, &mut intervals, channel, key.as_int(), tick);
                        } else {
                            open_notes.entry((channel, key.as_int())).or_default().push(tick);
                        }
                    }
                    MidiMessage::NoteOff { key, vel: _ } => {
                        close_note(&mut open_notes, &mut intervals, channel, key.as_int(), tick);
                    }
                    MidiMessage::Controller { controller, value } => {
                        let state = rpn.entry(channel).or_default();
                        match controller.as_int() {
                            CC_RPN_MSB => state.msb = Some(value.as_int()),
                            CC_RPN_LSB => state.lsb = Some(value.as_int()),
                            CC_DATA_ENTRY_MSB if state.selects_bend_sensitivity() => {
                                parsed
                                    .bends
                                    .sensitivities
                                    .push(BendEvent::new(tick, value.as_int() as i32));
                            }
                            _ => {}
                        }
                    }
                    MidiMessage::PitchBend { bend } => {
                        parsed.bends.bends.push(BendEvent::new(tick, bend.as_int() as i32));
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    for ((channel, key), stack) in open_notes {
        for start_tick in stack {
            let end_tick = if tick > start_tick {
                tick
            } else {
                start_tick + ticks_per_beat
            };
            warn!(
                "Unclosed NoteOn for {}, channel: {} at tick: {} auto-closing at: {}..!",
                key, channel, start_tick, end_tick
            );
            intervals.push(NoteInterval {
                key,
                start_tick,
                end_tick,
            });
        }
    }

    intervals.sort_by_key(|interval| (interval.start_tick, interval.end_tick));
    parsed.notes = intervals
        .into_iter()
        .enumerate()
        .map(|(id, interval)| {
            let lyric = lyrics
                .get(&interval.start_tick)
                .filter(|lyric| !lyric.is_empty())
                .cloned()
                .unwrap_or_else(|| DEFAULT_LYRIC.to_string());
            Note::new(id as i32, interval.key as i32, lyric, interval.start_tick, interval.end_tick)
        })
        .collect();

    signatures.sort_by_key(|&(tick, _, _)| tick);
    let mut counter = TickCounter::with_ticks_in_full_note(ticks_per_beat * 4);
    parsed.time_signatures = signatures
        .into_iter()
        .map(|(tick, numerator, denominator)| {
            counter.go_to_tick(tick, Some(numerator), Some(denominator));
            TimeSignature::new(counter.measure(), numerator, denominator)
        })
        .collect();

    parsed
}

/// Read a Standard MIDI File. Every track with notes becomes a track of the
/// project; tempo and time signature maps come from the first track that
/// has any.
pub fn parse_midi(bytes: &[u8], name: &str) -> Result<Project> {
    let smf = Smf::parse(bytes).map_err(|e| ConvertError::Midi(format!("Failed to parse MIDI: {}", e)))?;

    let ticks_per_beat = match smf.header.timing {
        Timing::Metrical(t) => t.as_int() as i64,
        Timing::Timecode(fps, subframe) => {
            return Err(ConvertError::UnsupportedTiming(format!(
                "SMPTE timecode at {} fps with {} subframes",
                fps.as_int(),
                subframe
            )));
        }
    };
    if ticks_per_beat == 0 {
        return Err(ConvertError::Malformed {
            format: "midi",
            reason: "zero ticks per quarter note".to_string(),
        });
    }

    debug!("Ticks per quarter note: {}", ticks_per_beat);
    debug!("MIDI format: {:?}, tracks: {}", smf.header.format, smf.tracks.len());

    let parsed: Vec<ParsedTrack> = smf
        .tracks
        .iter()
        .enumerate()
        .map(|(index, track)| parse_track(track, ticks_per_beat, index))
        .collect();

    let mut warnings = Vec::new();
    let tempos = tempos_from_tracks(parsed.iter().map(|t| t.tempos.clone()).collect(), &mut warnings);
    let tempos = normalize_tempos(tempos, 0, &mut warnings);
    let time_signatures = time_signatures_from_tracks(
        parsed.iter().map(|t| t.time_signatures.clone()).collect(),
        &mut warnings,
    );
    let time_signatures = normalize_time_signatures(time_signatures, 0, &mut warnings);

    let tracks = parsed
        .into_iter()
        .filter(|track| !track.notes.is_empty())
        .enumerate()
        .map(|(id, track)| {
            let pitch = SectionedBend::default()
                .decode(&track.bends, &track.notes, &tempos)?
                .map(|pitch| pitch.reduced());
            Ok(Track {
                id: id as i32,
                name: track.name.unwrap_or_else(|| format!("Track {}", id + 1)),
                notes: track.notes,
                pitch,
            })
        })
        .collect::<Result<Vec<Track>>>()?;

    let project = Project {
        name: name.to_string(),
        tracks,
        tempos,
        time_signatures,
        measure_prefix: 0,
        import_warnings: warnings,
    };
    let project = if ticks_per_beat == TICKS_IN_BEAT {
        project
    } else {
        debug!("Rescaling from {} to {} ticks per quarter note", ticks_per_beat, TICKS_IN_BEAT);
        project.time_scaled(TICKS_IN_BEAT as f64 / ticks_per_beat as f64)
    };
    Ok(project.validated())
}

/// Absolute tick as a 28-bit delta slot, clamped instead of wrapped.
fn tick_delta(tick: i64) -> u28 {
    if !(0..=MAX_SMF_TICK).contains(&tick) {
        warn!("Tick {} does not fit in a MIDI file, clamping..!", tick);
    }
    (tick.clamp(0, MAX_SMF_TICK) as u32).into()
}

fn meta_at(tick: i64, meta: MetaMessage<'_>) -> TrackEvent<'_> {
    TrackEvent {
        delta: tick_delta(tick),
        kind: TrackEventKind::Meta(meta),
    }
}

fn midi_at<'a>(tick: i64, message: MidiMessage) -> TrackEvent<'a> {
    TrackEvent {
        delta: tick_delta(tick),
        kind: TrackEventKind::Midi {
            channel: CHANNEL.into(),
            message,
        },
    }
}

fn controller_at<'a>(tick: i64, controller: u8, value: u8) -> TrackEvent<'a> {
    midi_at(
        tick,
        MidiMessage::Controller {
            controller: controller.into(),
            value: value.into(),
        },
    )
}

/// Sort by absolute tick, turn into deltas and close the track.
fn finish_track(mut events: Vec<TrackEvent<'_>>) -> SmfTrack<'_> {
    events.sort_by_key(|e| e.delta.as_int());
    convert_to_delta_times(&mut events);
    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    events
}

fn convert_to_delta_times(events: &mut [TrackEvent<'_>]) {
    let mut prev_tick = 0u32;
    for event in events.iter_mut() {
        let current_tick = event.delta.as_int();
        event.delta = current_tick.saturating_sub(prev_tick).into();
        prev_tick = current_tick;
    }
}

fn build_conductor_track(project: &Project) -> SmfTrack<'_> {
    let mut events = vec![meta_at(0, MetaMessage::TrackName(project.name.as_bytes()))];

    for tempo in &project.tempos {
        let mpqn = (MICROSECONDS_PER_MINUTE / tempo.bpm).round().clamp(1.0, MAX_MICROSECONDS_PER_QUARTER) as u32;
        events.push(meta_at(tempo.tick_position, MetaMessage::Tempo(mpqn.into())));
    }

    for (signature, tick) in project.time_signatures.iter().zip(signature_ticks(&project.time_signatures)) {
        let denominator_power = (signature.denominator.max(1) as f32).log2() as u8;
        if 1 << denominator_power != signature.denominator {
            warn!(
                "Time signature denominator {} is not a power of two, writing 2^{} instead..!",
                signature.denominator, denominator_power
            );
        }
        events.push(meta_at(
            tick,
            MetaMessage::TimeSignature(
                signature.numerator.clamp(1, u8::MAX as i32) as u8,
                denominator_power,
                MIDI_CLOCKS_PER_CLICK,
                THIRTY_SECONDS_PER_QUARTER,
            ),
        ));
    }

    finish_track(events)
}

fn build_note_track<'a>(
    track: &'a Track,
    tempos: &[Tempo],
    notifications: &mut Vec<ExportNotification>,
) -> Result<SmfTrack<'a>> {
    let mut events = vec![meta_at(0, MetaMessage::TrackName(track.name.as_bytes()))];

    for note in &track.notes {
        if !KEY_RANGE.contains(&note.key) {
            warn!("Dropping note {} with out-of-range key {}..!", note.id, note.key);
            continue;
        }
        let key = (note.key as u8).into();
        events.push(meta_at(note.tick_on, MetaMessage::Lyric(note.lyric.as_bytes())));
        events.push(midi_at(
            note.tick_on,
            MidiMessage::NoteOn {
                key,
                vel: DEFAULT_VELOCITY.into(),
            },
        ));
        events.push(midi_at(note.tick_off, MidiMessage::NoteOff { key, vel: 0.into() }));
    }

    if track.notes.iter().any(|note| note.phoneme.is_some()) {
        notifications.push(ExportNotification::PhonemeResetRequired);
    }

    if let Some(pitch) = track.pitch.as_ref().filter(|pitch| !pitch.is_empty()) {
        let data = SectionedBend::default().encode(pitch, &track.notes, tempos)?;

        for sensitivity in &data.sensitivities {
            let value = sensitivity.value.clamp(0, 127) as u8;
            events.push(controller_at(sensitivity.tick, CC_RPN_MSB, 0));
            events.push(controller_at(sensitivity.tick, CC_RPN_LSB, 0));
            events.push(controller_at(sensitivity.tick, CC_DATA_ENTRY_MSB, value));
            events.push(controller_at(sensitivity.tick, CC_DATA_ENTRY_LSB, 0));
        }
        for bend in &data.bends {
            events.push(midi_at(
                bend.tick,
                MidiMessage::PitchBend {
                    bend: PitchBend::from_int(bend.value as i16),
                },
            ));
        }

        if !data.is_empty() {
            debug!(
                "Wrote {} bend and {} sensitivity event(s) for track '{}'..!",
                data.bends.len(),
                data.sensitivities.len(),
                track.name
            );
            notifications.push(ExportNotification::PitchDataExported);
        }
    }

    Ok(finish_track(events))
}

/// Write the project as an SMF format 1 file at 480 ticks per quarter note:
/// a conductor track followed by one track per project track.
pub fn generate_midi(project: &Project) -> Result<ExportResult> {
    let mut notifications = Vec::new();
    let mut tracks = vec![build_conductor_track(project)];
    for track in &project.tracks {
        tracks.push(build_note_track(track, &project.tempos, &mut notifications)?);
    }

    let smf = Smf {
        header: Header {
            format: SmfFormat::Parallel,
            timing: Timing::Metrical((TICKS_IN_BEAT as u16).into()),
        },
        tracks,
    };

    let mut data = Vec::new();
    smf.write(&mut data)
        .map_err(|e| ConvertError::Midi(format!("Failed to write MIDI: {}", e)))?;

    let mut result = ExportResult {
        data,
        notifications: Vec::new(),
    };
    for notification in notifications {
        result.notify(notification);
    }
    Ok(result)
}
