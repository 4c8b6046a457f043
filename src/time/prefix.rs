use crate::model::project::{ImportWarning, Tempo, TimeSignature};
use crate::time::TickCounter;
use log::warn;

/// Ticks taken by the first `measure_prefix` measures. `time_signatures`
/// are in the source's own measure positions, sorted.
pub fn tick_prefix(time_signatures: &[TimeSignature], measure_prefix: i32) -> i64 {
    let mut counter = TickCounter::new();
    for signature in time_signatures
        .iter()
        .filter(|signature| signature.measure_position <= measure_prefix)
    {
        counter.go_to_measure(
            signature.measure_position,
            Some(signature.numerator),
            Some(signature.denominator),
        );
    }
    counter.go_to_measure(measure_prefix, None, None);
    counter.tick()
}

/// Shift signatures out of the prefix and restore the list invariant: sorted,
/// first entry at measure 0, never empty.
pub fn normalize_time_signatures(
    mut events: Vec<TimeSignature>,
    measure_prefix: i32,
    warnings: &mut Vec<ImportWarning>,
) -> Vec<TimeSignature> {
    events.sort_by_key(|signature| signature.measure_position);

    let mut result: Vec<TimeSignature> = Vec::with_capacity(events.len());
    for signature in events {
        let shifted = TimeSignature {
            measure_position: signature.measure_position - measure_prefix,
            ..signature
        };

        if shifted.measure_position < 0 {
            warn!("Time signature {:?} sits in the pre-score measures, ignoring it..!", signature);
            warnings.push(ImportWarning::TimeSignatureIgnoredInPreMeasure(signature));
            continue;
        }

        match result.last_mut() {
            Some(last) if last.measure_position == shifted.measure_position => *last = shifted,
            _ => result.push(shifted),
        }
    }

    match result.first_mut() {
        None => {
            warn!("No time signature found, assuming 4/4..!");
            warnings.push(ImportWarning::TimeSignatureNotFound);
            result.push(TimeSignature::DEFAULT);
        }
        Some(first) => first.measure_position = 0,
    }

    result
}

/// Shift tempos back by `tick_prefix` and restore the list invariant: sorted,
/// first entry at tick 0, never empty.
pub fn normalize_tempos(
    mut events: Vec<Tempo>,
    tick_prefix: i64,
    warnings: &mut Vec<ImportWarning>,
) -> Vec<Tempo> {
    events.sort_by_key(|tempo| tempo.tick_position);

    let mut result: Vec<Tempo> = Vec::with_capacity(events.len());
    for tempo in events {
        let shifted = Tempo::new(tempo.tick_position - tick_prefix, tempo.bpm);

        if shifted.tick_position < 0 {
            warn!("Tempo {:?} sits in the pre-score measures, ignoring it..!", tempo);
            warnings.push(ImportWarning::TempoIgnoredInPreMeasure(tempo));
            continue;
        }

        match result.last_mut() {
            Some(last) if last.tick_position == shifted.tick_position => *last = shifted,
            _ => result.push(shifted),
        }
    }

    match result.first_mut() {
        None => {
            warn!("No tempo found, assuming {} bpm..!", Tempo::DEFAULT.bpm);
            warnings.push(ImportWarning::TempoNotFound);
            result.push(Tempo::DEFAULT);
        }
        Some(first) => first.tick_position = 0,
    }

    result
}

/// Keep the first non-empty list among parallel tracks. Every later
/// non-empty list that differs from it is passed to `on_ignored` with its
/// track index.
pub fn pick_first_non_empty<T: PartialEq>(
    per_track: Vec<Vec<T>>,
    mut on_ignored: impl FnMut(usize, Vec<T>),
) -> Vec<T> {
    let mut chosen: Option<Vec<T>> = None;

    for (track, events) in per_track.into_iter().enumerate() {
        if events.is_empty() {
            continue;
        }
        let Some(kept) = &chosen else {
            chosen = Some(events);
            continue;
        };
        if *kept != events {
            on_ignored(track, events);
        }
    }

    chosen.unwrap_or_default()
}

pub fn tempos_from_tracks(per_track: Vec<Vec<Tempo>>, warnings: &mut Vec<ImportWarning>) -> Vec<Tempo> {
    pick_first_non_empty(per_track, |track, ignored| {
        warn!("Ignoring {} conflicting tempo event(s) in track {}..!", ignored.len(), track);
        warnings.extend(
            ignored
                .into_iter()
                .map(|tempo| ImportWarning::TempoIgnoredInTrack { track, tempo }),
        );
    })
}

pub fn time_signatures_from_tracks(
    per_track: Vec<Vec<TimeSignature>>,
    warnings: &mut Vec<ImportWarning>,
) -> Vec<TimeSignature> {
    pick_first_non_empty(per_track, |track, ignored| {
        warn!(
            "Ignoring {} conflicting time signature event(s) in track {}..!",
            ignored.len(),
            track
        );
        warnings.extend(ignored.into_iter().map(|time_signature| {
            ImportWarning::TimeSignatureIgnoredInTrack {
                track,
                time_signature,
            }
        }));
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prefix_in_ticks() {
        let signatures = vec![TimeSignature::new(0, 3, 4), TimeSignature::new(1, 4, 4)];
        assert_eq!(tick_prefix(&signatures, 1), 1440);
        assert_eq!(tick_prefix(&signatures, 2), 1440 + 1920);
        assert_eq!(tick_prefix(&[], 1), 1920);
        assert_eq!(tick_prefix(&signatures, 0), 0);
    }

    #[test]
    fn signatures_inside_prefix_are_dropped() {
        env_logger::try_init().unwrap_or(());

        let mut warnings = Vec::new();
        let events = vec![TimeSignature::new(3, 3, 4), TimeSignature::new(0, 4, 4)];
        let normalized = normalize_time_signatures(events, 1, &mut warnings);

        assert_eq!(normalized, vec![TimeSignature::new(0, 3, 4)]);
        assert_eq!(
            warnings,
            vec![ImportWarning::TimeSignatureIgnoredInPreMeasure(TimeSignature::new(0, 4, 4))]
        );
    }

    #[test]
    fn missing_signature_defaults() {
        let mut warnings = Vec::new();
        let normalized = normalize_time_signatures(Vec::new(), 0, &mut warnings);
        assert_eq!(normalized, vec![TimeSignature::DEFAULT]);
        assert_eq!(warnings, vec![ImportWarning::TimeSignatureNotFound]);
    }

    #[test]
    fn tempos_shift_and_relocate() {
        env_logger::try_init().unwrap_or(());

        let mut warnings = Vec::new();
        let events = vec![
            Tempo::new(2400, 90.0),
            Tempo::new(0, 100.0),
            Tempo::new(4000, 140.0),
        ];
        let normalized = normalize_tempos(events, 1920, &mut warnings);

        assert_eq!(normalized, vec![Tempo::new(0, 90.0), Tempo::new(2080, 140.0)]);
        assert_eq!(
            warnings,
            vec![ImportWarning::TempoIgnoredInPreMeasure(Tempo::new(0, 100.0))]
        );
    }

    #[test]
    fn duplicate_positions_keep_the_later_event() {
        let mut warnings = Vec::new();
        let normalized = normalize_tempos(
            vec![Tempo::new(0, 100.0), Tempo::new(0, 110.0)],
            0,
            &mut warnings,
        );
        assert_eq!(normalized, vec![Tempo::new(0, 110.0)]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn missing_tempo_defaults() {
        let mut warnings = Vec::new();
        let normalized = normalize_tempos(Vec::new(), 0, &mut warnings);
        assert_eq!(normalized, vec![Tempo::DEFAULT]);
        assert_eq!(warnings, vec![ImportWarning::TempoNotFound]);
    }

    #[test]
    fn first_non_empty_track_wins() {
        env_logger::try_init().unwrap_or(());

        let mut warnings = Vec::new();
        let per_track = vec![
            vec![],
            vec![Tempo::new(0, 120.0)],
            vec![Tempo::new(0, 120.0)],
            vec![Tempo::new(0, 80.0), Tempo::new(960, 90.0)],
        ];
        let tempos = tempos_from_tracks(per_track, &mut warnings);

        assert_eq!(tempos, vec![Tempo::new(0, 120.0)]);
        assert_eq!(
            warnings,
            vec![
                ImportWarning::TempoIgnoredInTrack { track: 3, tempo: Tempo::new(0, 80.0) },
                ImportWarning::TempoIgnoredInTrack { track: 3, tempo: Tempo::new(960, 90.0) },
            ]
        );
    }
}
