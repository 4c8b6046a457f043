use crate::model::project::Tempo;
use crate::time::TICKS_IN_BEAT;

const SECONDS_PER_MINUTE: f64 = 60.0;

/// A stretch of the timeline played at one tempo.
#[derive(Debug, Clone)]
struct TempoSegment {
    start_tick: i64,
    sec_per_tick: f64,
    sec_at_start: f64,
}

/// Converts between ticks and seconds along a tempo map.
///
/// Built once per tempo list. Segments are contiguous, the last one runs to
/// infinity, and a tick sitting exactly on a tempo change belongs to the
/// segment starting there.
#[derive(Debug, Clone)]
pub struct TickTimeTransformer {
    segments: Vec<TempoSegment>,
}

impl TickTimeTransformer {
    /// `tempos` must be sorted by tick with the first at tick 0. An empty
    /// list behaves like the default tempo.
    pub fn new(tempos: &[Tempo]) -> Self {
        Self::with_ticks_per_beat(tempos, TICKS_IN_BEAT)
    }

    pub fn with_ticks_per_beat(tempos: &[Tempo], ticks_per_beat: i64) -> Self {
        let default = [Tempo::DEFAULT];
        let tempos = if tempos.is_empty() { &default[..] } else { tempos };

        let mut segments: Vec<TempoSegment> = Vec::with_capacity(tempos.len());
        let mut sec_accum = 0.0;

        for tempo in tempos {
            if let Some(previous) = segments.last() {
                sec_accum += (tempo.tick_position - previous.start_tick) as f64 * previous.sec_per_tick;
            }

            segments.push(TempoSegment {
                start_tick: tempo.tick_position,
                sec_per_tick: SECONDS_PER_MINUTE / (ticks_per_beat as f64 * tempo.bpm),
                sec_at_start: sec_accum,
            });
        }

        Self { segments }
    }

    pub fn tick_to_sec(&self, tick: i64) -> f64 {
        let index = self.segments.partition_point(|seg| seg.start_tick <= tick);
        let segment = &self.segments[index.saturating_sub(1)];

        segment.sec_at_start + (tick - segment.start_tick) as f64 * segment.sec_per_tick
    }

    pub fn tick_to_milli_sec(&self, tick: i64) -> f64 {
        self.tick_to_sec(tick) * 1000.0
    }

    /// Inverse of [`tick_to_sec`](Self::tick_to_sec), rounded to the nearest tick.
    pub fn sec_to_tick(&self, sec: f64) -> i64 {
        let index = self.segments.partition_point(|seg| seg.sec_at_start <= sec);
        let segment = &self.segments[index.saturating_sub(1)];

        segment.start_tick + ((sec - segment.sec_at_start) / segment.sec_per_tick).round() as i64
    }

    pub fn milli_sec_to_tick(&self, milli_sec: f64) -> i64 {
        self.sec_to_tick(milli_sec / 1000.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn single_tempo() {
        let transformer = TickTimeTransformer::new(&[Tempo::new(0, 120.0)]);
        assert_eq!(transformer.tick_to_sec(480), 0.5);
        assert_eq!(transformer.tick_to_sec(0), 0.0);
        assert_eq!(transformer.sec_to_tick(0.5), 480);
    }

    #[test]
    fn tempo_change_accumulates_offsets() {
        let transformer = TickTimeTransformer::new(&[Tempo::new(0, 120.0), Tempo::new(960, 60.0)]);

        // two beats at 120bpm, then one second per beat
        assert!(approx_eq(transformer.tick_to_sec(960), 1.0));
        assert!(approx_eq(transformer.tick_to_sec(1440), 2.0));
        assert!(approx_eq(transformer.tick_to_sec(1920), 3.0));

        assert_eq!(transformer.sec_to_tick(1.0), 960);
        assert_eq!(transformer.sec_to_tick(2.5), 1680);
    }

    #[test]
    fn boundary_tick_belongs_to_later_segment() {
        let transformer = TickTimeTransformer::new(&[Tempo::new(0, 60.0), Tempo::new(480, 240.0)]);
        assert!(approx_eq(transformer.tick_to_sec(480), 1.0));
        assert!(approx_eq(transformer.tick_to_sec(600), 1.0625));
    }

    #[test]
    fn fractional_bpm_round_trips() {
        let tempos = vec![
            Tempo::new(0, 128.37),
            Tempo::new(1234, 97.5),
            Tempo::new(5000, 181.25),
        ];
        let transformer = TickTimeTransformer::new(&tempos);

        for tick in [0, 1, 479, 1233, 1234, 1235, 4999, 5000, 12345] {
            let sec = transformer.tick_to_sec(tick);
            assert_eq!(transformer.sec_to_tick(sec), tick);
        }
    }

    #[test]
    fn milliseconds() {
        let transformer = TickTimeTransformer::new(&[]);
        assert!(approx_eq(transformer.tick_to_milli_sec(960), 1000.0));
        assert_eq!(transformer.milli_sec_to_tick(250.0), 240);
    }
}
