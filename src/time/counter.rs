use crate::model::project::TimeSignature;
use crate::time::TICKS_IN_FULL_NOTE;

/// Cursor over `(tick, measure)` that knows the time signature in effect.
///
/// Each conversion builds its own counter and walks it forward through the
/// signature events in order; counters are never shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickCounter {
    ticks_in_full_note: i64,
    tick: i64,
    measure: i32,
    numerator: i32,
    denominator: i32,
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TickCounter {
    pub fn new() -> Self {
        Self::with_ticks_in_full_note(TICKS_IN_FULL_NOTE)
    }

    pub fn with_ticks_in_full_note(ticks_in_full_note: i64) -> Self {
        Self {
            ticks_in_full_note,
            tick: 0,
            measure: 0,
            numerator: TimeSignature::DEFAULT.numerator,
            denominator: TimeSignature::DEFAULT.denominator,
        }
    }

    pub fn tick(&self) -> i64 {
        self.tick
    }

    pub fn measure(&self) -> i32 {
        self.measure
    }

    pub fn numerator(&self) -> i32 {
        self.numerator
    }

    pub fn denominator(&self) -> i32 {
        self.denominator
    }

    /// Ticks in one measure of the current signature. Truncating division:
    /// odd denominators such as 5 or 7 lose the remainder.
    pub fn ticks_in_measure(&self) -> i64 {
        self.ticks_in_full_note * self.numerator as i64 / self.denominator as i64
    }

    /// Move to `tick`, counting whole measures with the signature in effect
    /// before the move, then switch to the given signature fields.
    pub fn go_to_tick(&mut self, tick: i64, numerator: Option<i32>, denominator: Option<i32>) {
        let measure_diff = (tick - self.tick).div_euclid(self.ticks_in_measure().max(1));
        self.measure += measure_diff as i32;
        self.tick = tick;
        self.set_signature(numerator, denominator);
    }

    /// Move to the start of `measure`, then switch to the given signature fields.
    pub fn go_to_measure(&mut self, measure: i32, numerator: Option<i32>, denominator: Option<i32>) {
        self.tick += (measure - self.measure) as i64 * self.ticks_in_measure();
        self.measure = measure;
        self.set_signature(numerator, denominator);
    }

    fn set_signature(&mut self, numerator: Option<i32>, denominator: Option<i32>) {
        if let Some(numerator) = numerator {
            self.numerator = numerator;
        }
        if let Some(denominator) = denominator {
            self.denominator = denominator;
        }
    }
}

/// Tick position of every time signature, in list order.
pub fn signature_ticks(time_signatures: &[TimeSignature]) -> Vec<i64> {
    let mut counter = TickCounter::new();
    time_signatures
        .iter()
        .map(|signature| {
            counter.go_to_measure(
                signature.measure_position,
                Some(signature.numerator),
                Some(signature.denominator),
            );
            counter.tick()
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn common_time_measure_length() {
        let counter = TickCounter::new();
        assert_eq!(counter.ticks_in_measure(), 1920);
    }

    #[test]
    fn go_to_measure_from_origin() {
        let mut counter = TickCounter::new();
        counter.go_to_measure(4, None, None);
        assert_eq!(counter.tick(), 7680);
        assert_eq!(counter.measure(), 4);
    }

    #[test]
    fn odd_denominators_truncate() {
        let mut counter = TickCounter::new();
        counter.go_to_measure(0, Some(3), Some(7));
        // 1920 * 3 / 7 = 822.857...
        assert_eq!(counter.ticks_in_measure(), 822);

        counter.go_to_measure(2, Some(5), Some(5));
        assert_eq!(counter.tick(), 1644);
        assert_eq!(counter.ticks_in_measure(), 1920);
    }

    #[test]
    fn go_to_tick_counts_measures_of_previous_signature() {
        let mut counter = TickCounter::new();
        counter.go_to_tick(0, Some(3), Some(4));
        assert_eq!(counter.ticks_in_measure(), 1440);

        counter.go_to_tick(2880, Some(6), Some(8));
        assert_eq!(counter.measure(), 2);
        assert_eq!(counter.numerator(), 6);
        assert_eq!(counter.denominator(), 8);

        // mid-measure positions floor to the measure they fall in
        counter.go_to_tick(2880 + 1440 + 100, None, None);
        assert_eq!(counter.measure(), 3);
    }

    #[test]
    fn go_to_tick_floors_backwards() {
        let mut counter = TickCounter::new();
        counter.go_to_measure(2, None, None);
        counter.go_to_tick(3000, None, None);
        assert_eq!(counter.measure(), 1);
    }

    #[test]
    fn signature_positions_in_ticks() {
        let signatures = vec![
            TimeSignature::new(0, 4, 4),
            TimeSignature::new(2, 3, 4),
            TimeSignature::new(4, 6, 8),
        ];
        assert_eq!(signature_ticks(&signatures), vec![0, 3840, 6720]);
    }
}
