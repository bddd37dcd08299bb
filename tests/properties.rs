//! Property-based tests for the signal path: band shaping and temporal
//! smoothing.

use proptest::prelude::*;
use wavecraft::signal::{shape, Band, BandWeights, TemporalSmoother, MAX_MAGNITUDE};

fn weights(bass: f32, mid: f32, treble: f32, sensitivity: f32) -> BandWeights {
    BandWeights {
        bass,
        mid,
        treble,
        sensitivity,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Shaping keeps the length and saturates at the magnitude ceiling
    /// instead of wrapping.
    #[test]
    fn shaped_values_saturate_at_the_ceiling(
        snapshot in prop::collection::vec(any::<u8>(), 0..2048),
        bass in 0.0f32..4.0,
        mid in 0.0f32..4.0,
        treble in 0.0f32..4.0,
        sensitivity in 0.0f32..5.0,
    ) {
        let w = weights(bass, mid, treble, sensitivity);
        let shaped = shape(&snapshot, &w);
        prop_assert_eq!(shaped.len(), snapshot.len());
        let n = snapshot.len();
        for (i, (&input, &output)) in snapshot.iter().zip(&shaped).enumerate() {
            let scaled = (input as f32 * (w.gain(Band::of(i, n)) * w.sensitivity)).round();
            if scaled >= MAX_MAGNITUDE as f32 {
                prop_assert_eq!(output, MAX_MAGNITUDE);
            } else {
                prop_assert_eq!(output as f32, scaled);
            }
        }
    }

    /// Each index is scaled by exactly its own band's gain.
    #[test]
    fn shaping_uses_the_band_of_each_index(
        snapshot in prop::collection::vec(0u8..=100, 1..512),
        bass in 0.0f32..2.0,
        mid in 0.0f32..2.0,
        treble in 0.0f32..2.0,
    ) {
        let w = weights(bass, mid, treble, 1.0);
        let shaped = shape(&snapshot, &w);
        let n = snapshot.len();
        for (i, (&input, &output)) in snapshot.iter().zip(&shaped).enumerate() {
            let expected = (input as f32 * w.gain(Band::of(i, n))).round().min(255.0) as u8;
            prop_assert_eq!(output, expected, "index {} of {}", i, n);
        }
    }

    /// Unit weights are the identity.
    #[test]
    fn unit_weights_pass_through(snapshot in prop::collection::vec(any::<u8>(), 0..1024)) {
        prop_assert_eq!(shape(&snapshot, &BandWeights::default()), snapshot);
    }

    /// A zero coefficient passes each snapshot through untouched.
    #[test]
    fn zero_smoothing_passes_through(
        frames in prop::collection::vec(prop::collection::vec(any::<u8>(), 64), 1..8),
    ) {
        let mut smoother = TemporalSmoother::new(0.0);
        for frame in &frames {
            prop_assert_eq!(smoother.smooth(frame), frame.as_slice());
        }
    }

    /// A coefficient of one freezes the first snapshot.
    #[test]
    fn full_smoothing_freezes_state(
        first in prop::collection::vec(any::<u8>(), 64),
        rest in prop::collection::vec(prop::collection::vec(any::<u8>(), 64), 1..8),
    ) {
        let mut smoother = TemporalSmoother::new(1.0);
        smoother.smooth(&first);
        for frame in &rest {
            prop_assert_eq!(smoother.smooth(frame), first.as_slice());
        }
    }

    /// Smoothed values always lie between the retained and incoming values.
    #[test]
    fn smoothing_interpolates(
        coefficient in 0.0f32..=1.0,
        a in prop::collection::vec(any::<u8>(), 32),
        b in prop::collection::vec(any::<u8>(), 32),
    ) {
        let mut smoother = TemporalSmoother::new(coefficient);
        smoother.smooth(&a);
        let out = smoother.smooth(&b).to_vec();
        for i in 0..32 {
            let (lo, hi) = (a[i].min(b[i]), a[i].max(b[i]));
            prop_assert!(out[i] >= lo && out[i] <= hi, "{} not in {}..={}", out[i], lo, hi);
        }
    }
}

#[test]
fn thousand_samples_split_at_one_hundred_and_five_hundred() {
    assert_eq!(BandWeights::band_bounds(1000), (100, 500));
    assert_eq!(Band::of(99, 1000), Band::Bass);
    assert_eq!(Band::of(100, 1000), Band::Mid);
    assert_eq!(Band::of(499, 1000), Band::Mid);
    assert_eq!(Band::of(500, 1000), Band::Treble);
}

#[test]
fn sensitivity_and_bass_gain_clamp_at_the_ceiling() {
    let mut snapshot = vec![0u8; 100];
    snapshot[0] = 200;
    let shaped = shape(&snapshot, &weights(2.0, 1.0, 1.0, 3.0));
    assert_eq!(shaped[0], 255);
}
