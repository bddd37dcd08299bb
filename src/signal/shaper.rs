use serde::{Deserialize, Serialize};

/// Largest representable snapshot magnitude.
pub const MAX_MAGNITUDE: u8 = u8::MAX;

/// Frequency band of a snapshot index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Band {
    Bass,
    Mid,
    Treble,
}

impl Band {
    /// Band of index `i` in a snapshot of `n` samples: the first 10% of the
    /// index range is bass, up to 50% is mid, the rest treble.
    pub fn of(i: usize, n: usize) -> Band {
        if i.saturating_mul(10) < n {
            Band::Bass
        } else if i.saturating_mul(2) < n {
            Band::Mid
        } else {
            Band::Treble
        }
    }
}

/// Per-band gain plus a global sensitivity factor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandWeights {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub sensitivity: f32,
}

impl Default for BandWeights {
    fn default() -> Self {
        Self {
            bass: 1.0,
            mid: 1.0,
            treble: 1.0,
            sensitivity: 1.0,
        }
    }
}

impl BandWeights {
    pub fn gain(&self, band: Band) -> f32 {
        match band {
            Band::Bass => self.bass,
            Band::Mid => self.mid,
            Band::Treble => self.treble,
        }
    }

    /// Split points `(bass_end, mid_end)`: bass is `0..bass_end`, mid is
    /// `bass_end..mid_end`, treble is `mid_end..n`.
    pub fn band_bounds(n: usize) -> (usize, usize) {
        (n.div_ceil(10), n.div_ceil(2))
    }
}

/// Apply band gains and sensitivity to `snapshot`, clamping to the magnitude
/// ceiling.
pub fn shape(snapshot: &[u8], weights: &BandWeights) -> Vec<u8> {
    let mut out = Vec::with_capacity(snapshot.len());
    shape_into(snapshot, weights, &mut out);
    out
}

/// Allocation-reusing form of [`shape`]; `out` is overwritten.
pub fn shape_into(snapshot: &[u8], weights: &BandWeights, out: &mut Vec<u8>) {
    let n = snapshot.len();
    let (bass_end, mid_end) = BandWeights::band_bounds(n);
    out.clear();
    out.extend(snapshot.iter().enumerate().map(|(i, &value)| {
        let band = if i < bass_end {
            Band::Bass
        } else if i < mid_end {
            Band::Mid
        } else {
            Band::Treble
        };
        scale(value, weights.gain(band) * weights.sensitivity)
    }));
}

fn scale(value: u8, factor: f32) -> u8 {
    let scaled = (value as f32 * factor).round();
    // NaN factors fall through to 0 via the saturating cast.
    scaled.clamp(0.0, MAX_MAGNITUDE as f32) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousand_sample_partition_is_exact() {
        let n = 1000;
        for i in 0..n {
            let expected = match i {
                0..=99 => Band::Bass,
                100..=499 => Band::Mid,
                _ => Band::Treble,
            };
            assert_eq!(Band::of(i, n), expected, "index {i}");
        }
        assert_eq!(BandWeights::band_bounds(n), (100, 500));
    }

    #[test]
    fn bounds_agree_with_band_of_for_odd_sizes() {
        for n in [1usize, 7, 11, 99, 1023, 1024] {
            let (bass_end, mid_end) = BandWeights::band_bounds(n);
            for i in 0..n {
                let by_bounds = if i < bass_end {
                    Band::Bass
                } else if i < mid_end {
                    Band::Mid
                } else {
                    Band::Treble
                };
                assert_eq!(by_bounds, Band::of(i, n), "n={n} i={i}");
            }
        }
    }

    #[test]
    fn saturates_at_ceiling() {
        let snapshot = vec![200u8; 1000];
        let weights = BandWeights {
            bass: 2.0,
            sensitivity: 3.0,
            ..BandWeights::default()
        };
        let shaped = shape(&snapshot, &weights);
        assert!(shaped[..100].iter().all(|&v| v == 255));
        // mid and treble: 200 * 1.0 * 3.0 clamps as well
        assert!(shaped[100..].iter().all(|&v| v == 255));
    }

    #[test]
    fn each_band_uses_its_own_gain() {
        let snapshot = vec![100u8; 10];
        let weights = BandWeights {
            bass: 0.5,
            mid: 1.0,
            treble: 2.0,
            sensitivity: 1.0,
        };
        let shaped = shape(&snapshot, &weights);
        assert_eq!(shaped[0], 50);
        assert_eq!(&shaped[1..5], &[100, 100, 100, 100]);
        assert!(shaped[5..].iter().all(|&v| v == 200));
    }

    #[test]
    fn negative_and_nan_gains_floor_at_zero() {
        let weights = BandWeights {
            bass: -1.0,
            mid: f32::NAN,
            ..BandWeights::default()
        };
        let shaped = shape(&[255; 10], &weights);
        assert_eq!(shaped[0], 0);
        assert_eq!(shaped[1], 0);
        assert_eq!(shaped[9], 255);
    }

    #[test]
    fn empty_snapshot_is_fine() {
        assert!(shape(&[], &BandWeights::default()).is_empty());
    }
}
