pub const DEFAULT_SMOOTHING: f32 = 0.5;

/// Exponential moving average over successive snapshots.
///
/// The smoother owns exactly one retained snapshot. `smooth` hands out a
/// borrowed view of it, so callers cannot hold on to the buffer across ticks.
#[derive(Clone, Debug)]
pub struct TemporalSmoother {
    coefficient: f32,
    retained: Option<Vec<u8>>,
}

impl Default for TemporalSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING)
    }
}

impl TemporalSmoother {
    pub fn new(coefficient: f32) -> Self {
        Self {
            coefficient: clamp_coefficient(coefficient),
            retained: None,
        }
    }

    /// 0 passes input through unchanged, 1 freezes the retained state.
    pub fn set_coefficient(&mut self, coefficient: f32) {
        self.coefficient = clamp_coefficient(coefficient);
    }

    pub fn coefficient(&self) -> f32 {
        self.coefficient
    }

    pub fn smooth(&mut self, incoming: &[u8]) -> &[u8] {
        let alpha = 1.0 - self.coefficient;
        let reusable = self
            .retained
            .as_ref()
            .is_some_and(|r| r.len() == incoming.len());
        if !reusable {
            // First tick or analyser reconfiguration: adopt the input as-is.
            return self.retained.insert(incoming.to_vec()).as_slice();
        }

        let retained = self.retained.get_or_insert_with(Vec::new);
        for (r, &x) in retained.iter_mut().zip(incoming) {
            let blended = alpha * x as f32 + (1.0 - alpha) * *r as f32;
            *r = blended.round().clamp(0.0, 255.0) as u8;
        }
        retained.as_slice()
    }

    pub fn retained(&self) -> Option<&[u8]> {
        self.retained.as_deref()
    }

    pub fn reset(&mut self) {
        self.retained = None;
    }
}

fn clamp_coefficient(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_adopts_input() {
        let mut smoother = TemporalSmoother::new(0.9);
        assert_eq!(smoother.smooth(&[10, 20, 30]), &[10, 20, 30]);
    }

    #[test]
    fn blends_toward_input() {
        let mut smoother = TemporalSmoother::new(0.5);
        smoother.smooth(&[0, 100]);
        assert_eq!(smoother.smooth(&[100, 0]), &[50, 50]);
        assert_eq!(smoother.smooth(&[100, 0]), &[75, 25]);
    }

    #[test]
    fn length_change_resets_state() {
        let mut smoother = TemporalSmoother::new(1.0);
        smoother.smooth(&[1, 2, 3]);
        assert_eq!(smoother.smooth(&[9, 9]), &[9, 9]);
        assert_eq!(smoother.smooth(&[0, 0]), &[9, 9]);
    }

    #[test]
    fn coefficient_is_clamped() {
        let mut smoother = TemporalSmoother::new(4.0);
        assert_eq!(smoother.coefficient(), 1.0);
        smoother.set_coefficient(-1.0);
        assert_eq!(smoother.coefficient(), 0.0);
        smoother.set_coefficient(f32::NAN);
        assert_eq!(smoother.coefficient(), 0.0);
    }

    #[test]
    fn reset_forgets_history() {
        let mut smoother = TemporalSmoother::new(1.0);
        smoother.smooth(&[5]);
        smoother.reset();
        assert!(smoother.retained().is_none());
        assert_eq!(smoother.smooth(&[7]), &[7]);
    }
}
