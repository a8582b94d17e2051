//! First-order low-pass filtering for smoothing noisy measurements.
//!
//! Both smoothing points in the pipeline use the same recursive blend: the
//! detection stage damps bounding-box jitter and the motion controller damps
//! the ramped servo angles. The filter is parameterized by a time constant
//! `rc` and the sample interval `dt`, both in seconds.

/// Single low-pass step: blend a new sample with the previous output.
///
/// `alpha = dt / (rc + dt)`; the result is `alpha * x + (1 - alpha) * y_old`.
/// With `rc = 0` the sample passes through unchanged. NaN inputs propagate.
#[must_use]
pub fn low_pass(x: f64, y_old: f64, rc: f64, dt: f64) -> f64 {
    let alpha = dt / (rc + dt);
    alpha.mul_add(x, (1.0 - alpha) * y_old)
}

/// Stateful first-order low-pass filter for a single signal.
pub struct LowPass {
    rc: f64,
    dt: f64,
    last: Option<f64>,
}

impl LowPass {
    /// Create an unseeded filter; the first sample passes through and
    /// becomes the initial state.
    ///
    /// # Panics
    ///
    /// Panics if `rc` is negative or `dt` is not positive.
    #[must_use]
    pub fn new(rc: f64, dt: f64) -> Self {
        assert!(rc >= 0.0, "Time constant must be non-negative");
        assert!(dt > 0.0, "Sample interval must be positive");
        Self { rc, dt, last: None }
    }

    /// Create a filter whose state is already seeded with `initial`.
    #[must_use]
    pub fn seeded(rc: f64, dt: f64, initial: f64) -> Self {
        let mut filter = Self::new(rc, dt);
        filter.last = Some(initial);
        filter
    }

    /// Smoothing factor applied to each new sample.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.dt / (self.rc + self.dt)
    }

    /// Feed one sample and return the filtered output.
    pub fn apply(&mut self, x: f64) -> f64 {
        let filtered = match self.last {
            Some(last) => low_pass(x, last, self.rc, self.dt),
            None => x,
        };
        self.last = Some(filtered);
        filtered
    }

    /// Clear the filter state; the next sample passes through.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_sample_passes_through() {
        let mut filter = LowPass::new(0.1, 0.01);
        assert_eq!(filter.apply(10.0), 10.0);
    }

    #[test]
    fn test_seeded_filter_blends_first_sample() {
        let mut filter = LowPass::seeded(0.1, 0.01, 0.0);
        let alpha = filter.alpha();
        let out = filter.apply(10.0);
        assert!((out - alpha * 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_step_function_matches_reference() {
        // rc = 50 ms at a 30 Hz sample rate gives alpha = 0.4
        let dt = 1.0 / 30.0;
        let alpha: f64 = dt / (0.05 + dt);
        assert!((alpha - 0.4).abs() < 1e-12);
        assert!((low_pass(100.0, 0.0, 0.05, dt) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_input_converges_monotonically() {
        let mut filter = LowPass::seeded(0.1, 0.01, 0.0);
        let alpha = filter.alpha();
        let target = 50.0;

        let mut error = target;
        for _ in 0..200 {
            let out = filter.apply(target);
            let new_error = target - out;
            // Residual shrinks by exactly (1 - alpha) each step
            assert!((new_error - error * (1.0 - alpha)).abs() < 1e-9);
            assert!(new_error >= 0.0);
            error = new_error;
        }
        assert!(error < 1e-3);
    }

    #[test]
    fn test_zero_time_constant_is_passthrough() {
        let mut filter = LowPass::seeded(0.0, 0.01, 123.0);
        assert_eq!(filter.apply(-7.5), -7.5);
        assert_eq!(filter.apply(42.0), 42.0);
    }

    #[test]
    fn test_nan_propagates() {
        let mut filter = LowPass::seeded(0.1, 0.01, 0.0);
        assert!(filter.apply(f64::NAN).is_nan());
        // State is now poisoned, as expected for an unguarded recursive blend
        assert!(filter.apply(1.0).is_nan());
    }

    #[test]
    fn test_reset_clears_state() {
        let mut filter = LowPass::new(0.1, 0.01);
        filter.apply(10.0);
        filter.apply(20.0);
        filter.reset();
        assert_eq!(filter.apply(5.0), 5.0);
    }

    #[test]
    #[should_panic(expected = "Sample interval must be positive")]
    fn test_zero_dt_panics() {
        let _ = LowPass::new(0.1, 0.0);
    }

    proptest! {
        #[test]
        fn prop_output_stays_between_state_and_sample(
            x in -1.0e6..1.0e6f64,
            y_old in -1.0e6..1.0e6f64,
            rc in 0.0..10.0f64,
            dt in 1.0e-4..1.0f64,
        ) {
            let out = low_pass(x, y_old, rc, dt);
            let tolerance = 1e-9 * (1.0 + x.abs().max(y_old.abs()));
            prop_assert!(out >= x.min(y_old) - tolerance);
            prop_assert!(out <= x.max(y_old) + tolerance);
        }

        #[test]
        fn prop_residual_shrinks_by_one_minus_alpha(
            target in -1.0e6..1.0e6f64,
            start in -1.0e6..1.0e6f64,
            rc in 0.0..10.0f64,
            dt in 1.0e-4..1.0f64,
        ) {
            let mut filter = LowPass::seeded(rc, dt, start);
            let alpha = filter.alpha();
            let tolerance = 1e-9 * (1.0 + target.abs() + start.abs());

            let mut error = target - start;
            for _ in 0..8 {
                let out = filter.apply(target);
                let next_error = target - out;
                prop_assert!((next_error - (1.0 - alpha) * error).abs() <= tolerance);
                error = next_error;
            }
        }
    }
}
