use core::f32::consts::PI;

use nalgebra::Vector3;

/// First order low-pass filter with a fixed cutoff and a variable sample period.
#[derive(Clone, Debug, Default)]
pub struct LowPassFilter {
    cutoff_hz: f32,
    output: f32,
    is_initialised: bool,
}

impl LowPassFilter {
    pub fn with_cutoff(cutoff_hz: f32) -> Self {
        Self {
            cutoff_hz,
            output: 0.,
            is_initialised: false,
        }
    }

    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff_hz
    }

    pub fn output(&self) -> f32 {
        self.output
    }

    fn alpha(&self, dt: f32) -> f32 {
        let rc = 1.0 / (2.0 * PI * self.cutoff_hz);
        dt / (dt + rc)
    }

    /// Filter `sample`, taken `dt` seconds after the previous one.
    ///
    /// The first sample initialises the output directly. Non-finite samples
    /// are dropped and the last output is returned.
    pub fn apply(&mut self, sample: f32, dt: f32) -> f32 {
        if !sample.is_finite() {
            return self.output;
        }

        self.output = if self.is_initialised {
            let alpha = self.alpha(dt);
            sample * alpha + self.output * (1. - alpha)
        } else {
            self.is_initialised = true;
            sample
        };
        self.output
    }

    pub fn reset(&mut self, value: f32) {
        self.is_initialised = true;
        self.output = value;
    }
}

/// Three independent [`LowPassFilter`]s, one per axis.
#[derive(Clone, Debug, Default)]
pub struct LowPassFilter3 {
    axes: [LowPassFilter; 3],
}

impl LowPassFilter3 {
    pub fn with_cutoff(cutoff_hz: f32) -> Self {
        Self {
            axes: [
                LowPassFilter::with_cutoff(cutoff_hz),
                LowPassFilter::with_cutoff(cutoff_hz),
                LowPassFilter::with_cutoff(cutoff_hz),
            ],
        }
    }

    pub fn apply(&mut self, sample: Vector3<f32>, dt: f32) -> Vector3<f32> {
        Vector3::new(
            self.axes[0].apply(sample.x, dt),
            self.axes[1].apply(sample.y, dt),
            self.axes[2].apply(sample.z, dt),
        )
    }

    pub fn reset(&mut self, value: Vector3<f32>) {
        self.axes[0].reset(value.x);
        self.axes[1].reset(value.y);
        self.axes[2].reset(value.z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn first_sample_passes_through() {
        let mut filter = LowPassFilter::with_cutoff(10.);
        assert_relative_eq!(filter.apply(4., 0.001), 4.);
    }

    #[test]
    fn it_settles_on_a_step() {
        let mut filter = LowPassFilter::with_cutoff(20.);
        filter.reset(0.);

        let first = filter.apply(1., 0.001);
        assert!(first > 0. && first < 1.);

        for _ in 0..1000 {
            filter.apply(1., 0.001);
        }
        assert_abs_diff_eq!(filter.output(), 1., epsilon = 1e-4);
    }

    #[test]
    fn zero_dt_holds_output() {
        let mut filter = LowPassFilter::with_cutoff(20.);
        filter.reset(2.);
        assert_relative_eq!(filter.apply(10., 0.), 2.);
    }

    #[test]
    fn non_finite_sample_is_dropped() {
        let mut filter = LowPassFilter::with_cutoff(50.);
        filter.apply(1., 0.001);

        assert_relative_eq!(filter.apply(f32::NAN, 0.001), 1.);
        assert_relative_eq!(filter.apply(f32::INFINITY, 0.001), 1.);

        let next = filter.apply(2., 0.001);
        assert!(next > 1. && next < 2.);
    }

    #[test]
    fn filters_each_axis() {
        let mut filter = LowPassFilter3::with_cutoff(5.);
        filter.reset(Vector3::zeros());
        let out = filter.apply(Vector3::new(1., -1., 0.), 0.01);
        assert!(out.x > 0. && out.x < 1.);
        assert_relative_eq!(out.y, -out.x);
        assert_relative_eq!(out.z, 0.);
    }
}
