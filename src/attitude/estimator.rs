use num_traits::Float;

use super::{AttitudeError, AttitudeEstimate};
use crate::{
    config::{AttitudeConfig, ImuFilterConfig},
    error::ConfigError,
    filter::LowPassFilter3,
    hal::ImuSample,
    math::micros_to_secs,
    rc::FlightMode,
};

const MILLI: f32 = 1.0e-3;

/// Complementary filter fusing accelerometer tilt with integrated gyro rates.
#[derive(Clone, Debug)]
pub struct AttitudeEstimator {
    accel_gain: f32,
    gyro_gain: f32,
    roll_limit: f32,
    pitch_limit: f32,
}

impl AttitudeEstimator {
    pub fn new(config: &AttitudeConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            accel_gain: config.accel_gain,
            gyro_gain: config.gyro_gain(),
            roll_limit: config.roll_limit_deg,
            pitch_limit: config.pitch_limit_deg,
        })
    }

    /// Update `estimate` in place from one IMU sample.
    ///
    /// Rates are always updated. Angles are only estimated in angle mode; in
    /// any other mode they keep their last value. A sample with non-finite
    /// components leaves the estimate untouched.
    pub fn update(
        &self,
        sample: &ImuSample,
        mode: FlightMode,
        estimate: &mut AttitudeEstimate,
    ) -> Result<(), AttitudeError> {
        if !sample.is_finite() {
            warn!("discarding non-finite IMU sample");
            return Err(AttitudeError::InvalidSample);
        }

        estimate.roll_rate = sample.rate.x * MILLI;
        estimate.pitch_rate = sample.rate.y * MILLI;
        estimate.yaw_rate = sample.rate.z * MILLI;

        if mode == FlightMode::Angle {
            let dt = micros_to_secs(sample.dt.0);
            let (accel_roll, accel_pitch) = accel_angles(sample);

            let gyro_roll = estimate.roll_angle + estimate.roll_rate * dt;
            let gyro_pitch = estimate.pitch_angle + estimate.pitch_rate * dt;

            estimate.roll_angle = self.gyro_gain * gyro_roll + self.accel_gain * accel_roll;
            estimate.pitch_angle = self.gyro_gain * gyro_pitch + self.accel_gain * accel_pitch;
        }

        Ok(())
    }

    /// True when gravity points down the body z axis.
    pub fn is_right_side_up(accel_z: f32) -> bool {
        accel_z > 0.
    }

    /// True when roll and pitch are both strictly inside the takeoff limits.
    pub fn within_limits(&self, estimate: &AttitudeEstimate) -> bool {
        estimate.roll_angle.abs() < self.roll_limit && estimate.pitch_angle.abs() < self.pitch_limit
    }
}

/// Roll and pitch implied by the gravity vector [deg].
fn accel_angles(sample: &ImuSample) -> (f32, f32) {
    let a = sample.accel;
    let roll = a.y.atan2((a.z * a.z + a.x * a.x).sqrt());
    let pitch = (-a.x).atan2((a.z * a.z + a.y * a.y).sqrt());
    (roll.to_degrees(), pitch.to_degrees())
}

/// Optional low-pass stages for raw IMU samples.
#[derive(Clone, Debug, Default)]
pub struct ImuFilter {
    gyro: Option<LowPassFilter3>,
    accel: Option<LowPassFilter3>,
}

impl ImuFilter {
    pub fn new(config: &ImuFilterConfig) -> Self {
        Self {
            gyro: config.gyro_cutoff_hz.map(LowPassFilter3::with_cutoff),
            accel: config.accel_cutoff_hz.map(LowPassFilter3::with_cutoff),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.gyro.is_some() || self.accel.is_some()
    }

    pub fn apply(&mut self, sample: &ImuSample) -> ImuSample {
        let dt = micros_to_secs(sample.dt.0);
        let mut filtered = *sample;

        if let Some(gyro) = &mut self.gyro {
            filtered.rate = gyro.apply(sample.rate, dt);
        }
        if let Some(accel) = &mut self.accel {
            filtered.accel = accel.apply(sample.accel, dt);
        }
        filtered
    }
}
