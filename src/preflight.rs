//! Ready-to-fly check run while disarmed.

use embedded_time::duration::Microseconds;

use crate::{
    attitude::{AttitudeEstimate, AttitudeEstimator},
    config::PreflightConfig,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PreflightStatus {
    /// Not enough consecutive ready samples yet
    Pending,
    /// Safe to arm
    Ready,
    /// Never became ready within the timeout
    TimedOut,
}

/// A single sample is ready when the vehicle is right side up, level within
/// the takeoff limits and the throttle is idle.
pub fn ready_to_fly(
    estimator: &AttitudeEstimator,
    accel_z: f32,
    estimate: &AttitudeEstimate,
    throttle_idle: bool,
) -> bool {
    AttitudeEstimator::is_right_side_up(accel_z)
        && estimator.within_limits(estimate)
        && throttle_idle
}

/// Requires the ready condition to hold for a number of consecutive samples
/// before allowing the motors to arm.
#[derive(Clone, Debug)]
pub struct PreflightCheck {
    required_samples: u32,
    timeout_us: u64,
    consecutive: u32,
    elapsed_us: u64,
    has_been_ready: bool,
    timed_out: bool,
}

impl PreflightCheck {
    pub fn new(config: &PreflightConfig) -> Self {
        Self {
            required_samples: config.required_samples,
            timeout_us: config.timeout_ms as u64 * 1000,
            consecutive: 0,
            elapsed_us: 0,
            has_been_ready: false,
            timed_out: false,
        }
    }

    /// Feed one sample taken `dt` after the previous one.
    ///
    /// Any sample that is not ready restarts the count. A timeout latches
    /// until [`PreflightCheck::reset`].
    pub fn update(&mut self, ready: bool, dt: Microseconds<u32>) -> PreflightStatus {
        if self.timed_out {
            return PreflightStatus::TimedOut;
        }

        self.consecutive = if ready {
            self.consecutive.saturating_add(1)
        } else {
            0
        };

        if self.consecutive >= self.required_samples {
            self.has_been_ready = true;
            return PreflightStatus::Ready;
        }

        self.elapsed_us += dt.0 as u64;
        if !self.has_been_ready && self.elapsed_us > self.timeout_us {
            error!("preflight check timed out");
            self.timed_out = true;
            return PreflightStatus::TimedOut;
        }

        PreflightStatus::Pending
    }

    pub fn status(&self) -> PreflightStatus {
        if self.timed_out {
            PreflightStatus::TimedOut
        } else if self.consecutive >= self.required_samples {
            PreflightStatus::Ready
        } else {
            PreflightStatus::Pending
        }
    }

    pub fn reset(&mut self) {
        self.consecutive = 0;
        self.elapsed_us = 0;
        self.has_been_ready = false;
        self.timed_out = false;
    }
}
