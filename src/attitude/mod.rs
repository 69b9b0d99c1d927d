//! Attitude estimation and control.

use thiserror::Error;

use crate::error::Severity;

mod controller;
pub use controller::AttitudeController;

mod estimator;
pub use estimator::{AttitudeEstimator, ImuFilter};

/// Vehicle attitude in degrees and body rates in degrees per second.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AttitudeEstimate {
    pub roll_angle: f32,
    pub pitch_angle: f32,
    pub roll_rate: f32,
    pub pitch_rate: f32,
    pub yaw_rate: f32,
}

/// Rate loop outputs in motor command units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AttitudeCommand {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AttitudeError {
    #[error("IMU sample has non-finite components")]
    InvalidSample,

    #[error("flight mode is invalid, running the rate loops only")]
    InvalidFlightMode,
}

impl AttitudeError {
    pub fn severity(&self) -> Severity {
        Severity::Warn
    }
}
