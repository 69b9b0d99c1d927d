//! Hardware collaborators of the flight core.
//!
//! The core never touches peripherals directly. It reads IMU samples through
//! [`Imu`], receiver channels through [`Receiver`] and drives motors through
//! [`EscDriver`]. [`PwmEsc`] and [`PwmReceiver`] implement the latter two on
//! top of `embedded-hal` PWM pins and timer input captures.

use embedded_time::duration::Microseconds;
use nalgebra::Vector3;
use thiserror::Error;

use crate::error::{ConfigError, Severity};

pub mod esc;
pub use esc::{CommandRange, EscDriver, PwmEsc, TimerConfig};

pub mod rx;
pub use rx::{Channel, PwmReceiver, Receiver, RxError};

/// One inertial measurement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImuSample {
    /// Specific force [milli-g]
    pub accel: Vector3<f32>,

    /// Angular rate [milli-deg/s]
    pub rate: Vector3<f32>,

    /// Time since the previous sample
    pub dt: Microseconds<u32>,
}

impl ImuSample {
    pub fn new(accel: Vector3<f32>, rate: Vector3<f32>, dt: Microseconds<u32>) -> Self {
        Self { accel, rate, dt }
    }

    pub fn is_finite(&self) -> bool {
        self.accel.iter().chain(self.rate.iter()).all(|v| v.is_finite())
    }
}

#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    #[error("no new sample is available")]
    NotReady,

    #[error("sample is outside the sensor's measurement range")]
    OutOfRange,

    #[error("sensor bus transaction failed")]
    Bus,

    #[error("sensor is not initialized")]
    Uninitialized,
}

impl SensorError {
    pub fn severity(&self) -> Severity {
        match self {
            SensorError::NotReady | SensorError::OutOfRange => Severity::Warn,
            SensorError::Bus | SensorError::Uninitialized => Severity::Fatal,
        }
    }
}

/// Inertial measurement unit.
pub trait Imu {
    /// Read the latest sample in milli-g, milli-deg/s and microseconds.
    fn read(&mut self) -> Result<ImuSample, SensorError>;
}

impl<T: Imu + ?Sized> Imu for &mut T {
    fn read(&mut self) -> Result<ImuSample, SensorError> {
        (**self).read()
    }
}

/// Pulse width bounds of a PWM link [us].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PulseRange {
    /// Calibrated stick range
    pub min_us: u32,
    pub max_us: u32,

    /// Protocol endpoints
    pub proto_min_us: u32,
    pub proto_max_us: u32,

    /// Anything outside this range is treated as a bad signal
    pub valid_min_us: u32,
    pub valid_max_us: u32,
}

impl PulseRange {
    /// Standard RC servo PWM.
    pub const PWM: PulseRange = PulseRange {
        min_us: 988,
        max_us: 2012,
        proto_min_us: 1000,
        proto_max_us: 2000,
        valid_min_us: 950,
        valid_max_us: 2050,
    };

    /// Check that the calibrated and protocol ranges are non-empty and lie
    /// within the valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let nested = |min: u32, max: u32| {
            self.valid_min_us <= min && min < max && max <= self.valid_max_us
        };

        if nested(self.min_us, self.max_us) && nested(self.proto_min_us, self.proto_max_us) {
            Ok(())
        } else {
            Err(ConfigError::InvalidPulseRange)
        }
    }

    pub fn mid_us(&self) -> u32 {
        ((self.min_us as u64 + self.max_us as u64) / 2) as u32
    }

    pub fn is_valid(&self, us: u32) -> bool {
        (self.valid_min_us..=self.valid_max_us).contains(&us)
    }

    /// Clamp a valid pulse to the calibrated range.
    pub fn clamp(&self, us: u32) -> u32 {
        us.clamp(self.min_us, self.max_us)
    }
}

impl Default for PulseRange {
    fn default() -> Self {
        Self::PWM
    }
}
