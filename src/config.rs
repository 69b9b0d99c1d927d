//! Flight configuration.
//!
//! All values are supplied once when the [`FlightController`](crate::FlightController)
//! is built and are never mutated by the control loop. [`FlightConfig::default`]
//! holds the tuned values for the reference airframe.

use crate::{error::ConfigError, pid::PidConfig};

// Pilot request limits
pub const ROLL_MAX_DEG: f32 = 10.0;
pub const PITCH_MAX_DEG: f32 = 10.0;
pub const ROLL_MAX_DPS: f32 = 180.0;
pub const PITCH_MAX_DPS: f32 = 180.0;
pub const YAW_MAX_DPS: f32 = 180.0;
pub const THROTTLE_IDLE_TOLERANCE_PCT: f32 = 2.0;

// Complementary filter
pub const ACCEL_GAIN: f32 = 0.02;

// Takeoff attitude limits
pub const TAKEOFF_ROLL_LIMIT_DEG: f32 = 10.0;
pub const TAKEOFF_PITCH_LIMIT_DEG: f32 = 10.0;

// Motor command settings, percent of the protocol range
pub const MTR_CMD_IDLE_PCT: f32 = 18.0;
pub const MTR_CMD_LIFTOFF_PCT: f32 = 24.0;
pub const MTR_CMD_LIMIT_PCT: f32 = 100.0;

const INTEGRATOR_LIMIT_RATIO: f32 = 0.3;
const PID_CUTOFF_HZ: f32 = 75.0;
const ANGLE_PID_LIMIT_DPS: f32 = 180.0;
const RATE_PID_LIMIT_PCT: f32 = 5.0;

/// An inclusive `[min, max]` range.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Limits {
    pub min: f32,
    pub max: f32,
}

impl Limits {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub const fn symmetric(max: f32) -> Self {
        Self { min: -max, max }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.min.is_finite() && self.max.is_finite() && self.min < self.max {
            Ok(())
        } else {
            Err(ConfigError::InvalidRange)
        }
    }
}

/// Pilot request ranges the receiver channels are mapped onto.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RcConfig {
    /// Roll request in angle mode [deg]
    pub roll_angle: Limits,
    /// Pitch request in angle mode [deg]
    pub pitch_angle: Limits,
    /// Roll request in rate mode [deg/s]
    pub roll_rate: Limits,
    /// Pitch request in rate mode [deg/s]
    pub pitch_rate: Limits,
    /// Yaw request [deg/s]
    pub yaw_rate: Limits,
    /// Throttle request [%]
    pub throttle: Limits,
    /// Throttle at or below this is considered idle [%]
    pub throttle_idle_tolerance: f32,
}

impl Default for RcConfig {
    fn default() -> Self {
        Self {
            roll_angle: Limits::symmetric(ROLL_MAX_DEG),
            pitch_angle: Limits::symmetric(PITCH_MAX_DEG),
            roll_rate: Limits::symmetric(ROLL_MAX_DPS),
            pitch_rate: Limits::symmetric(PITCH_MAX_DPS),
            yaw_rate: Limits::symmetric(YAW_MAX_DPS),
            throttle: Limits::new(0.0, 100.0),
            throttle_idle_tolerance: THROTTLE_IDLE_TOLERANCE_PCT,
        }
    }
}

impl RcConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.roll_angle.validate()?;
        self.pitch_angle.validate()?;
        self.roll_rate.validate()?;
        self.pitch_rate.validate()?;
        self.yaw_rate.validate()?;
        self.throttle.validate()?;
        if !self.throttle_idle_tolerance.is_finite() {
            return Err(ConfigError::InvalidRange);
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttitudeConfig {
    /// Weight of the accelerometer estimate in the complementary filter.
    /// The gyro estimate gets `1 - accel_gain`.
    pub accel_gain: f32,

    /// Maximum absolute roll for takeoff [deg]
    pub roll_limit_deg: f32,

    /// Maximum absolute pitch for takeoff [deg]
    pub pitch_limit_deg: f32,
}

impl Default for AttitudeConfig {
    fn default() -> Self {
        Self {
            accel_gain: ACCEL_GAIN,
            roll_limit_deg: TAKEOFF_ROLL_LIMIT_DEG,
            pitch_limit_deg: TAKEOFF_PITCH_LIMIT_DEG,
        }
    }
}

impl AttitudeConfig {
    pub fn gyro_gain(&self) -> f32 {
        1.0 - self.accel_gain
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.accel_gain) {
            return Err(ConfigError::InvalidFilterGain);
        }
        if !(self.roll_limit_deg > 0.0 && self.pitch_limit_deg > 0.0) {
            return Err(ConfigError::InvalidTakeoffLimits);
        }
        Ok(())
    }
}

/// Gains for the five attitude control loops.
///
/// Angle loop limits are in deg/s. Rate loop limits are in percent of the motor
/// command range and are scaled to command units when the controller is built.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControllerConfig {
    pub roll_angle: PidConfig,
    pub pitch_angle: PidConfig,
    pub roll_rate: PidConfig,
    pub pitch_rate: PidConfig,
    pub yaw_rate: PidConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let angle_i_limit = INTEGRATOR_LIMIT_RATIO * ANGLE_PID_LIMIT_DPS;
        let rate_i_limit = INTEGRATOR_LIMIT_RATIO * RATE_PID_LIMIT_PCT;
        let rate = PidConfig::new(7.5, 5.5, 0.0, PID_CUTOFF_HZ, RATE_PID_LIMIT_PCT, rate_i_limit);

        Self {
            roll_angle: PidConfig::new(
                8.5,
                8.0,
                0.80,
                PID_CUTOFF_HZ,
                ANGLE_PID_LIMIT_DPS,
                angle_i_limit,
            ),
            pitch_angle: PidConfig::new(
                11.5,
                11.0,
                0.85,
                PID_CUTOFF_HZ,
                ANGLE_PID_LIMIT_DPS,
                angle_i_limit,
            ),
            roll_rate: rate,
            pitch_rate: rate,
            yaw_rate: rate,
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.roll_angle.validate()?;
        self.pitch_angle.validate()?;
        self.roll_rate.validate()?;
        self.pitch_rate.validate()?;
        self.yaw_rate.validate()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MixerConfig {
    /// Scale motor commands to hold vertical thrust while tilted
    pub thrust_compensation: bool,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            thrust_compensation: true,
        }
    }
}

/// Motor command thresholds in percent of the protocol command range.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EscConfig {
    /// Slowest spin of an armed motor
    pub idle_pct: f32,
    /// Command at which the vehicle is assumed to leave the ground
    pub liftoff_pct: f32,
    /// Highest command sent to a motor
    pub limit_pct: f32,
}

impl Default for EscConfig {
    fn default() -> Self {
        Self {
            idle_pct: MTR_CMD_IDLE_PCT,
            liftoff_pct: MTR_CMD_LIFTOFF_PCT,
            limit_pct: MTR_CMD_LIMIT_PCT,
        }
    }
}

impl EscConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordered = 0.0 < self.idle_pct
            && self.idle_pct < self.liftoff_pct
            && self.liftoff_pct <= self.limit_pct
            && self.limit_pct <= 100.0;

        if ordered {
            Ok(())
        } else {
            Err(ConfigError::InvalidCommandPercentages)
        }
    }
}

/// Optional low-pass stages applied to IMU samples before estimation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImuFilterConfig {
    pub gyro_cutoff_hz: Option<f32>,
    pub accel_cutoff_hz: Option<f32>,
}

impl ImuFilterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for cutoff in [self.gyro_cutoff_hz, self.accel_cutoff_hz].into_iter().flatten() {
            if !(cutoff.is_finite() && cutoff > 0.0) {
                return Err(ConfigError::InvalidCutoff);
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PreflightConfig {
    /// Consecutive ready samples needed before arming is allowed
    pub required_samples: u32,
    /// Time allowed to become ready [ms]
    pub timeout_ms: u32,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            required_samples: 1000,
            timeout_ms: 30_000,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlightConfig {
    pub attitude: AttitudeConfig,
    pub rc: RcConfig,
    pub controller: ControllerConfig,
    pub mixer: MixerConfig,
    pub esc: EscConfig,
    pub imu_filter: ImuFilterConfig,
    pub preflight: PreflightConfig,
}

impl FlightConfig {
    /// Check every section, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.attitude.validate()?;
        self.rc.validate()?;
        self.controller.validate()?;
        self.esc.validate()?;
        self.imu_filter.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_is_valid() {
        assert_eq!(FlightConfig::default().validate(), Ok(()));
    }

    #[test]
    fn default_integrator_limits() {
        let config = ControllerConfig::default();
        assert_relative_eq!(config.roll_angle.integrator_limit, 54.0, epsilon = 1e-4);
        assert_relative_eq!(config.yaw_rate.integrator_limit, 1.5, epsilon = 1e-6);
    }

    #[test]
    fn rejects_unordered_percentages() {
        let mut config = FlightConfig::default();
        config.esc.idle_pct = 30.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidCommandPercentages));

        config.esc = EscConfig {
            idle_pct: 0.0,
            ..EscConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidCommandPercentages));
    }

    #[test]
    fn rejects_bad_filter_gain() {
        let mut config = FlightConfig::default();
        config.attitude.accel_gain = 1.5;
        assert_eq!(config.validate(), Err(ConfigError::InvalidFilterGain));
    }

    #[test]
    fn rejects_empty_range() {
        let mut config = FlightConfig::default();
        config.rc.throttle = Limits::new(100.0, 0.0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidRange));
    }

    #[test]
    fn rejects_bad_imu_cutoff() {
        let mut config = FlightConfig::default();
        config.imu_filter.gyro_cutoff_hz = Some(0.0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidCutoff));
    }
}
