//! Single-axis PID controller with a band-limited derivative and anti-windup.

use core::f32::consts::PI;

use num_traits::Float;

use crate::{error::ConfigError, math::sign};

/// Gains and limits for one [`Pid`] axis.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PidConfig {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,

    /// Cutoff frequency of the derivative low-pass filter [Hz].
    pub cutoff_hz: f32,

    /// Symmetric output limit.
    pub limit: f32,

    /// Symmetric integrator limit.
    pub integrator_limit: f32,
}

impl PidConfig {
    pub const fn new(
        kp: f32,
        ki: f32,
        kd: f32,
        cutoff_hz: f32,
        limit: f32,
        integrator_limit: f32,
    ) -> Self {
        Self {
            kp,
            ki,
            kd,
            cutoff_hz,
            limit,
            integrator_limit,
        }
    }

    /// Returns a copy with the output and integrator limits multiplied by `scale`.
    pub fn scale_limits(mut self, scale: f32) -> Self {
        self.limit *= scale;
        self.integrator_limit *= scale;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()) {
            return Err(ConfigError::InvalidGain);
        }
        if !(self.cutoff_hz.is_finite() && self.cutoff_hz > 0.0) {
            return Err(ConfigError::InvalidCutoff);
        }
        if !(self.limit.is_finite() && self.limit > 0.0) {
            return Err(ConfigError::InvalidLimit);
        }
        if !(self.integrator_limit.is_finite() && self.integrator_limit >= 0.0) {
            return Err(ConfigError::InvalidIntegratorLimit);
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct Pid {
    kp: f32,
    ki: f32,
    kd: f32,

    /// Derivative filter time constant [s]
    tau: f32,

    limit: f32,
    integrator_enable: bool,
    integrator_limit: f32,

    integrator: f32,
    differentiator: f32,
    prev_error: f32,
    prev_measurement: f32,

    /// Last unclamped output, used for the saturation test
    out: f32,
}

impl Pid {
    pub fn new(config: &PidConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            kp: config.kp,
            ki: config.ki,
            kd: config.kd,
            tau: 1.0 / (2.0 * PI * config.cutoff_hz),
            limit: config.limit,
            integrator_enable: true,
            integrator_limit: config.integrator_limit,
            integrator: 0.0,
            differentiator: 0.0,
            prev_error: 0.0,
            prev_measurement: 0.0,
            out: 0.0,
        })
    }

    /// Run one step of the controller and return the output clamped to `±limit`.
    ///
    /// `dt` is the time since the previous call in seconds.
    pub fn update(&mut self, setpoint: f32, measurement: f32, dt: f32) -> f32 {
        let error = setpoint - measurement;

        if self.integrator_enable && !self.is_winding_up(error) {
            self.integrator += 0.5 * (error + self.prev_error) * dt;
            self.integrator = self
                .integrator
                .clamp(-self.integrator_limit, self.integrator_limit);
        }

        // Derivative on measurement avoids a kick on setpoint steps
        self.differentiator = (2.0 * (self.prev_measurement - measurement)
            + (2.0 * self.tau - dt) * self.differentiator)
            / (2.0 * self.tau + dt);

        self.out = self.kp * error + self.ki * self.integrator + self.kd * self.differentiator;

        self.prev_error = error;
        self.prev_measurement = measurement;

        self.out.clamp(-self.limit, self.limit)
    }

    /// Saturated at the limit and the error pushes the integrator further the same way.
    fn is_winding_up(&self, error: f32) -> bool {
        self.out.abs() >= self.limit && sign(error) == sign(self.integrator)
    }

    /// Align the controller with a new setpoint and measurement without a step in output.
    pub fn resync(&mut self, setpoint: f32, measurement: f32) {
        self.prev_error = setpoint - measurement;
        self.prev_measurement = measurement;
        self.integrator = 0.0;
        self.differentiator = 0.0;
    }

    /// Clear all dynamic state and re-enable the integrator.
    pub fn reset(&mut self) {
        self.integrator = 0.0;
        self.differentiator = 0.0;
        self.prev_error = 0.0;
        self.prev_measurement = 0.0;
        self.out = 0.0;
        self.integrator_enable = true;
    }

    pub fn enable_integrator(&mut self) {
        self.integrator_enable = true;
    }

    pub fn disable_integrator(&mut self) {
        self.integrator_enable = false;
    }

    pub fn zero_integrator(&mut self) {
        self.integrator = 0.0;
    }

    pub fn is_integrator_enabled(&self) -> bool {
        self.integrator_enable
    }

    pub fn integrator(&self) -> f32 {
        self.integrator
    }

    pub fn differentiator(&self) -> f32 {
        self.differentiator
    }

    pub fn tau(&self) -> f32 {
        self.tau
    }

    pub fn limit(&self) -> f32 {
        self.limit
    }

    pub fn integrator_limit(&self) -> f32 {
        self.integrator_limit
    }
}
