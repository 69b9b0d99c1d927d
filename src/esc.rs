//! ESC command layer.
//!
//! Sits between the mixer and an [`EscDriver`]: derives the command thresholds
//! from the protocol range, sanitizes every motor command and tracks whether
//! the motors are armed.

use thiserror::Error;

use crate::{
    config::EscConfig,
    error::Severity,
    hal::{CommandRange, EscDriver},
    math::{constrain_float, in_range},
    mixer::MotorCommands,
};

#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EscError {
    #[error("ESC is not initialized")]
    Uninitialized,

    #[error("motor command properties must satisfy min < idle < liftoff <= limit <= max")]
    InvalidCommandProperties,

    #[error("motor timers run on different clocks")]
    TimerClockMismatch,

    #[error("motor timers have different periods")]
    TimerPeriodMismatch,

    #[error("motor timer clock and period must be non-zero")]
    InvalidTimer,

    #[error("PWM pulse range is invalid")]
    InvalidPulseRange,

    #[error("PWM output frequency is too high for the longest valid pulse")]
    OutputFrequencyTooHigh,

    #[error("PWM pin cannot represent the maximum command")]
    DutyOutOfRange,

    #[error("motor command does not fit the PWM duty type")]
    DutyConversion,

    /// `motors` has bit `n` set if motor `n + 1` was clamped.
    #[error("motor commands outside the protocol range were clamped")]
    CommandClamped { motors: u8 },
}

impl EscError {
    pub fn severity(&self) -> Severity {
        match self {
            EscError::CommandClamped { .. } => Severity::Warn,
            _ => Severity::Fatal,
        }
    }
}

/// Motor command thresholds in protocol units.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EscCommandProperties {
    /// Motors stopped
    pub min: f32,
    /// Top of the protocol range
    pub max: f32,
    /// Slowest spin of an armed motor
    pub idle: f32,
    /// Vehicle leaves the ground around here
    pub liftoff: f32,
    /// Highest command sent to a motor
    pub limit: f32,
}

impl EscCommandProperties {
    /// Derive the thresholds from a protocol range and percentages of it.
    pub fn new(range: CommandRange, config: &EscConfig) -> Result<Self, EscError> {
        let map_pct = |pct: f32| range.span() * (pct / 100.0) + range.min;

        let props = Self {
            min: range.min,
            max: range.max,
            idle: map_pct(config.idle_pct),
            liftoff: map_pct(config.liftoff_pct),
            limit: map_pct(config.limit_pct),
        };
        props.validate()?;
        Ok(props)
    }

    pub fn validate(&self) -> Result<(), EscError> {
        let finite = [self.min, self.max, self.idle, self.liftoff, self.limit]
            .iter()
            .all(|v| v.is_finite());
        let ordered = self.min < self.idle
            && self.idle < self.liftoff
            && self.liftoff <= self.limit
            && self.limit <= self.max;

        if finite && ordered {
            Ok(())
        } else {
            Err(EscError::InvalidCommandProperties)
        }
    }

    /// Width of the protocol range.
    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    /// Absolute command for `pct` percent of the protocol range.
    pub fn map_pct(&self, pct: f32) -> f32 {
        self.span() * (pct / 100.0) + self.min
    }

    /// Position of an absolute `command` in the protocol range, in percent.
    pub fn to_pct(&self, command: f32) -> f32 {
        (command - self.min) / self.span() * 100.0
    }

    /// Command delta for `pct` percent of the protocol range.
    pub fn scale_pct(&self, pct: f32) -> f32 {
        self.span() * (pct / 100.0)
    }

    /// Convert a command to protocol units, returning whether it had to be clamped.
    ///
    /// Commands inside `[min, max]` pass through. Anything else, NaN included,
    /// is pulled into `[idle, limit]`.
    pub fn sanitize(&self, command: f32) -> (u32, bool) {
        if in_range(command, self.min, self.max) {
            return (command as u32, false);
        }

        let clamped = if command.is_nan() {
            self.idle
        } else {
            constrain_float(command, self.idle, self.limit)
        };
        (clamped as u32, true)
    }
}

pub struct Esc<D> {
    driver: D,
    config: EscConfig,
    props: Option<EscCommandProperties>,
    commands: [u32; 4],
}

impl<D: EscDriver> Esc<D> {
    pub fn new(driver: D, config: EscConfig) -> Self {
        Self {
            driver,
            config,
            props: None,
            commands: [0; 4],
        }
    }

    /// Initialize the driver and derive the command properties.
    pub fn init(&mut self) -> Result<EscCommandProperties, EscError> {
        let range = self.driver.init()?;
        let props = EscCommandProperties::new(range, &self.config).map_err(|e| {
            error!("invalid motor command properties");
            e
        })?;

        debug!(
            "esc init: min {} idle {} liftoff {} limit {} max {}",
            props.min, props.idle, props.liftoff, props.limit, props.max
        );
        self.props = Some(props);
        Ok(props)
    }

    /// Start the output signals with all motors stopped.
    pub fn start(&mut self) -> Result<(), EscError> {
        let props = self.properties()?;
        self.driver.start()?;
        self.commands = [props.min as u32; 4];
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), EscError> {
        self.driver.stop()?;
        self.commands = [0; 4];
        Ok(())
    }

    pub fn properties(&self) -> Result<EscCommandProperties, EscError> {
        self.props.ok_or(EscError::Uninitialized)
    }

    /// Sanitize and write the motor commands.
    ///
    /// Out of range commands are clamped and reported as
    /// [`EscError::CommandClamped`] after the clamped values were written.
    pub fn set_motor_commands(&mut self, commands: &MotorCommands) -> Result<(), EscError> {
        let props = self.properties()?;

        let mut out = [0; 4];
        let mut clamped = 0u8;
        for (n, command) in commands.as_array().into_iter().enumerate() {
            let (value, was_clamped) = props.sanitize(command);
            out[n] = value;
            if was_clamped {
                clamped |= 1 << n;
            }
        }

        self.write(out)?;

        if clamped != 0 {
            warn!("clamped motor commands, mask {}", clamped);
            return Err(EscError::CommandClamped { motors: clamped });
        }
        Ok(())
    }

    /// True if any motor is commanded at or above idle.
    pub fn is_armed(&self) -> bool {
        match self.props {
            Some(props) => self.commands.iter().any(|&c| c >= props.idle as u32),
            None => false,
        }
    }

    /// Spin all motors at idle.
    pub fn arm(&mut self) -> Result<(), EscError> {
        let props = self.properties()?;
        self.write([props.idle as u32; 4])?;
        info!("motors armed");
        Ok(())
    }

    /// Stop all motors.
    pub fn disarm(&mut self) -> Result<(), EscError> {
        let props = self.properties()?;
        self.write([props.min as u32; 4])?;
        info!("motors disarmed");
        Ok(())
    }

    /// Last commands written, in protocol units.
    pub fn commands(&self) -> [u32; 4] {
        self.commands
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    fn write(&mut self, commands: [u32; 4]) -> Result<(), EscError> {
        self.driver.set_commands(commands)?;
        self.commands = commands;
        Ok(())
    }
}
