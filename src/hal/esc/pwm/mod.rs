mod builder;

pub use builder::Builder;
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::PwmPin;
use num_traits::{NumCast, ToPrimitive};

use super::{CommandRange, EscDriver};
use crate::{esc::EscError, hal::PulseRange};

const US_PER_S: u64 = 1_000_000;

/// Clock and auto-reload period of the timer behind a PWM output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimerConfig {
    /// Counter clock after the prescaler [Hz]
    pub clock_hz: u32,

    /// Counts per PWM period
    pub period: u32,
}

impl TimerConfig {
    pub fn output_hz(&self) -> f32 {
        self.clock_hz as f32 / self.period as f32
    }

    /// Compare value for a pulse of `us` microseconds.
    pub fn pulse_to_duty(&self, us: u32) -> u32 {
        (us as u64 * self.clock_hz as u64 / US_PER_S) as u32
    }
}

/// Four RC ESCs driven by standard servo PWM.
///
/// Pins are in motor order: front left, rear left, front right, rear right.
pub struct PwmEsc<P> {
    pins: [P; 4],
    timers: [TimerConfig; 4],
    pulse: PulseRange,
    calibration_delay_ms: u16,
    range: Option<CommandRange>,
}

impl<P> PwmEsc<P>
where
    P: PwmPin,
    P::Duty: Copy + NumCast,
{
    /// Create an ESC driver with every pin on timers configured as `timer`.
    pub fn new(pins: [P; 4], timer: TimerConfig) -> Self {
        Builder::new(timer).build(pins)
    }

    /// Run the ESC throttle range calibration: full command, then minimum.
    ///
    /// Must be called with the ESCs freshly powered and before arming.
    pub fn calibrate<D>(&mut self, delay: &mut D) -> Result<(), EscError>
    where
        D: DelayMs<u16>,
    {
        let range = self.range.ok_or(EscError::Uninitialized)?;

        self.write([range.max as u32; 4])?;
        delay.delay_ms(self.calibration_delay_ms);

        self.write([range.min as u32; 4])?;
        delay.delay_ms(self.calibration_delay_ms);

        Ok(())
    }

    pub fn range(&self) -> Option<CommandRange> {
        self.range
    }

    pub fn pins(&self) -> &[P; 4] {
        &self.pins
    }

    /// Give back the pins.
    pub fn free(self) -> [P; 4] {
        self.pins
    }

    fn validate_timers(&self) -> Result<TimerConfig, EscError> {
        self.pulse.validate().map_err(|_| EscError::InvalidPulseRange)?;
        let timer = self.timers[0];

        if self.timers.iter().any(|t| t.clock_hz != timer.clock_hz) {
            return Err(EscError::TimerClockMismatch);
        }
        if self.timers.iter().any(|t| t.period != timer.period) {
            return Err(EscError::TimerPeriodMismatch);
        }
        if timer.clock_hz == 0 || timer.period == 0 {
            return Err(EscError::InvalidTimer);
        }

        // The period must fit the longest valid pulse
        let max_output_hz = US_PER_S as f32 / self.pulse.valid_max_us as f32;
        if timer.output_hz() > max_output_hz {
            return Err(EscError::OutputFrequencyTooHigh);
        }

        Ok(timer)
    }

    fn write(&mut self, commands: [u32; 4]) -> Result<(), EscError> {
        let mut duties = [None; 4];
        for (duty, command) in duties.iter_mut().zip(commands) {
            *duty = Some(<P::Duty as NumCast>::from(command).ok_or(EscError::DutyConversion)?);
        }

        for (pin, duty) in self.pins.iter_mut().zip(duties.into_iter().flatten()) {
            pin.set_duty(duty);
        }
        Ok(())
    }
}

impl<P> EscDriver for PwmEsc<P>
where
    P: PwmPin,
    P::Duty: Copy + NumCast,
{
    fn init(&mut self) -> Result<CommandRange, EscError> {
        let timer = self.validate_timers()?;

        // e.g. 3000 to 6000 for a 3 MHz, 50 Hz timer
        let min = timer.pulse_to_duty(self.pulse.proto_min_us);
        let max = timer.pulse_to_duty(self.pulse.proto_max_us);

        for pin in &self.pins {
            let max_duty = pin.get_max_duty().to_u32().unwrap_or(0);
            if max_duty < max {
                return Err(EscError::DutyOutOfRange);
            }
        }

        let range = CommandRange {
            min: min as f32,
            max: max as f32,
        };
        self.range = Some(range);
        Ok(range)
    }

    fn start(&mut self) -> Result<(), EscError> {
        let range = self.range.ok_or(EscError::Uninitialized)?;
        self.write([range.min as u32; 4])?;

        for pin in &mut self.pins {
            pin.enable();
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EscError> {
        for pin in &mut self.pins {
            pin.disable();
        }
        Ok(())
    }

    fn set_commands(&mut self, commands: [u32; 4]) -> Result<(), EscError> {
        if self.range.is_none() {
            return Err(EscError::Uninitialized);
        }
        self.write(commands)
    }
}
