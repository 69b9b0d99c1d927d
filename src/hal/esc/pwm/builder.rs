use embedded_hal::PwmPin;

use super::{PwmEsc, TimerConfig};
use crate::hal::PulseRange;

pub struct Builder {
    timers: [TimerConfig; 4],
    pulse: PulseRange,
    calibration_delay_ms: u16,
}

impl Builder {
    /// Start a builder with all four motors on timers configured as `timer`.
    pub fn new(timer: TimerConfig) -> Self {
        Self {
            timers: [timer; 4],
            pulse: PulseRange::PWM,
            calibration_delay_ms: 2000,
        }
    }

    /// Override the timer of one motor (0 based, motor order).
    pub fn motor_timer(mut self, motor: usize, timer: TimerConfig) -> Self {
        if let Some(slot) = self.timers.get_mut(motor) {
            *slot = timer;
        }
        self
    }

    pub fn pulse_range(mut self, pulse: PulseRange) -> Self {
        self.pulse = pulse;
        self
    }

    pub fn calibration_delay(mut self, ms: u16) -> Self {
        self.calibration_delay_ms = ms;
        self
    }

    pub fn build<P>(self, pins: [P; 4]) -> PwmEsc<P>
    where
        P: PwmPin,
    {
        PwmEsc {
            pins,
            timers: self.timers,
            pulse: self.pulse,
            calibration_delay_ms: self.calibration_delay_ms,
            range: None,
        }
    }
}
