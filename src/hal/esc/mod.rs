mod pwm;
pub use pwm::{Builder, PwmEsc, TimerConfig};

use crate::esc::EscError;

/// Native command bounds of an ESC protocol, e.g. PWM compare values for the
/// protocol's minimum and maximum pulse.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandRange {
    pub min: f32,
    pub max: f32,
}

impl CommandRange {
    pub fn span(&self) -> f32 {
        self.max - self.min
    }
}

/// Electronic speed controller protocol driving all four motors.
///
/// Commands are already sanitized by [`Esc`](crate::esc::Esc), drivers write
/// them as-is.
pub trait EscDriver {
    /// Validate the hardware setup and report the command range.
    fn init(&mut self) -> Result<CommandRange, EscError>;

    /// Start the output signals at the minimum command.
    fn start(&mut self) -> Result<(), EscError>;

    fn stop(&mut self) -> Result<(), EscError>;

    /// Write one command per motor, in motor order.
    fn set_commands(&mut self, commands: [u32; 4]) -> Result<(), EscError>;
}

impl<T: EscDriver + ?Sized> EscDriver for &mut T {
    fn init(&mut self) -> Result<CommandRange, EscError> {
        (**self).init()
    }

    fn start(&mut self) -> Result<(), EscError> {
        (**self).start()
    }

    fn stop(&mut self) -> Result<(), EscError> {
        (**self).stop()
    }

    fn set_commands(&mut self, commands: [u32; 4]) -> Result<(), EscError> {
        (**self).set_commands(commands)
    }
}
