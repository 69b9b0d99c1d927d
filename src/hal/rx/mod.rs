use thiserror::Error;

use super::PulseRange;
use crate::error::Severity;

mod pwm;
pub use pwm::{Edge, PulseCapture, PwmReceiver};

/// Logical receiver channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    Roll = 1,
    Pitch = 2,
    Throttle = 3,
    Yaw = 4,
    Arm = 5,
    Mode = 6,
}

impl Channel {
    pub const COUNT: usize = 6;

    pub const ALL: [Channel; Channel::COUNT] = [
        Channel::Roll,
        Channel::Pitch,
        Channel::Throttle,
        Channel::Yaw,
        Channel::Arm,
        Channel::Mode,
    ];

    /// Zero based index for channel tables.
    pub fn index(self) -> usize {
        self as usize - 1
    }

    /// Arm and mode are two position switches rather than sticks.
    pub fn is_switch(self) -> bool {
        matches!(self, Channel::Arm | Channel::Mode)
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Roll => "roll",
            Channel::Pitch => "pitch",
            Channel::Throttle => "throttle",
            Channel::Yaw => "yaw",
            Channel::Arm => "arm",
            Channel::Mode => "mode",
        }
    }
}

#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxError {
    #[error("receiver is not initialized")]
    Uninitialized,

    #[error("input capture clock must be a whole number of MHz")]
    InvalidClock,

    #[error("invalid pulse range")]
    InvalidPulseRange,
}

impl RxError {
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

/// Radio receiver.
///
/// Stick channels return a pulse width in the [`PulseRange`] domain. Switch
/// channels return a position: `1` for low and `2` for high.
pub trait Receiver {
    fn pulse_range(&self) -> PulseRange;

    fn channel(&mut self, channel: Channel) -> Result<u32, RxError>;
}

impl<T: Receiver + ?Sized> Receiver for &mut T {
    fn pulse_range(&self) -> PulseRange {
        (**self).pulse_range()
    }

    fn channel(&mut self, channel: Channel) -> Result<u32, RxError> {
        (**self).channel(channel)
    }
}
