use thiserror::Error;

/// How bad an error is for the control loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Severity {
    /// A value was substituted or clamped and the operation still produced an output.
    Warn,
    /// The operation cannot safely continue; the vehicle must not be armed.
    Fatal,
}

impl Severity {
    pub fn is_fatal(self) -> bool {
        self == Severity::Fatal
    }
}

/// An invalid configuration value, detected at construction time.
#[derive(Error, Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    #[error("derivative cutoff must be a positive frequency")]
    InvalidCutoff,

    #[error("output limit must be positive")]
    InvalidLimit,

    #[error("integrator limit must not be negative")]
    InvalidIntegratorLimit,

    #[error("gain must be finite")]
    InvalidGain,

    #[error("complementary filter gain must be within [0, 1]")]
    InvalidFilterGain,

    #[error("request range must have min < max")]
    InvalidRange,

    #[error("motor command percentages must satisfy 0 < idle < liftoff <= limit <= 100")]
    InvalidCommandPercentages,

    #[error("attitude authority leaves no throttle range above idle")]
    InsufficientThrottleRange,

    #[error("takeoff angle limits must be positive")]
    InvalidTakeoffLimits,

    #[error("pulse range must nest as valid min <= min < max <= valid max")]
    InvalidPulseRange,

    #[error("{0} is required")]
    Missing(&'static str),
}

impl ConfigError {
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}
