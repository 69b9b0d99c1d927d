//! Pilot requests from the radio receiver.

use thiserror::Error;

use crate::{
    config::{Limits, RcConfig},
    error::{ConfigError, Severity},
    hal::{rx::Channel, PulseRange, Receiver, RxError},
    math::map_range,
};

const SWITCH_LOW: u32 = 1;
const SWITCH_HIGH: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlightMode {
    Invalid,
    /// Sticks command roll and pitch angles
    Angle,
    /// Sticks command roll and pitch rates
    Rate,
}

impl FlightMode {
    /// Decode a mode switch position.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            SWITCH_LOW => FlightMode::Angle,
            SWITCH_HIGH => FlightMode::Rate,
            _ => FlightMode::Invalid,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FlightMode::Invalid => "invalid",
            FlightMode::Angle => "angle",
            FlightMode::Rate => "rate",
        }
    }
}

/// Pilot request in physical units.
///
/// Roll and pitch are degrees in [`FlightMode::Angle`] and degrees per second
/// in [`FlightMode::Rate`]. Yaw is always degrees per second and throttle is
/// a percentage.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RcRequest {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub throttle: f32,
}

#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RcError {
    #[error("RC mapper is not initialized")]
    Uninitialized,

    #[error("receiver failed: {0}")]
    Receiver(#[from] RxError),

    /// Bit `n` of `mask` is set for the channel with index `n`. The request
    /// was still updated with neutral values for those channels.
    #[error("invalid channels were replaced with neutral values")]
    InvalidChannels { mask: u8 },
}

impl RcError {
    pub fn severity(&self) -> Severity {
        match self {
            RcError::InvalidChannels { .. } => Severity::Warn,
            RcError::Uninitialized | RcError::Receiver(_) => Severity::Fatal,
        }
    }

    pub fn contains(&self, channel: Channel) -> bool {
        match self {
            RcError::InvalidChannels { mask } => mask & (1 << channel.index()) != 0,
            _ => false,
        }
    }
}

/// Maps receiver channels onto an [`RcRequest`], the flight mode and the arm switch.
pub struct RcMapper {
    config: RcConfig,
    range: Option<PulseRange>,
    request: RcRequest,
    mode: FlightMode,
    armed: bool,
}

impl RcMapper {
    pub fn new(config: RcConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            config,
            range: None,
            request: RcRequest::default(),
            mode: FlightMode::Angle,
            armed: false,
        })
    }

    /// Bind to the pulse range of the receiver protocol.
    ///
    /// A malformed range leaves the mapper uninitialized.
    pub fn init<R: Receiver>(&mut self, receiver: &R) -> Result<(), ConfigError> {
        let range = receiver.pulse_range();
        if let Err(e) = range.validate() {
            error!("receiver pulse range is invalid");
            self.range = None;
            return Err(e);
        }
        self.range = Some(range);
        Ok(())
    }

    pub fn deinit(&mut self) {
        self.range = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.range.is_some()
    }

    /// Read and map all channels.
    ///
    /// On [`RcError::InvalidChannels`] the request is still updated, with
    /// neutral values substituted, and is available from [`RcMapper::requests`].
    pub fn get_requests<R: Receiver>(&mut self, receiver: &mut R) -> Result<RcRequest, RcError> {
        let range = self.range.ok_or(RcError::Uninitialized)?;
        let mut mask = 0u8;

        self.armed = receiver.channel(Channel::Arm)? == SWITCH_HIGH;

        let mode = FlightMode::from_raw(receiver.channel(Channel::Mode)?);
        if mode != self.mode {
            debug!("flight mode {}", mode.name());
        }
        self.mode = mode;

        let (roll, pitch) = match mode {
            FlightMode::Angle => (self.config.roll_angle, self.config.pitch_angle),
            FlightMode::Rate => (self.config.roll_rate, self.config.pitch_rate),
            FlightMode::Invalid => {
                warn!("invalid flight mode, holding roll and pitch requests");
                mask |= 1 << Channel::Mode.index();
                (self.config.roll_angle, self.config.pitch_angle)
            }
        };

        if mode != FlightMode::Invalid {
            self.request.roll = self.map_channel(receiver, &range, Channel::Roll, roll, &mut mask)?;
            self.request.pitch =
                self.map_channel(receiver, &range, Channel::Pitch, pitch, &mut mask)?;
        }
        let yaw_rate = self.config.yaw_rate;
        self.request.yaw = self.map_channel(receiver, &range, Channel::Yaw, yaw_rate, &mut mask)?;
        let throttle = self.config.throttle;
        self.request.throttle =
            self.map_channel(receiver, &range, Channel::Throttle, throttle, &mut mask)?;

        if mask != 0 {
            return Err(RcError::InvalidChannels { mask });
        }
        Ok(self.request)
    }

    fn map_channel<R: Receiver>(
        &self,
        receiver: &mut R,
        range: &PulseRange,
        channel: Channel,
        limits: Limits,
        mask: &mut u8,
    ) -> Result<f32, RcError> {
        let raw = receiver.channel(channel)?;

        let pulse = if range.is_valid(raw) {
            range.clamp(raw)
        } else {
            warn!("{} channel out of range: {} us", channel.name(), raw);
            *mask |= 1 << channel.index();
            if channel == Channel::Throttle {
                range.min_us
            } else {
                range.mid_us()
            }
        };

        Ok(map_range(
            pulse as f32,
            range.min_us as f32,
            range.max_us as f32,
            limits.min,
            limits.max,
        ))
    }

    /// Last request, including substituted values.
    pub fn requests(&self) -> RcRequest {
        self.request
    }

    pub fn flight_mode(&self) -> FlightMode {
        self.mode
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn is_throttle_idle(&self) -> bool {
        self.request.throttle <= self.config.throttle_idle_tolerance
    }
}
