use super::{Channel, Receiver, RxError};
use crate::hal::PulseRange;

const HZ_PER_MHZ: u32 = 1_000_000;

/// Input capture edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Rising,
    Falling,
}

/// Rising and falling capture values for one PWM input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PulseCapture {
    rise: u32,
    ticks: u32,
    awaiting_fall: bool,
    is_updated: bool,
}

impl PulseCapture {
    /// Record a capture `counter` value for `edge`.
    ///
    /// A pulse is complete on the falling edge that follows a rising edge.
    /// The counter is assumed to have wrapped at most once in between.
    pub fn on_edge(&mut self, edge: Edge, counter: u32, period: u32) {
        match edge {
            Edge::Rising => {
                self.rise = counter;
                self.awaiting_fall = true;
                self.is_updated = false;
            }
            Edge::Falling if self.awaiting_fall => {
                self.ticks = if counter > self.rise {
                    counter - self.rise
                } else {
                    period.saturating_sub(self.rise) + counter
                };
                self.awaiting_fall = false;
                self.is_updated = true;
            }
            Edge::Falling => {}
        }
    }

    /// Width of the last complete pulse in timer ticks.
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// A pulse completed since the last read.
    pub fn is_updated(&self) -> bool {
        self.is_updated
    }

    fn take(&mut self) -> u32 {
        self.is_updated = false;
        self.ticks
    }
}

/// RC receiver decoding one PWM pulse per channel from timer input captures.
///
/// [`PwmReceiver::capture`] is meant to be called from the capture interrupt;
/// sharing the receiver between the interrupt and the control loop is up to
/// the application.
#[derive(Clone, Debug)]
pub struct PwmReceiver {
    pulses: [PulseCapture; Channel::COUNT],
    clock_mhz: u32,
    period: u32,
    range: PulseRange,
}

impl PwmReceiver {
    /// Create a receiver for capture timers running at `clock_hz` and wrapping at `period`.
    pub fn new(clock_hz: u32, period: u32) -> Result<Self, RxError> {
        if clock_hz == 0 || clock_hz % HZ_PER_MHZ != 0 || period == 0 {
            return Err(RxError::InvalidClock);
        }

        Ok(Self {
            pulses: [PulseCapture::default(); Channel::COUNT],
            clock_mhz: clock_hz / HZ_PER_MHZ,
            period,
            range: PulseRange::PWM,
        })
    }

    pub fn with_pulse_range(mut self, range: PulseRange) -> Result<Self, RxError> {
        range.validate().map_err(|_| RxError::InvalidPulseRange)?;
        self.range = range;
        Ok(self)
    }

    pub fn capture(&mut self, channel: Channel, edge: Edge, counter: u32) {
        self.pulses[channel.index()].on_edge(edge, counter, self.period);
    }

    pub fn is_updated(&self, channel: Channel) -> bool {
        self.pulses[channel.index()].is_updated()
    }

    /// Width of the last complete pulse on `channel` [us].
    pub fn pulse_width_us(&self, channel: Channel) -> u32 {
        self.pulses[channel.index()].ticks() / self.clock_mhz
    }
}

impl Receiver for PwmReceiver {
    fn pulse_range(&self) -> PulseRange {
        self.range
    }

    /// Stale channels return the last complete pulse.
    fn channel(&mut self, channel: Channel) -> Result<u32, RxError> {
        let width_us = self.pulses[channel.index()].take() / self.clock_mhz;

        if channel.is_switch() {
            let position = if width_us >= self.range.mid_us() { 2 } else { 1 };
            Ok(position)
        } else {
            Ok(width_us)
        }
    }
}
