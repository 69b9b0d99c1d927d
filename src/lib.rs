//! # quad-flight
//! A `#![no_std]` attitude control core for quadcopters
//!
//! # Control path
//! [`rc`] maps receiver channels to pilot requests,
//! [`attitude`] estimates the vehicle attitude and runs the cascaded
//! angle and rate loops built from [`Pid`] controllers,
//! [`mixer`] turns throttle and attitude commands into motor commands, and
//! [`esc`] sanitizes them before they reach the motors.
//!
//! [`FlightController`] owns all of the above and runs one cycle per IMU sample.
//!
//! # Hardware
//! [`hal`] holds the traits for the IMU, the receiver and the ESC protocol,
//! plus PWM implementations on top of `embedded-hal`.

#![no_std]

#[macro_use]
mod fmt;

pub mod attitude;
pub use attitude::{AttitudeController, AttitudeEstimator};

pub mod config;
pub use config::FlightConfig;

pub mod error;
pub use error::{ConfigError, Severity};

pub mod esc;
pub use esc::Esc;

pub mod filter;

pub mod flight;
pub use flight::{FlightController, FlightError};

pub mod hal;

pub mod math;

pub mod mixer;
pub use mixer::{Mixer, MotorCommands};

pub mod pid;
pub use pid::Pid;

pub mod preflight;

pub mod rc;
pub use rc::{FlightMode, RcMapper};

pub mod transition;
