//! The flight control loop.
//!
//! [`FlightController`] owns every component of the core and the hardware
//! collaborators. The application calls [`FlightController::step`] once per
//! IMU sample.

use embedded_time::duration::Microseconds;
use thiserror::Error;

use crate::{
    attitude::{
        AttitudeCommand, AttitudeController, AttitudeError, AttitudeEstimate, AttitudeEstimator,
        ImuFilter,
    },
    config::FlightConfig,
    error::{ConfigError, Severity},
    esc::{Esc, EscError},
    hal::{EscDriver, Imu, ImuSample, Receiver, SensorError},
    math::micros_to_secs,
    mixer::{Mixer, MotorCommands},
    preflight::{self, PreflightCheck, PreflightStatus},
    rc::{FlightMode, RcError, RcMapper, RcRequest},
};

mod builder;
pub use builder::Builder;

#[derive(Error, Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlightError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("IMU: {0}")]
    Sensor(#[from] SensorError),

    #[error("RC: {0}")]
    Rc(#[from] RcError),

    #[error("attitude: {0}")]
    Attitude(#[from] AttitudeError),

    #[error("ESC: {0}")]
    Esc(#[from] EscError),

    #[error("arming refused until the pre-flight check passes")]
    ArmRefused,

    #[error("pre-flight check timed out")]
    PreflightTimeout,
}

impl FlightError {
    pub fn severity(&self) -> Severity {
        match self {
            FlightError::Config(e) => e.severity(),
            FlightError::Sensor(e) => e.severity(),
            FlightError::Rc(e) => e.severity(),
            FlightError::Attitude(e) => e.severity(),
            FlightError::Esc(e) => e.severity(),
            FlightError::ArmRefused => Severity::Warn,
            FlightError::PreflightTimeout => Severity::Fatal,
        }
    }
}

pub struct FlightController<I, R, D> {
    imu: I,
    receiver: R,
    esc: Esc<D>,
    estimator: AttitudeEstimator,
    imu_filter: ImuFilter,
    controller: AttitudeController,
    mixer: Mixer,
    mapper: RcMapper,
    preflight: PreflightCheck,
    preflight_status: PreflightStatus,

    /// Last good IMU sample
    sample: Option<ImuSample>,
    dt: Microseconds<u32>,

    estimate: AttitudeEstimate,
    command: AttitudeCommand,
    motors: MotorCommands,
    config: FlightConfig,
}

impl<I, R, D> FlightController<I, R, D> {
    pub fn builder() -> Builder<I, R, D> {
        Builder::default()
    }
}

impl<I, R, D> FlightController<I, R, D>
where
    I: Imu,
    R: Receiver,
    D: EscDriver,
{
    /// Run one control cycle.
    ///
    /// Warnings do not stop the cycle: the motor commands are still written
    /// and the first warning is returned afterwards. A fatal RC or IMU error
    /// disarms the motors and returns immediately.
    pub fn step(&mut self) -> Result<(), FlightError> {
        let mut warning = None;

        match self.imu.read() {
            Ok(sample) if !sample.is_finite() => {
                // Keep it out of the filter state, hold the estimate this cycle
                warn!("discarding non-finite IMU sample");
                self.sample = None;
                triage(Err(AttitudeError::InvalidSample), &mut warning)?;
            }
            Ok(sample) => {
                let sample = self.imu_filter.apply(&sample);
                self.dt = sample.dt;
                self.sample = Some(sample);
            }
            Err(e) if e.severity().is_fatal() => {
                error!("IMU failed, disarming");
                self.disarm_on_failure();
                return Err(e.into());
            }
            Err(e) => {
                warn!("IMU sample missed, holding last estimate");
                self.sample = None;
                triage(Err(e), &mut warning)?;
            }
        }

        if let Err(e) = self.mapper.get_requests(&mut self.receiver) {
            if e.severity().is_fatal() {
                error!("RC failed, disarming");
                self.disarm_on_failure();
                return Err(e.into());
            }
            triage(Err(e), &mut warning)?;
        }
        let request = self.mapper.requests();
        let mode = self.mapper.flight_mode();

        if let Some(sample) = &self.sample {
            triage(self.estimator.update(sample, mode, &mut self.estimate), &mut warning)?;
        }

        if !self.esc.is_armed() {
            self.update_preflight();
            if self.preflight_status == PreflightStatus::TimedOut {
                return Err(FlightError::PreflightTimeout);
            }
        }
        triage(self.check_arming(), &mut warning)?;

        let armed = self.esc.is_armed();
        triage(
            self.controller.update(
                &mut self.command,
                &request,
                &self.estimate,
                mode,
                armed,
                micros_to_secs(self.dt.0),
            ),
            &mut warning,
        )?;

        if armed {
            self.mixer.update(&mut self.motors, &self.command, request.throttle);
            self.mixer.thrust_compensate(&mut self.motors, &self.estimate);
            triage(self.esc.set_motor_commands(&self.motors), &mut warning)?;
        }

        warning.map_or(Ok(()), Err)
    }

    fn update_preflight(&mut self) {
        // Without a fresh sample the vehicle can't be shown to be upright
        let ready = match &self.sample {
            Some(sample) => preflight::ready_to_fly(
                &self.estimator,
                sample.accel.z,
                &self.estimate,
                self.mapper.is_throttle_idle(),
            ),
            None => false,
        };

        let status = self.preflight.update(ready, self.dt);
        if status != self.preflight_status && status == PreflightStatus::Ready {
            info!("pre-flight check passed");
        }
        self.preflight_status = status;
    }

    fn check_arming(&mut self) -> Result<(), FlightError> {
        let arm_requested = self.mapper.is_armed();
        let armed = self.esc.is_armed();

        if arm_requested && !armed {
            if self.preflight_status != PreflightStatus::Ready {
                warn!("arm switch on before the pre-flight check passed");
                return Err(FlightError::ArmRefused);
            }
            self.esc.arm()?;
        } else if !arm_requested && armed {
            self.esc.disarm()?;
            self.preflight.reset();
            self.preflight_status = PreflightStatus::Pending;
        }
        Ok(())
    }

    fn disarm_on_failure(&mut self) {
        if self.esc.is_armed() {
            if let Err(_e) = self.esc.disarm() {
                error!("failed to disarm motors");
            }
        }
        self.preflight.reset();
        self.preflight_status = PreflightStatus::Pending;
    }

    /// Clear a latched pre-flight timeout and start checking again.
    pub fn reset_preflight(&mut self) {
        self.preflight.reset();
        self.preflight_status = PreflightStatus::Pending;
    }

    /// Stop the motors and the output signals.
    pub fn shutdown(&mut self) -> Result<(), FlightError> {
        if self.esc.is_armed() {
            self.esc.disarm()?;
        }
        self.esc.stop()?;
        info!("flight controller stopped");
        Ok(())
    }
}

impl<I, R, D> FlightController<I, R, D>
where
    D: EscDriver,
{
    pub fn is_armed(&self) -> bool {
        self.esc.is_armed()
    }

    pub fn estimate(&self) -> &AttitudeEstimate {
        &self.estimate
    }

    pub fn attitude_command(&self) -> &AttitudeCommand {
        &self.command
    }

    pub fn motor_commands(&self) -> &MotorCommands {
        &self.motors
    }

    pub fn requests(&self) -> RcRequest {
        self.mapper.requests()
    }

    pub fn flight_mode(&self) -> FlightMode {
        self.mapper.flight_mode()
    }

    pub fn preflight_status(&self) -> PreflightStatus {
        self.preflight_status
    }

    pub fn controller(&self) -> &AttitudeController {
        &self.controller
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    pub fn config(&self) -> &FlightConfig {
        &self.config
    }

    pub fn esc(&self) -> &Esc<D> {
        &self.esc
    }

    pub fn imu_mut(&mut self) -> &mut I {
        &mut self.imu
    }

    pub fn receiver_mut(&mut self) -> &mut R {
        &mut self.receiver
    }
}

/// Fatal errors propagate, the first warning of the cycle is kept.
fn triage<E: Into<FlightError>>(
    result: Result<(), E>,
    warning: &mut Option<FlightError>,
) -> Result<(), FlightError> {
    if let Err(e) = result {
        let e = e.into();
        if e.severity().is_fatal() {
            return Err(e);
        }
        warning.get_or_insert(e);
    }
    Ok(())
}
