use embedded_time::duration::Microseconds;

use super::{FlightController, FlightError};
use crate::{
    attitude::{AttitudeCommand, AttitudeController, AttitudeEstimate, AttitudeEstimator, ImuFilter},
    config::FlightConfig,
    error::ConfigError,
    esc::Esc,
    hal::{EscDriver, Imu, Receiver},
    mixer::{Mixer, MotorCommands},
    preflight::{PreflightCheck, PreflightStatus},
    rc::RcMapper,
};

/// Collects the hardware collaborators and configuration of a [`FlightController`].
pub struct Builder<I, R, D> {
    imu: Option<I>,
    receiver: Option<R>,
    esc: Option<D>,
    config: FlightConfig,
}

impl<I, R, D> Default for Builder<I, R, D> {
    fn default() -> Self {
        Self {
            imu: None,
            receiver: None,
            esc: None,
            config: FlightConfig::default(),
        }
    }
}

impl<I, R, D> Builder<I, R, D> {
    pub fn imu(mut self, imu: I) -> Self {
        self.imu = Some(imu);
        self
    }

    pub fn receiver(mut self, receiver: R) -> Self {
        self.receiver = Some(receiver);
        self
    }

    pub fn esc(mut self, driver: D) -> Self {
        self.esc = Some(driver);
        self
    }

    pub fn config(mut self, config: FlightConfig) -> Self {
        self.config = config;
        self
    }
}

impl<I, R, D> Builder<I, R, D>
where
    I: Imu,
    R: Receiver,
    D: EscDriver,
{
    /// Validate the configuration, bind the RC mapper to the receiver and
    /// start the ESC outputs with the motors stopped.
    pub fn build(self) -> Result<FlightController<I, R, D>, FlightError> {
        let config = self.config;
        config.validate()?;

        let imu = self.imu.ok_or(ConfigError::Missing("IMU"))?;
        let receiver = self.receiver.ok_or(ConfigError::Missing("receiver"))?;
        let driver = self.esc.ok_or(ConfigError::Missing("ESC driver"))?;

        let mut mapper = RcMapper::new(config.rc)?;
        mapper.init(&receiver)?;

        let mut esc = Esc::new(driver, config.esc);
        let props = esc.init()?;
        esc.start()?;

        let controller = AttitudeController::new(&config.controller, &props)?;
        let mixer = Mixer::new(&props, &config.controller, &config.mixer)?;

        info!("flight controller ready");

        Ok(FlightController {
            imu,
            receiver,
            esc,
            estimator: AttitudeEstimator::new(&config.attitude)?,
            imu_filter: ImuFilter::new(&config.imu_filter),
            controller,
            mixer,
            mapper,
            preflight: PreflightCheck::new(&config.preflight),
            preflight_status: PreflightStatus::Pending,
            sample: None,
            dt: Microseconds(0),
            estimate: AttitudeEstimate::default(),
            command: AttitudeCommand::default(),
            motors: MotorCommands::default(),
            config,
        })
    }
}
