use super::{AttitudeCommand, AttitudeError, AttitudeEstimate};
use crate::{
    config::ControllerConfig,
    error::ConfigError,
    esc::EscCommandProperties,
    pid::Pid,
    rc::{FlightMode, RcRequest},
    transition::Transition,
};

/// Cascaded attitude controller.
///
/// In angle mode the outer angle loops turn the pilot's angle request into
/// rate setpoints; in rate mode the pilot commands rates directly. The inner
/// rate loops always run and output motor command deltas.
pub struct AttitudeController {
    roll_angle: Pid,
    pitch_angle: Pid,
    roll_rate: Pid,
    pitch_rate: Pid,
    yaw_rate: Pid,

    mode: Transition<FlightMode>,
    integrator_hold: Transition<bool>,

    /// Throttle request below which the vehicle is assumed on the ground [%]
    liftoff_pct: f32,
}

impl AttitudeController {
    /// Build the five loops. Rate loop limits are scaled from percent to
    /// motor command units using the ESC command range, and the integrator
    /// hold threshold is the liftoff command as a percentage of that range.
    pub fn new(
        config: &ControllerConfig,
        props: &EscCommandProperties,
    ) -> Result<Self, ConfigError> {
        let pct_to_cmd = props.span() / 100.;

        Ok(Self {
            roll_angle: Pid::new(&config.roll_angle)?,
            pitch_angle: Pid::new(&config.pitch_angle)?,
            roll_rate: Pid::new(&config.roll_rate.scale_limits(pct_to_cmd))?,
            pitch_rate: Pid::new(&config.pitch_rate.scale_limits(pct_to_cmd))?,
            yaw_rate: Pid::new(&config.yaw_rate.scale_limits(pct_to_cmd))?,
            mode: Transition::new(FlightMode::Angle),
            integrator_hold: Transition::new(false),
            liftoff_pct: props.to_pct(props.liftoff),
        })
    }

    /// Run one control cycle.
    ///
    /// `dt` is the time since the last cycle in seconds. An invalid flight
    /// mode runs the rate loops on the held request and reports a warning
    /// after `cmd` was written.
    pub fn update(
        &mut self,
        cmd: &mut AttitudeCommand,
        req: &RcRequest,
        est: &AttitudeEstimate,
        mode: FlightMode,
        armed: bool,
        dt: f32,
    ) -> Result<(), AttitudeError> {
        self.check_mode_switch(mode, req, est);
        self.check_integrator_hold(req.throttle, armed);

        let mut roll_rate_req = req.roll;
        let mut pitch_rate_req = req.pitch;

        if mode == FlightMode::Angle {
            roll_rate_req = self.roll_angle.update(req.roll, est.roll_angle, dt);
            pitch_rate_req = self.pitch_angle.update(req.pitch, est.pitch_angle, dt);
        }

        cmd.roll = self.roll_rate.update(roll_rate_req, est.roll_rate, dt);
        cmd.pitch = self.pitch_rate.update(pitch_rate_req, est.pitch_rate, dt);
        cmd.yaw = self.yaw_rate.update(req.yaw, est.yaw_rate, dt);

        if mode == FlightMode::Invalid {
            return Err(AttitudeError::InvalidFlightMode);
        }
        Ok(())
    }

    fn check_mode_switch(&mut self, mode: FlightMode, req: &RcRequest, est: &AttitudeEstimate) {
        let roll_angle = &mut self.roll_angle;
        let pitch_angle = &mut self.pitch_angle;

        self.mode.update(mode, |_, next| {
            if next == FlightMode::Angle {
                roll_angle.resync(req.roll, est.roll_angle);
                pitch_angle.resync(req.pitch, est.pitch_angle);
            }
        });
    }

    fn check_integrator_hold(&mut self, throttle: f32, armed: bool) {
        let hold = throttle < self.liftoff_pct || !armed;
        let mut pids = [
            &mut self.roll_angle,
            &mut self.pitch_angle,
            &mut self.roll_rate,
            &mut self.pitch_rate,
            &mut self.yaw_rate,
        ];

        self.integrator_hold.update(hold, |_, held| {
            trace!("integrator hold {}", held);
            for pid in pids.iter_mut() {
                if held {
                    pid.disable_integrator();
                    if !armed {
                        pid.zero_integrator();
                    }
                } else {
                    pid.enable_integrator();
                }
            }
        });
    }

    pub fn is_integrator_held(&self) -> bool {
        self.integrator_hold.state()
    }

    pub fn flight_mode(&self) -> FlightMode {
        self.mode.state()
    }

    /// Clear the dynamic state of every loop.
    pub fn reset(&mut self) {
        for pid in self.pids_mut() {
            pid.reset();
        }
    }

    fn pids_mut(&mut self) -> [&mut Pid; 5] {
        [
            &mut self.roll_angle,
            &mut self.pitch_angle,
            &mut self.roll_rate,
            &mut self.pitch_rate,
            &mut self.yaw_rate,
        ]
    }

    pub fn roll_angle_pid(&self) -> &Pid {
        &self.roll_angle
    }

    pub fn pitch_angle_pid(&self) -> &Pid {
        &self.pitch_angle
    }

    pub fn roll_rate_pid(&self) -> &Pid {
        &self.roll_rate
    }

    pub fn pitch_rate_pid(&self) -> &Pid {
        &self.pitch_rate
    }

    pub fn yaw_rate_pid(&self) -> &Pid {
        &self.yaw_rate
    }
}
