use num_traits::Float;

use crate::{
    attitude::{AttitudeCommand, AttitudeEstimate},
    config::{ControllerConfig, MixerConfig},
    error::ConfigError,
    esc::EscCommandProperties,
    math::{constrain_float, map_range},
};

/// One command per motor in protocol units.
///
/// Quad-X layout, seen from above:
///
/// ```text
///  1   3
///   \ /
///   / \
///  2   4
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotorCommands {
    /// Front left
    pub mtr1: f32,
    /// Rear left
    pub mtr2: f32,
    /// Front right
    pub mtr3: f32,
    /// Rear right
    pub mtr4: f32,
}

impl MotorCommands {
    pub const fn new(mtr1: f32, mtr2: f32, mtr3: f32, mtr4: f32) -> Self {
        Self {
            mtr1,
            mtr2,
            mtr3,
            mtr4,
        }
    }

    /// Allocate throttle and attitude commands to the four motors of a quad-X.
    pub fn quad_x(throttle: f32, roll: f32, pitch: f32, yaw: f32) -> Self {
        Self {
            mtr1: throttle + roll - pitch + yaw,
            mtr2: throttle + roll + pitch - yaw,
            mtr3: throttle - roll - pitch - yaw,
            mtr4: throttle - roll + pitch + yaw,
        }
    }

    pub fn as_array(&self) -> [f32; 4] {
        [self.mtr1, self.mtr2, self.mtr3, self.mtr4]
    }

    fn for_each(&mut self, mut f: impl FnMut(f32) -> f32) {
        self.mtr1 = f(self.mtr1);
        self.mtr2 = f(self.mtr2);
        self.mtr3 = f(self.mtr3);
        self.mtr4 = f(self.mtr4);
    }
}

pub struct Mixer {
    props: EscCommandProperties,
    throttle_min: f32,
    throttle_max: f32,
    thrust_compensation: bool,
}

impl Mixer {
    /// Reserve headroom above the throttle for the largest possible attitude commands.
    pub fn new(
        props: &EscCommandProperties,
        controller: &ControllerConfig,
        config: &MixerConfig,
    ) -> Result<Self, ConfigError> {
        let authority = props.scale_pct(controller.roll_rate.limit)
            + props.scale_pct(controller.pitch_rate.limit)
            + props.scale_pct(controller.yaw_rate.limit);

        let throttle_min = props.idle;
        let throttle_max = props.limit - authority;
        if !(throttle_max > throttle_min) {
            return Err(ConfigError::InsufficientThrottleRange);
        }

        Ok(Self {
            props: *props,
            throttle_min,
            throttle_max,
            thrust_compensation: config.thrust_compensation,
        })
    }

    pub fn throttle_min(&self) -> f32 {
        self.throttle_min
    }

    pub fn throttle_max(&self) -> f32 {
        self.throttle_max
    }

    pub fn is_thrust_compensated(&self) -> bool {
        self.thrust_compensation
    }

    /// Command for a throttle request in percent.
    pub fn throttle_command(&self, throttle_pct: f32) -> f32 {
        let pct = constrain_float(throttle_pct, 0., 100.);
        map_range(pct, 0., 100., self.throttle_min, self.throttle_max)
    }

    pub fn update(&self, motors: &mut MotorCommands, cmd: &AttitudeCommand, throttle_pct: f32) {
        let throttle = self.throttle_command(throttle_pct);
        *motors = MotorCommands::quad_x(throttle, cmd.roll, cmd.pitch, cmd.yaw);
    }

    /// Scale the commands by `1 / (cos(roll) cos(pitch))` to hold vertical thrust when tilted.
    ///
    /// The scaling is taken about the minimum command so stopped motors stay stopped.
    /// Does nothing if disabled in the config or when the vehicle is on its side or inverted.
    pub fn thrust_compensate(&self, motors: &mut MotorCommands, estimate: &AttitudeEstimate) {
        if !self.thrust_compensation {
            return;
        }

        let tilt = estimate.roll_angle.to_radians().cos() * estimate.pitch_angle.to_radians().cos();
        if !(tilt > 0.) {
            return;
        }

        let ratio = 1. / tilt;
        let offset = self.props.min * (ratio - 1.);
        motors.for_each(|m| ratio * m - offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn props() -> EscCommandProperties {
        EscCommandProperties {
            min: 3000.,
            max: 6000.,
            idle: 3540.,
            liftoff: 3720.,
            limit: 6000.,
        }
    }

    fn mixer() -> Mixer {
        Mixer::new(&props(), &ControllerConfig::default(), &MixerConfig::default()).unwrap()
    }

    #[test]
    fn quad_x_allocation() {
        let motors = MotorCommands::quad_x(4000., 100., 50., 10.);
        assert_eq!(motors.mtr1, 4060.);
        assert_eq!(motors.mtr2, 4140.);
        assert_eq!(motors.mtr3, 3840.);
        assert_eq!(motors.mtr4, 3960.);
    }

    #[test]
    fn throttle_range_leaves_headroom() {
        let mixer = mixer();
        assert_relative_eq!(mixer.throttle_min(), 3540.);
        // Three axes at 5 % of a 3000 wide range
        assert_relative_eq!(mixer.throttle_max(), 5550., epsilon = 1e-3);
    }

    #[test]
    fn throttle_maps_linearly() {
        let mixer = mixer();
        assert_relative_eq!(mixer.throttle_command(0.), 3540.);
        assert_relative_eq!(mixer.throttle_command(100.), 5550., epsilon = 1e-3);
        assert_relative_eq!(mixer.throttle_command(50.), 4545., epsilon = 1e-3);
        assert_relative_eq!(mixer.throttle_command(120.), 5550., epsilon = 1e-3);
    }

    #[test]
    fn update_mixes_attitude_command() {
        let mixer = mixer();
        let mut motors = MotorCommands::default();
        let cmd = AttitudeCommand {
            roll: 20.,
            pitch: 0.,
            yaw: 0.,
        };
        mixer.update(&mut motors, &cmd, 0.);

        assert_relative_eq!(motors.mtr1, 3560.);
        assert_relative_eq!(motors.mtr2, 3560.);
        assert_relative_eq!(motors.mtr3, 3520.);
        assert_relative_eq!(motors.mtr4, 3520.);
    }

    #[test]
    fn rejects_too_much_authority() {
        let mut controller = ControllerConfig::default();
        controller.roll_rate.limit = 40.;
        controller.pitch_rate.limit = 40.;
        let result = Mixer::new(&props(), &controller, &MixerConfig::default());
        assert_eq!(result.err(), Some(ConfigError::InsufficientThrottleRange));
    }

    #[test]
    fn level_thrust_is_unchanged() {
        let mixer = mixer();
        let mut motors = MotorCommands::new(4000., 4100., 4200., 4300.);
        mixer.thrust_compensate(&mut motors, &AttitudeEstimate::default());
        assert_relative_eq!(motors.mtr1, 4000.);
        assert_relative_eq!(motors.mtr4, 4300.);
    }

    #[test]
    fn tilt_increases_thrust_about_minimum() {
        let mixer = mixer();
        let estimate = AttitudeEstimate {
            roll_angle: 60.,
            ..AttitudeEstimate::default()
        };

        let mut motors = MotorCommands::new(4000., 3000., 4000., 4000.);
        mixer.thrust_compensate(&mut motors, &estimate);

        // ratio 2: 2 * 4000 - 3000 * (2 - 1)
        assert_abs_diff_eq!(motors.mtr1, 5000., epsilon = 1e-2);
        assert_abs_diff_eq!(motors.mtr2, 3000., epsilon = 1e-2);
    }

    #[test]
    fn inverted_is_not_compensated() {
        let mixer = mixer();
        let estimate = AttitudeEstimate {
            roll_angle: 120.,
            ..AttitudeEstimate::default()
        };
        let mut motors = MotorCommands::new(4000., 4000., 4000., 4000.);
        mixer.thrust_compensate(&mut motors, &estimate);
        assert_eq!(motors, MotorCommands::new(4000., 4000., 4000., 4000.));
    }

    #[test]
    fn compensation_can_be_disabled() {
        let mixer = Mixer::new(
            &props(),
            &ControllerConfig::default(),
            &MixerConfig {
                thrust_compensation: false,
            },
        )
        .unwrap();
        let estimate = AttitudeEstimate {
            pitch_angle: 30.,
            ..AttitudeEstimate::default()
        };
        let mut motors = MotorCommands::new(4000., 4000., 4000., 4000.);
        mixer.thrust_compensate(&mut motors, &estimate);
        assert_eq!(motors.mtr3, 4000.);
    }
}
