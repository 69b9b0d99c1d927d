use embedded_hal::PwmPin;
use embedded_time::duration::Microseconds;
use nalgebra::Vector3;
use quad_flight::{
    attitude::AttitudeError,
    config::{ImuFilterConfig, PreflightConfig},
    error::ConfigError,
    hal::{
        Channel, Imu, ImuSample, PulseRange, PwmEsc, Receiver, RxError, SensorError, TimerConfig,
    },
    preflight::PreflightStatus,
    rc::RcError,
    FlightConfig, FlightController, FlightError, Severity,
};

const TIMER: TimerConfig = TimerConfig {
    clock_hz: 3_000_000,
    period: 60_000,
};

const LEVEL: [f32; 3] = [0., 0., 1000.];
const INVERTED: [f32; 3] = [0., 0., -1000.];

struct MockImu {
    accel: [f32; 3],
    /// Body rates [mdps]
    rate: [f32; 3],
    error: Option<SensorError>,
}

impl MockImu {
    fn level() -> Self {
        Self {
            accel: LEVEL,
            rate: [0.; 3],
            error: None,
        }
    }
}

impl Imu for MockImu {
    fn read(&mut self) -> Result<ImuSample, SensorError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok(ImuSample::new(
            Vector3::new(self.accel[0], self.accel[1], self.accel[2]),
            Vector3::new(self.rate[0], self.rate[1], self.rate[2]),
            Microseconds(1000),
        ))
    }
}

struct MockReceiver {
    channels: [u32; Channel::COUNT],
    range: PulseRange,
}

impl MockReceiver {
    fn new() -> Self {
        Self {
            // roll, pitch, throttle, yaw, arm, mode
            channels: [1500, 1500, 988, 1500, 1, 1],
            range: PulseRange::PWM,
        }
    }

    fn set(&mut self, channel: Channel, value: u32) {
        self.channels[channel.index()] = value;
    }
}

impl Receiver for MockReceiver {
    fn pulse_range(&self) -> PulseRange {
        self.range
    }

    fn channel(&mut self, channel: Channel) -> Result<u32, RxError> {
        Ok(self.channels[channel.index()])
    }
}

#[derive(Debug)]
struct MockPin {
    duty: u16,
    enabled: bool,
}

impl PwmPin for MockPin {
    type Duty = u16;

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn enable(&mut self) {
        self.enabled = true;
    }

    fn get_duty(&self) -> u16 {
        self.duty
    }

    fn get_max_duty(&self) -> u16 {
        TIMER.period as u16
    }

    fn set_duty(&mut self, duty: u16) {
        self.duty = duty;
    }
}

type Controller = FlightController<MockImu, MockReceiver, PwmEsc<MockPin>>;

fn pins() -> [MockPin; 4] {
    [(); 4].map(|_| MockPin {
        duty: 0,
        enabled: false,
    })
}

fn controller_with(config: FlightConfig) -> Controller {
    FlightController::builder()
        .imu(MockImu::level())
        .receiver(MockReceiver::new())
        .esc(PwmEsc::new(pins(), TIMER))
        .config(config)
        .build()
        .unwrap()
}

fn controller(preflight: PreflightConfig) -> Controller {
    controller_with(FlightConfig {
        preflight,
        ..FlightConfig::default()
    })
}

fn quick_preflight() -> PreflightConfig {
    PreflightConfig {
        required_samples: 10,
        timeout_ms: 30_000,
    }
}

fn idle(fc: &Controller) -> u32 {
    fc.esc().properties().unwrap().idle as u32
}

/// Turn the arm switch on and step until the pre-flight check lets the motors arm.
fn arm(fc: &mut Controller) {
    fc.receiver_mut().set(Channel::Arm, 2);
    for _ in 0..20 {
        if fc.step().is_ok() && fc.is_armed() {
            return;
        }
    }
    panic!("failed to arm");
}

#[test]
fn starts_disarmed_at_minimum_command() {
    let fc = controller(quick_preflight());

    assert!(!fc.is_armed());
    assert_eq!(fc.esc().commands(), [3000; 4]);
    assert!(fc.esc().driver().pins().iter().all(|pin| pin.enabled && pin.duty == 3000));
}

#[test]
fn missing_receiver_is_fatal() {
    let result = Controller::builder()
        .imu(MockImu::level())
        .esc(PwmEsc::new(pins(), TIMER))
        .build();

    let error = result.err().unwrap();
    assert_eq!(error, FlightError::Config(ConfigError::Missing("receiver")));
    assert_eq!(error.severity(), Severity::Fatal);
}

#[test]
fn inverted_receiver_range_fails_to_build() {
    let mut receiver = MockReceiver::new();
    receiver.range = PulseRange {
        min_us: 2000,
        max_us: 1000,
        ..PulseRange::PWM
    };

    let result = Controller::builder()
        .imu(MockImu::level())
        .receiver(receiver)
        .esc(PwmEsc::new(pins(), TIMER))
        .build();

    let error = result.err().unwrap();
    assert_eq!(error, FlightError::Config(ConfigError::InvalidPulseRange));
    assert_eq!(error.severity(), Severity::Fatal);
}

#[test]
fn angle_mode_roll_request() {
    let mut fc = controller(quick_preflight());

    fc.receiver_mut().set(Channel::Arm, 2);
    assert_eq!(fc.step(), Err(FlightError::ArmRefused));
    assert!(!fc.is_armed());

    arm(&mut fc);
    assert_eq!(fc.preflight_status(), PreflightStatus::Ready);
    assert_eq!(fc.esc().commands(), [idle(&fc); 4]);

    // Roll 5 degrees right at 30 % throttle
    fc.receiver_mut().set(Channel::Roll, 1756);
    fc.receiver_mut().set(Channel::Throttle, 1295);
    for _ in 0..50 {
        assert_eq!(fc.step(), Ok(()));
    }

    let motors = fc.motor_commands();
    assert!(motors.mtr1 > motors.mtr3);
    assert!(motors.mtr2 > motors.mtr4);
    assert_eq!(motors.mtr1, motors.mtr2);
    assert_eq!(motors.mtr3, motors.mtr4);
    assert!(!fc.controller().is_integrator_held());

    let commands = fc.esc().commands();
    assert!(commands[0] > commands[2]);
    let pins = fc.esc().driver().pins();
    assert!(pins[0].duty > pins[2].duty);
    assert!(pins[1].duty > pins[3].duty);

    // Arm switch off stops the motors and requires a new check
    fc.receiver_mut().set(Channel::Arm, 1);
    assert_eq!(fc.step(), Ok(()));
    assert!(!fc.is_armed());
    assert_eq!(fc.esc().commands(), [3000; 4]);
    assert_eq!(fc.preflight_status(), PreflightStatus::Pending);
}

#[test]
fn inverted_vehicle_never_arms() {
    let mut fc = controller(quick_preflight());
    fc.imu_mut().accel = INVERTED;
    fc.receiver_mut().set(Channel::Arm, 2);

    for _ in 0..100 {
        assert_eq!(fc.step(), Err(FlightError::ArmRefused));
    }
    assert!(!fc.is_armed());
    assert_eq!(fc.esc().commands(), [3000; 4]);
}

#[test]
fn preflight_timeout_latches_until_reset() {
    let mut fc = controller(PreflightConfig {
        required_samples: 3,
        timeout_ms: 5,
    });
    fc.imu_mut().accel = INVERTED;

    for _ in 0..5 {
        assert_eq!(fc.step(), Ok(()));
    }
    assert_eq!(fc.step(), Err(FlightError::PreflightTimeout));
    assert_eq!(fc.step(), Err(FlightError::PreflightTimeout));

    fc.imu_mut().accel = LEVEL;
    fc.reset_preflight();
    arm(&mut fc);
}

#[test]
fn invalid_throttle_is_a_warning() {
    let mut fc = controller(quick_preflight());
    fc.receiver_mut().set(Channel::Throttle, 500);

    let error = fc.step().unwrap_err();
    match error {
        FlightError::Rc(rc) => assert!(rc.contains(Channel::Throttle)),
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(error.severity(), Severity::Warn);
    assert_eq!(fc.requests().throttle, 0.);
}

#[test]
fn missed_sample_holds_the_estimate() {
    let mut fc = controller(quick_preflight());
    fc.step().unwrap();
    let estimate = *fc.estimate();

    fc.imu_mut().error = Some(SensorError::NotReady);
    assert_eq!(fc.step(), Err(FlightError::Sensor(SensorError::NotReady)));
    assert_eq!(*fc.estimate(), estimate);
}

#[test]
fn filtered_loop_recovers_from_non_finite_sample() {
    let mut fc = controller_with(FlightConfig {
        preflight: quick_preflight(),
        imu_filter: ImuFilterConfig {
            gyro_cutoff_hz: Some(50.),
            accel_cutoff_hz: Some(50.),
        },
        ..FlightConfig::default()
    });
    arm(&mut fc);
    fc.receiver_mut().set(Channel::Throttle, 1295);
    assert_eq!(fc.step(), Ok(()));
    let estimate = *fc.estimate();

    fc.imu_mut().accel = [0., f32::NAN, 1000.];
    let error = fc.step().unwrap_err();
    assert_eq!(error, FlightError::Attitude(AttitudeError::InvalidSample));
    assert_eq!(error.severity(), Severity::Warn);
    assert!(fc.is_armed());
    assert_eq!(*fc.estimate(), estimate);
    assert!(fc.esc().commands().iter().all(|&c| c > idle(&fc)));

    // Good samples after the bad one reach the estimate again
    fc.imu_mut().accel = LEVEL;
    fc.imu_mut().rate = [20_000., 0., 0.];
    for _ in 0..200 {
        assert_eq!(fc.step(), Ok(()));
    }
    assert!((fc.estimate().roll_rate - 20.).abs() < 0.1);
    assert!(fc.estimate().roll_angle > 0.);

    // The rate loop opposes the measured roll
    let motors = fc.motor_commands();
    assert!(motors.mtr3 > motors.mtr1);
    assert!(motors.mtr4 > motors.mtr2);
    assert!(fc.is_armed());
}

#[test]
fn sensor_failure_disarms() {
    let mut fc = controller(quick_preflight());
    arm(&mut fc);

    fc.imu_mut().error = Some(SensorError::Bus);
    let error = fc.step().unwrap_err();
    assert_eq!(error, FlightError::Sensor(SensorError::Bus));
    assert!(error.severity().is_fatal());
    assert!(!fc.is_armed());
    assert_eq!(fc.esc().commands(), [3000; 4]);
}

#[test]
fn invalid_mode_still_writes_motors() {
    let mut fc = controller(quick_preflight());
    arm(&mut fc);

    fc.receiver_mut().set(Channel::Mode, 0);
    let error = fc.step().unwrap_err();
    assert!(matches!(error, FlightError::Rc(RcError::InvalidChannels { .. })));
    assert!(fc.is_armed());
    assert_eq!(fc.esc().commands(), [idle(&fc); 4]);
}

#[test]
fn shutdown_disables_outputs() {
    let mut fc = controller(quick_preflight());
    arm(&mut fc);

    fc.shutdown().unwrap();
    assert!(!fc.is_armed());
    assert!(fc.esc().driver().pins().iter().all(|pin| !pin.enabled));
}
