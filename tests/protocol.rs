use core::task::Poll;

use robert_arm::actuators::MotionAxis;
use robert_arm::config::{JointConfig, DEFAULT_JOINTS};
use robert_arm::registry::{HomingDirection, JointId};
use robert_arm::runner::{MoveOutcome, MoveRequest};
use robert_arm::sensors::{Level, PinId, Polarity};
use robert_arm::sim::{sim_robot, SimJournal, SimPinBank, SimRobot, SimSerial};
use robert_arm::SerialLink;

fn robot() -> SimRobot {
    let mut robot = sim_robot(&DEFAULT_JOINTS, SimPinBank::new(), None).unwrap();
    robot.start();
    robot
}

fn send(robot: &mut SimRobot, line: &str) -> String {
    let mut out = String::new();
    robot.handle_line(line, &mut out).unwrap();
    out
}

fn joint(index: i32) -> JointId {
    JointId::new(index).unwrap()
}

#[test]
fn check_answers_connected() {
    let mut robot = robot();
    assert_eq!(send(&mut robot, "CHECK>"), "CONNECTED\n");
}

#[test]
fn malformed_lines_are_rejected() {
    let mut robot = robot();

    assert_eq!(send(&mut robot, "CHECK"), "C001\n");
    assert_eq!(send(&mut robot, "MOVE>J1_200"), "C001\n");
    assert_eq!(send(&mut robot, "TOGGLE>J1_ENABLED"), "C001\n");
    assert_eq!(send(&mut robot, "CALIBRATE>J1"), "C001\n");
    assert_eq!(send(&mut robot, "HOME>"), "C002\n");
    assert_eq!(send(&mut robot, "move>J1_200;"), "C002\n");
}

#[test]
fn malformed_lines_change_nothing() {
    let mut robot = robot();
    let state = send(&mut robot, "STATE>");
    let steps = send(&mut robot, "STEPS>");
    let params = send(&mut robot, "PARAMS>");

    for line in [
        "TOGGLE J1_DISABLED;",
        "SETVEL 500",
        "MOVE J1_200;",
        "TOGGLE>J1_DISABLED",
        "MOVE>J1_200",
    ] {
        assert_eq!(send(&mut robot, line), "C001\n");
    }

    assert_eq!(send(&mut robot, "STATE>"), state);
    assert_eq!(send(&mut robot, "STEPS>"), steps);
    assert_eq!(send(&mut robot, "PARAMS>"), params);
    assert_eq!(robot.axis(joint(1)).current_position(), 0);
    assert_eq!(robot.axis(joint(1)).ticks(), 0);
}

#[test]
fn steps_unknown_until_calibrated() {
    let mut robot = robot();
    assert_eq!(
        send(&mut robot, "STEPS>"),
        "[STEPS];J1_UNKNOWN;J2_UNKNOWN;J3_UNKNOWN;J4_UNKNOWN;J5_UNKNOWN;J6_UNKNOWN;\n"
    );

    // J3 homes toward positive steps onto the switch on pin 18
    robot.io_mut().set_input_after(PinId(18), 30, Level::Low);
    assert_eq!(
        send(&mut robot, "CALIBRATE>J3;"),
        "Calibrating Stepper J3\n[CALIBRATION];OK\n"
    );
    assert_eq!(
        send(&mut robot, "STEPS>"),
        "[STEPS];J1_UNKNOWN;J2_UNKNOWN;J3_0;J4_UNKNOWN;J5_UNKNOWN;J6_UNKNOWN;\n"
    );

    assert_eq!(send(&mut robot, "MOVE>J3_-40;"), "now moving: {3:-40}\n");
    assert_eq!(
        send(&mut robot, "STEPS>"),
        "[STEPS];J1_UNKNOWN;J2_UNKNOWN;J3_-40;J4_UNKNOWN;J5_UNKNOWN;J6_UNKNOWN;\n"
    );
}

#[test]
fn calibration_is_idempotent() {
    let mut robot = robot();
    robot.io_mut().set_input_after(PinId(18), 30, Level::Low);

    send(&mut robot, "CALIBRATE>J3;");
    let steps = send(&mut robot, "STEPS>");
    let calstate = send(&mut robot, "CALSTATE>");

    assert_eq!(
        send(&mut robot, "CALIBRATE>J3;"),
        "Calibrating Stepper J3\n[CALIBRATION];OK\n"
    );
    assert_eq!(send(&mut robot, "STEPS>"), steps);
    assert_eq!(send(&mut robot, "CALSTATE>"), calstate);
    assert_eq!(calstate, "[CALSTATE];J1_0;J2_0;J3_1;J4_0;J5_0;J6_0;\n");
}

#[test]
fn out_of_range_joints_are_skipped() {
    let mut robot = robot();

    assert_eq!(
        send(&mut robot, "MOVE>J9_100;J1_50;J0_5;"),
        "I001\nI001\nnow moving: {1:50}\n"
    );
    assert_eq!(robot.axis(joint(1)).current_position(), 50);
    assert_eq!(robot.registry().get(joint(1)).position(), None);
}

#[test]
fn params_follow_setvel_and_setacc() {
    let mut robot = robot();
    assert_eq!(
        send(&mut robot, "PARAMS>"),
        "[PARAMS];VEL_2000;ACC_1000;\n"
    );

    assert_eq!(send(&mut robot, "SETVEL>500;"), "Velocity Set to: 500\n");
    assert_eq!(
        send(&mut robot, "SETACC>250"),
        "Acceleration Set to: 250\n"
    );
    assert_eq!(send(&mut robot, "PARAMS>"), "[PARAMS];VEL_500;ACC_250;\n");

    for id in JointId::all() {
        assert_eq!(robot.axis(id).velocity_limit(), 500.0);
        assert_eq!(robot.axis(id).acceleration_limit(), 250.0);
    }
}

#[test]
fn zero_params_are_ignored() {
    let mut robot = robot();
    assert_eq!(send(&mut robot, "SETVEL>fast"), "Velocity Set to: 0\n");
    assert_eq!(send(&mut robot, "SETACC>0"), "Acceleration Set to: 0\n");
    assert_eq!(send(&mut robot, "PARAMS>"), "[PARAMS];VEL_2000;ACC_1000;\n");
}

#[test]
fn homing_restores_shared_params_after_zero_velocity() {
    let mut robot = robot();
    robot.io_mut().set_input_after(PinId(18), 30, Level::Low);

    send(&mut robot, "SETVEL>0");
    assert_eq!(
        send(&mut robot, "CALIBRATE>J3;"),
        "Calibrating Stepper J3\n[CALIBRATION];OK\n"
    );

    for id in JointId::all() {
        assert_eq!(robot.axis(id).velocity_limit(), 2000.0);
        assert_eq!(robot.axis(id).acceleration_limit(), 1000.0);
    }
}

#[test]
fn joints_step_in_turn_during_a_move() {
    let mut configs = DEFAULT_JOINTS;
    configs[0] = JointConfig::new(1, 24, 3, HomingDirection::TowardLimitOnPositiveSteps);
    let journal = SimJournal::default();
    let mut robot = sim_robot(&configs, SimPinBank::new(), Some(journal.clone())).unwrap();
    robot.start();

    assert_eq!(
        send(&mut robot, "MOVE>J1_200;J2_-100;"),
        "now moving: {1:200,2:-100}\n"
    );

    let steps = journal.borrow();
    assert_eq!(steps.len(), 300);
    for pair in steps[..200].chunks(2) {
        assert_eq!(pair[0].axis, 1);
        assert_eq!(pair[1].axis, 2);
    }
    assert!(steps[200..].iter().all(|step| step.axis == 1));

    assert_eq!(robot.axis(joint(1)).current_position(), 200);
    assert_eq!(robot.axis(joint(2)).current_position(), -100);
}

#[test]
fn limit_switch_cuts_a_move_short() {
    let mut robot = robot();
    // J2 homes toward negative steps onto the switch on pin 14
    robot.io_mut().set_input_after(PinId(14), 20, Level::Low);

    let mut request = MoveRequest::new();
    request.add(joint(2), -50);
    let report = robot.move_joints(&request);

    assert_eq!(
        report.outcome(joint(2)),
        Some(MoveOutcome::LimitReached { remaining: -30 })
    );
    let j2 = robot.registry().get(joint(2));
    assert!(j2.is_calibrated());
    assert_eq!(j2.position(), Some(0));
    assert_eq!(robot.axis(joint(2)).current_position(), 0);
}

#[test]
fn limit_on_positive_homing_joint() {
    let mut configs = DEFAULT_JOINTS;
    configs[0] = JointConfig::new(1, 24, 3, HomingDirection::TowardLimitOnPositiveSteps);
    let mut robot = sim_robot(&configs, SimPinBank::new(), None).unwrap();
    robot.start();
    robot.io_mut().set_input_after(PinId(3), 120, Level::Low);

    let mut request = MoveRequest::new();
    request.add(joint(1), 500);
    let report = robot.move_joints(&request);

    assert_eq!(
        report.outcome(joint(1)),
        Some(MoveOutcome::LimitReached { remaining: 380 })
    );
    assert_eq!(robot.registry().get(joint(1)).position(), Some(0));
    assert!(robot.registry().get(joint(1)).is_calibrated());
}

#[test]
fn limit_reached_is_reported() {
    let mut robot = robot();
    robot.io_mut().set_input_after(PinId(14), 20, Level::Low);

    assert_eq!(
        send(&mut robot, "MOVE>J2_-50;J4_10;"),
        "now moving: {2:-50,4:10}\nJ2 limit reached\n"
    );
    assert_eq!(
        send(&mut robot, "CALSTATE>"),
        "[CALSTATE];J1_0;J2_1;J3_0;J4_0;J5_0;J6_0;\n"
    );
    assert_eq!(
        send(&mut robot, "STEPS>"),
        "[STEPS];J1_UNKNOWN;J2_0;J3_UNKNOWN;J4_UNKNOWN;J5_UNKNOWN;J6_UNKNOWN;\n"
    );
}

#[test]
fn switch_is_ignored_moving_away_from_it() {
    let mut robot = robot();
    robot.io_mut().set_input(PinId(14), Level::Low);

    assert_eq!(send(&mut robot, "MOVE>J2_30;"), "now moving: {2:30}\n");
    assert_eq!(robot.axis(joint(2)).current_position(), 30);
    assert_eq!(robot.io().input_reads(PinId(14)), 0);
}

#[test]
fn toggle_drives_enable_lines() {
    let mut robot = robot();

    assert_eq!(
        send(&mut robot, "TOGGLE>J2_DISABLED;"),
        "Stepper: J2 DISABLED\n"
    );
    // active low
    assert_eq!(robot.io().output(PinId(30)), Some(Level::High));
    assert_eq!(
        send(&mut robot, "STATE>"),
        "[STATE];J1_ENABLED;J2_DISABLED;J3_ENABLED;J4_ENABLED;J5_ENABLED;J6_ENABLED;\n"
    );
}

#[test]
fn toggle_respects_inverted_polarity() {
    let mut configs = DEFAULT_JOINTS;
    configs[0] = JointConfig::new(1, 40, 3, HomingDirection::TowardLimitOnNegativeSteps)
        .with_enable_polarity(Polarity::ActiveHigh);
    let mut robot = sim_robot(&configs, SimPinBank::new(), None).unwrap();

    assert_eq!(
        send(&mut robot, "TOGGLE>J1_ENABLED;"),
        "Stepper: J1 ENABLED\n"
    );
    assert_eq!(robot.io().output(PinId(40)), Some(Level::High));
    assert!(send(&mut robot, "STATE>").starts_with("[STATE];J1_ENABLED;"));

    send(&mut robot, "TOGGLE>J1_DISABLED;");
    assert_eq!(robot.io().output(PinId(40)), Some(Level::Low));
    assert!(send(&mut robot, "STATE>").starts_with("[STATE];J1_DISABLED;"));
}

#[test]
fn toggle_stops_at_invalid_state() {
    let mut robot = robot();

    assert_eq!(
        send(&mut robot, "TOGGLE>J2_DISABLED;J3_OFF;J4_DISABLED;"),
        "Stepper: J2 DISABLED\nI002\n"
    );
    assert!(robot.registry().get(joint(3)).is_enabled());
    assert!(robot.registry().get(joint(4)).is_enabled());
}

#[test]
fn toggle_skips_invalid_joint() {
    let mut robot = robot();

    assert_eq!(
        send(&mut robot, "TOGGLE>J7_DISABLED;J4_DISABLED;"),
        "I001\nStepper: J4 DISABLED\n"
    );
    assert!(!robot.registry().get(joint(4)).is_enabled());
}

#[test]
fn calibrate_without_homing_direction() {
    let mut robot = robot();

    assert_eq!(
        send(&mut robot, "CALIBRATE>J5;"),
        "Calibrating Stepper J5\nI003\n[CALIBRATION];J5;\n"
    );
    assert!(!robot.registry().get(joint(5)).is_calibrated());
    assert_eq!(robot.axis(joint(5)).ticks(), 0);
}

#[test]
fn undefined_direction_does_not_stop_other_joints() {
    let mut robot = robot();
    robot.io_mut().set_input_after(PinId(18), 30, Level::Low);

    assert_eq!(
        send(&mut robot, "CALIBRATE>J5;J3;"),
        "Calibrating Stepper J5\nI003\nCalibrating Stepper J3\n[CALIBRATION];J5;\n"
    );
    assert!(!robot.registry().get(joint(5)).is_calibrated());
    assert!(robot.registry().get(joint(3)).is_calibrated());
    assert_eq!(robot.registry().get(joint(3)).position(), Some(0));
}

#[test]
fn calibrate_reports_timeouts_and_skips_bad_joints() {
    let mut robot = robot();
    robot.io_mut().set_input_after(PinId(18), 10, Level::Low);

    assert_eq!(
        send(&mut robot, "CALIBRATE>J9;J3;J1;"),
        "I001\nCalibrating Stepper J3\nCalibrating Stepper J1\n[CALIBRATION];J1;\n"
    );
    assert!(robot.registry().get(joint(3)).is_calibrated());
    assert!(!robot.registry().get(joint(1)).is_calibrated());
    // homing params are dropped again afterwards
    assert_eq!(robot.axis(joint(1)).velocity_limit(), 2000.0);
}

#[test]
fn serial_link_serves_framed_lines() {
    let mut robot = robot();
    let mut link: SerialLink<SimSerial> = SerialLink::new(SimSerial::new());
    link.serial_mut().push_input(b"CHECK>~PARAMS>\r\n");

    assert_eq!(link.serve(&mut robot), Poll::Ready(Ok(())));
    assert_eq!(link.serve(&mut robot), Poll::Ready(Ok(())));
    assert_eq!(link.serve(&mut robot), Poll::Pending);

    assert_eq!(
        link.serial_mut().take_output(),
        "CONNECTED\n[PARAMS];VEL_2000;ACC_1000;\n"
    );
}

#[test]
fn serial_link_rejects_overlong_lines() {
    let mut robot = robot();
    let mut link: SerialLink<SimSerial> = SerialLink::new(SimSerial::new());

    let mut line = b"MOVE>".to_vec();
    for _ in 0..40 {
        line.extend_from_slice(b"J1_1;");
    }
    line.push(b'~');
    link.serial_mut().push_input(&line);
    link.serial_mut().push_input(b"CHECK>~");

    assert_eq!(link.serve(&mut robot), Poll::Ready(Ok(())));
    assert_eq!(link.serve(&mut robot), Poll::Ready(Ok(())));
    assert_eq!(link.serial_mut().take_output(), "C001\nCONNECTED\n");
    assert_eq!(robot.axis(joint(1)).current_position(), 0);
}
