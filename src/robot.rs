use core::fmt::{Result as FmtResult, Write};
use core::task::Poll;
use heapless::Vec;

use crate::actuators::MotionAxis;
use crate::command::{Command, CommandCode};
use crate::config::{JointConfig, JOINT_COUNT};
use crate::error::ErrorCode;
use crate::machine::{Homing, HomingError, HomingOutcome};
use crate::query::{
    CalibrationReport, CalibrationStateReport, ParamsReport, StateReport, StepsReport,
};
use crate::registry::{JointId, JointRegistry, RegistryError};
use crate::runner::{MoveOutcome, MoveReport, MoveRequest, SyncMove};
use crate::sensors::DigitalIo;
use crate::timer::Monotonic;
use crate::util::parse_int;

pub const CONNECTED_RESPONSE: &str = "CONNECTED";
pub const ENABLED: &str = "ENABLED";
pub const DISABLED: &str = "DISABLED";

pub struct RobotBuilder<A: MotionAxis> {
    joints: Vec<(JointConfig, A), JOINT_COUNT>,
}

#[derive(Copy, Clone, Debug)]
pub enum RobotBuilderError {
    TooManyJoints,
}

#[derive(Copy, Clone, Debug)]
pub enum RobotValidationError {
    MissingJoints { found: usize },
    Joint(RegistryError),
}

impl<A: MotionAxis> RobotBuilder<A> {
    pub fn new() -> Self {
        Self { joints: Vec::new() }
    }

    pub fn with_joints(joints: [(JointConfig, A); JOINT_COUNT]) -> Self {
        Self {
            joints: joints.into_iter().collect(),
        }
    }

    pub fn add_joint(&mut self, config: JointConfig, axis: A) -> Result<(), RobotBuilderError> {
        self.joints
            .push((config, axis))
            .map_err(|_| RobotBuilderError::TooManyJoints)?;

        Ok(())
    }

    fn validate(&self) -> Result<(), RobotValidationError> {
        if self.joints.len() != JOINT_COUNT {
            return Err(RobotValidationError::MissingJoints {
                found: self.joints.len(),
            });
        }

        Ok(())
    }

    pub fn build<Io, Clock, const TIMER_HZ: u32>(
        self,
        io: Io,
        clock: Clock,
    ) -> Result<Robot<A, Io, Clock, TIMER_HZ>, RobotValidationError>
    where
        Io: DigitalIo,
        Clock: Monotonic<TIMER_HZ>,
    {
        self.validate()?;

        let mut joints = self.joints;
        joints.sort_unstable_by_key(|(config, _)| config.index);

        let configs: [JointConfig; JOINT_COUNT] = core::array::from_fn(|slot| joints[slot].0);
        let registry = JointRegistry::new(&configs).map_err(RobotValidationError::Joint)?;
        let axes = joints.into_iter().map(|(_, axis)| axis).collect();

        Ok(Robot {
            registry,
            axes,
            io,
            clock,
        })
    }
}

impl<A: MotionAxis> Default for RobotBuilder<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// The arm: joint registry, one axis per joint, the board's digital lines and
/// a clock. Commands run to completion inside [`Robot::handle_line`].
pub struct Robot<A, Io, Clock, const TIMER_HZ: u32>
where
    A: MotionAxis,
    Io: DigitalIo,
    Clock: Monotonic<TIMER_HZ>,
{
    registry: JointRegistry,
    axes: Vec<A, JOINT_COUNT>,
    io: Io,
    clock: Clock,
}

impl<A, Io, Clock, const TIMER_HZ: u32> Robot<A, Io, Clock, TIMER_HZ>
where
    A: MotionAxis,
    Io: DigitalIo,
    Clock: Monotonic<TIMER_HZ>,
{
    /// Loads the shared motion params into every axis and enables every joint.
    pub fn start(&mut self) {
        let params = self.registry.params();
        for axis in self.axes.iter_mut() {
            axis.apply_params(params);
        }

        for joint in JointId::all() {
            if self.set_enabled(joint, true).is_err() {
                error!("joint {} enable line write failed", joint.index());
            }
        }

        info!(
            "robot started, velocity {} acceleration {}",
            params.max_velocity,
            params.acceleration
        );
    }

    pub fn registry(&self) -> &JointRegistry {
        &self.registry
    }

    pub fn axis(&self, joint: JointId) -> &A {
        &self.axes[joint.slot()]
    }

    pub fn io(&self) -> &Io {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut Io {
        &mut self.io
    }

    /// Zero is ignored: no axis can run at it, and homing restores the shared pair.
    pub fn set_max_velocity(&mut self, max_velocity: i32) {
        if max_velocity == 0 {
            warn!("zero velocity ignored");
            return;
        }

        self.registry.set_max_velocity(max_velocity);
        for axis in self.axes.iter_mut() {
            axis.set_velocity_limit(max_velocity as f32);
        }
        info!("velocity set to {}", max_velocity);
    }

    pub fn set_acceleration(&mut self, acceleration: i32) {
        if acceleration == 0 {
            warn!("zero acceleration ignored");
            return;
        }

        self.registry.set_acceleration(acceleration);
        for axis in self.axes.iter_mut() {
            axis.set_acceleration_limit(acceleration as f32);
        }
        info!("acceleration set to {}", acceleration);
    }

    /// Drives the joint's enable line to the level its polarity gives `enabled`.
    pub fn set_enabled(&mut self, joint: JointId, enabled: bool) -> Result<(), Io::Error> {
        let entry = self.registry.get(joint);
        let level = entry.enable_polarity().level(enabled);
        self.io.set_output_level(entry.enable_pin(), level)?;
        self.registry.get_mut(joint).set_enabled(enabled);

        Ok(())
    }

    /// Moves every joint in `request` at once and returns when all have stopped.
    pub fn move_joints(&mut self, request: &MoveRequest) -> MoveReport {
        let mut sync = SyncMove::start(request, &mut self.axes);

        loop {
            // latch the time the axes read during this round
            let _ = self.clock.now();

            if let Poll::Ready(report) = sync.poll(&mut self.registry, &mut self.axes, &mut self.io)
            {
                debug!("move finished");
                return report;
            }
        }
    }

    /// Homes one joint, blocking until it calibrates, times out or fails.
    pub fn calibrate_joint(&mut self, joint: JointId) -> Result<HomingOutcome, HomingError> {
        let mut homing = Homing::<TIMER_HZ>::new(joint);
        let axis = &mut self.axes[joint.slot()];

        loop {
            let poll = homing.poll(&mut self.registry, axis, &mut self.io, &mut self.clock);
            if let Poll::Ready(result) = poll {
                return result;
            }
        }
    }

    /// Parses and runs one protocol line, writing every response line to `out`.
    pub fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> FmtResult {
        debug!("received {}", line);

        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(code) => return reject(out, code),
        };

        match command.code {
            CommandCode::Move => self.handle_move(&command, out),
            CommandCode::Check => writeln!(out, "{}", CONNECTED_RESPONSE),
            CommandCode::SetVel => {
                let max_velocity = command.integer_argument();
                self.set_max_velocity(max_velocity);
                writeln!(out, "Velocity Set to: {}", max_velocity)
            }
            CommandCode::SetAcc => {
                let acceleration = command.integer_argument();
                self.set_acceleration(acceleration);
                writeln!(out, "Acceleration Set to: {}", acceleration)
            }
            CommandCode::Toggle => self.handle_toggle(&command, out),
            CommandCode::Calibrate => self.handle_calibrate(&command, out),
            CommandCode::State => {
                let report = StateReport::read(&self.registry, &mut self.io);
                writeln!(out, "{}", report)
            }
            CommandCode::Steps => writeln!(out, "{}", StepsReport(&self.registry)),
            CommandCode::Params => writeln!(out, "{}", ParamsReport(self.registry.params())),
            CommandCode::CalState => writeln!(out, "{}", CalibrationStateReport(&self.registry)),
            CommandCode::Unknown => reject(out, ErrorCode::CommandNotDefined),
        }
    }

    fn handle_move<W: Write>(&mut self, command: &Command<'_>, out: &mut W) -> FmtResult {
        let actions = match command.actions() {
            Ok(actions) => actions,
            Err(code) => return reject(out, code),
        };

        let mut request = MoveRequest::new();
        for action in actions {
            match JointId::new(action.joint) {
                Ok(joint) => request.add(joint, parse_int(action.value)),
                Err(code) => reject(out, code)?,
            }
        }

        writeln!(out, "now moving: {}", request)?;
        let report = self.move_joints(&request);

        for (joint, outcome) in report.iter() {
            if let MoveOutcome::LimitReached { .. } = outcome {
                writeln!(out, "J{} limit reached", joint)?;
            }
        }

        Ok(())
    }

    fn handle_toggle<W: Write>(&mut self, command: &Command<'_>, out: &mut W) -> FmtResult {
        let actions = match command.actions() {
            Ok(actions) => actions,
            Err(code) => return reject(out, code),
        };

        for action in actions {
            let enabled = match action.value {
                ENABLED => true,
                DISABLED => false,
                // the rest of the list is dropped
                _ => return reject(out, ErrorCode::InvalidState),
            };

            let joint = match JointId::new(action.joint) {
                Ok(joint) => joint,
                Err(code) => {
                    reject(out, code)?;
                    continue;
                }
            };

            if self.set_enabled(joint, enabled).is_err() {
                error!("joint {} enable line write failed", joint.index());
                continue;
            }

            info!("joint {} enabled: {}", joint.index(), enabled);
            writeln!(out, "Stepper: J{} {}", joint, action.value)?;
        }

        Ok(())
    }

    fn handle_calibrate<W: Write>(&mut self, command: &Command<'_>, out: &mut W) -> FmtResult {
        let joints = match command.joints() {
            Ok(joints) => joints,
            Err(code) => return reject(out, code),
        };

        let mut report = CalibrationReport::new();
        for index in joints {
            let joint = match JointId::new(index) {
                Ok(joint) => joint,
                Err(code) => {
                    reject(out, code)?;
                    continue;
                }
            };

            writeln!(out, "Calibrating Stepper J{}", joint)?;
            match self.calibrate_joint(joint) {
                Ok(HomingOutcome::Calibrated) => {}
                Ok(HomingOutcome::TimedOut) => report.fail(joint),
                Err(err) => {
                    if let Some(code) = err.code() {
                        reject(out, code)?;
                    }
                    report.fail(joint);
                }
            }
        }

        writeln!(out, "{}", report)
    }
}

fn reject<W: Write>(out: &mut W, code: ErrorCode) -> FmtResult {
    warn!("rejected with {}", code.as_str());
    writeln!(out, "{}", code)
}
