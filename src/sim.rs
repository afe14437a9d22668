//! Deterministic stand-ins for the arm's hardware, used by the test suites and
//! by the `robert-sim` binary.

use alloc::collections::{BTreeMap, VecDeque};
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::convert::Infallible;
use core::task::Poll;
use embedded_hal::serial;
use fugit::TimerInstantU32 as TimerInstant;

use crate::actuators::MotionAxis;
use crate::config::{JointConfig, JOINT_COUNT};
use crate::error::Error;
use crate::robot::{Robot, RobotBuilder, RobotValidationError};
use crate::sensors::{DigitalIo, Level, PinId};
use crate::timer::Monotonic;

/// Step taken by a [`SimAxis`], in the order all journaled axes took them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimStep {
    pub axis: u8,
    pub position: i32,
}

/// Shared log of steps across several axes.
pub type SimJournal = Rc<RefCell<Vec<SimStep>>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimFault {
    pub axis: u8,
}

impl Error for SimFault {}

/// Axis that takes one step every `ticks_per_step` calls to `tick`.
#[derive(Debug)]
pub struct SimAxis {
    label: u8,
    ticks_per_step: u32,
    countdown: u32,
    position: i32,
    target: i32,
    ticks: u32,
    stops: u32,
    fault_after: Option<u32>,
    velocity_limit: f32,
    acceleration_limit: f32,
    journal: Option<SimJournal>,
}

impl SimAxis {
    pub fn new(label: u8) -> Self {
        Self {
            label,
            ticks_per_step: 1,
            countdown: 1,
            position: 0,
            target: 0,
            ticks: 0,
            stops: 0,
            fault_after: None,
            velocity_limit: 0.0,
            acceleration_limit: 0.0,
            journal: None,
        }
    }

    pub fn with_ticks_per_step(mut self, ticks_per_step: u32) -> Self {
        self.ticks_per_step = ticks_per_step.max(1);
        self.countdown = self.ticks_per_step;
        self
    }

    /// Every tick after the first `ticks` fails.
    pub fn with_fault_after(mut self, ticks: u32) -> Self {
        self.fault_after = Some(ticks);
        self
    }

    pub fn with_journal(mut self, journal: SimJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn stops(&self) -> u32 {
        self.stops
    }

    pub fn velocity_limit(&self) -> f32 {
        self.velocity_limit
    }

    pub fn acceleration_limit(&self) -> f32 {
        self.acceleration_limit
    }
}

impl MotionAxis for SimAxis {
    type Error = SimFault;

    fn set_velocity_limit(&mut self, steps_per_sec: f32) {
        self.velocity_limit = steps_per_sec;
    }

    fn set_acceleration_limit(&mut self, steps_per_sec_per_sec: f32) {
        self.acceleration_limit = steps_per_sec_per_sec;
    }

    fn move_by(&mut self, delta: i32) {
        self.target = self.position.saturating_add(delta);
        self.countdown = self.ticks_per_step;
    }

    fn tick(&mut self) -> Poll<Result<(), Self::Error>> {
        if self.position == self.target {
            return Poll::Ready(Ok(()));
        }
        if let Some(limit) = self.fault_after {
            if self.ticks >= limit {
                return Poll::Ready(Err(SimFault { axis: self.label }));
            }
        }
        self.ticks += 1;

        self.countdown -= 1;
        if self.countdown == 0 {
            self.countdown = self.ticks_per_step;
            self.position += (self.target - self.position).signum();

            if let Some(journal) = &self.journal {
                journal.borrow_mut().push(SimStep {
                    axis: self.label,
                    position: self.position,
                });
            }
        }

        if self.position == self.target {
            Poll::Ready(Ok(()))
        } else {
            Poll::Pending
        }
    }

    fn distance_remaining(&self) -> i32 {
        self.target - self.position
    }

    fn current_position(&self) -> i32 {
        self.position
    }

    fn stop(&mut self) {
        self.target = self.position;
        self.stops += 1;
    }

    fn reset_position_to_zero(&mut self) {
        self.position = 0;
        self.target = 0;
    }
}

#[derive(Clone, Copy, Debug)]
struct SimInput {
    level: Level,
    reads: u32,
    // (after this many reads, switch to this level)
    scripted: Option<(u32, Level)>,
}

/// In-memory pin bank. Unknown inputs read high, as with pull-ups enabled.
#[derive(Clone, Debug, Default)]
pub struct SimPinBank {
    outputs: BTreeMap<u8, Level>,
    inputs: BTreeMap<u8, SimInput>,
}

impl SimPinBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input(&mut self, pin: PinId, level: Level) {
        let input = self.input_mut(pin);
        input.level = level;
        input.scripted = None;
    }

    /// Reads of `pin` return `level` once it has been read `reads` times.
    pub fn set_input_after(&mut self, pin: PinId, reads: u32, level: Level) {
        let input = self.input_mut(pin);
        input.scripted = Some((input.reads + reads, level));
    }

    pub fn input_reads(&self, pin: PinId) -> u32 {
        self.inputs.get(&pin.0).map_or(0, |input| input.reads)
    }

    pub fn output(&self, pin: PinId) -> Option<Level> {
        self.outputs.get(&pin.0).copied()
    }

    fn input_mut(&mut self, pin: PinId) -> &mut SimInput {
        self.inputs.entry(pin.0).or_insert(SimInput {
            level: Level::High,
            reads: 0,
            scripted: None,
        })
    }
}

impl DigitalIo for SimPinBank {
    type Error = Infallible;

    fn set_output_level(&mut self, pin: PinId, level: Level) -> Result<(), Self::Error> {
        self.outputs.insert(pin.0, level);
        Ok(())
    }

    fn output_level(&mut self, pin: PinId) -> Result<Level, Self::Error> {
        Ok(self.outputs.get(&pin.0).copied().unwrap_or(Level::Low))
    }

    fn read_input_level(&mut self, pin: PinId) -> Result<Level, Self::Error> {
        let input = self.input_mut(pin);
        if let Some((after, level)) = input.scripted {
            if input.reads >= after {
                input.level = level;
                input.scripted = None;
            }
        }
        input.reads += 1;

        Ok(input.level)
    }
}

/// Clock that advances by `step` ticks each time it is read.
#[derive(Clone, Copy, Debug)]
pub struct SimClock<const TIMER_HZ: u32> {
    ticks: u32,
    step: u32,
}

impl<const TIMER_HZ: u32> SimClock<TIMER_HZ> {
    pub fn new(start: u32, step: u32) -> Self {
        Self { ticks: start, step }
    }

    pub fn advance(&mut self, ticks: u32) {
        self.ticks = self.ticks.wrapping_add(ticks);
    }
}

impl<const TIMER_HZ: u32> Monotonic<TIMER_HZ> for SimClock<TIMER_HZ> {
    fn now(&mut self) -> TimerInstant<TIMER_HZ> {
        let now = TimerInstant::from_ticks(self.ticks);
        self.ticks = self.ticks.wrapping_add(self.step);
        now
    }
}

/// Byte-level serial port backed by two queues.
#[derive(Clone, Debug, Default)]
pub struct SimSerial {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

impl SimSerial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_input(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    pub fn take_output(&mut self) -> String {
        let bytes = core::mem::take(&mut self.tx);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl serial::Read<u8> for SimSerial {
    type Error = Infallible;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        self.rx.pop_front().ok_or(nb::Error::WouldBlock)
    }
}

impl serial::Write<u8> for SimSerial {
    type Error = Infallible;

    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        self.tx.push(word);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        Ok(())
    }
}

pub const SIM_TIMER_HZ: u32 = 1_000;

pub type SimRobot = Robot<SimAxis, SimPinBank, SimClock<SIM_TIMER_HZ>, SIM_TIMER_HZ>;

/// Builds an arm from `configs` with one [`SimAxis`] per joint, labelled by
/// joint index. The clock advances one millisecond per reading.
pub fn sim_robot(
    configs: &[JointConfig; JOINT_COUNT],
    io: SimPinBank,
    journal: Option<SimJournal>,
) -> Result<SimRobot, RobotValidationError> {
    let joints = (*configs).map(|config| {
        let axis = SimAxis::new(config.index);
        let axis = match &journal {
            Some(journal) => axis.with_journal(journal.clone()),
            None => axis,
        };
        (config, axis)
    });

    RobotBuilder::with_joints(joints).build(io, SimClock::new(0, 1))
}
