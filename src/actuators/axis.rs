use core::fmt::Debug;
use core::task::Poll;
use embedded_hal::digital::v2::OutputPin;
use fugit::TimerInstantU32 as TimerInstant;

use super::MotionAxis;
use crate::config::{DEFAULT_ACCELERATION, DEFAULT_MAX_VELOCITY};
use crate::error::Error;
use crate::timer::Monotonic;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Clone, Copy, Debug)]
pub enum AxisError<StepError: Debug, DirError: Debug> {
    Step(StepError),
    Direction(DirError),
}

impl<StepError: Debug, DirError: Debug> Error for AxisError<StepError, DirError> {}

/// Step/direction driver (DQ542MA, A4988, TMC in step mode) with a
/// trapezoidal speed ramp.
///
/// Step intervals follow the recurrence from David Austin's "Generate stepper
/// motor speed profiles in real time": the first interval is
/// `0.676 * sqrt(2 / a)` seconds and each later one is
/// `c(n) = c(n-1) - 2 c(n-1) / (4n + 1)`, floored at `1 / max_velocity`.
/// A negative `n` decelerates.
pub struct AccelAxis<PinStep, PinDir, Clock, const TIMER_HZ: u32>
where
    PinStep: OutputPin,
    PinDir: OutputPin,
    Clock: Monotonic<TIMER_HZ>,
{
    step: PinStep,
    dir: PinDir,
    clock: Clock,
    invert_direction: bool,
    current_step: i32,
    target_step: i32,
    max_velocity: f32,
    acceleration: f32,
    // steps per second, negative when moving backward
    speed: f32,
    direction: Direction,
    driven_direction: Option<Direction>,
    // ticks between steps, 0 when idle
    step_interval: u32,
    last_step: Option<TimerInstant<TIMER_HZ>>,
    hold_from: Option<TimerInstant<TIMER_HZ>>,
    step_high: bool,
    ramp_step: i32,
    c0: f32,
    cn: f32,
    cmin: f32,
}

impl<PinStep, PinDir, Clock, const TIMER_HZ: u32> AccelAxis<PinStep, PinDir, Clock, TIMER_HZ>
where
    PinStep: OutputPin,
    PinStep::Error: Debug,
    PinDir: OutputPin,
    PinDir::Error: Debug,
    Clock: Monotonic<TIMER_HZ>,
{
    /// Step pulse width and direction setup time: 5 us, at least one tick.
    const HOLD_TICKS: u32 = if TIMER_HZ / 200_000 == 0 {
        1
    } else {
        TIMER_HZ / 200_000
    };

    pub fn new(step: PinStep, dir: PinDir, clock: Clock) -> Self {
        let mut axis = Self {
            step,
            dir,
            clock,
            invert_direction: false,
            current_step: 0,
            target_step: 0,
            max_velocity: 0.0,
            acceleration: 0.0,
            speed: 0.0,
            direction: Direction::Forward,
            driven_direction: None,
            step_interval: 0,
            last_step: None,
            hold_from: None,
            step_high: false,
            ramp_step: 0,
            c0: 0.0,
            cn: 0.0,
            cmin: 1.0,
        };

        axis.set_velocity_limit(DEFAULT_MAX_VELOCITY as f32);
        axis.set_acceleration_limit(DEFAULT_ACCELERATION as f32);
        axis
    }

    /// Drive the direction line low for forward motion.
    pub fn with_inverted_direction(mut self) -> Self {
        self.invert_direction = true;
        self
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn release(self) -> (PinStep, PinDir, Clock) {
        (self.step, self.dir, self.clock)
    }

    fn steps_to_stop(&self) -> i32 {
        ((self.speed * self.speed) / (2.0 * self.acceleration)) as i32
    }

    fn compute_new_speed(&mut self) {
        let distance = self.distance_remaining();
        let steps_to_stop = self.steps_to_stop();

        if distance == 0 && steps_to_stop <= 1 {
            self.step_interval = 0;
            self.speed = 0.0;
            self.ramp_step = 0;
            return;
        }

        if distance > 0 {
            if self.ramp_step > 0 {
                if steps_to_stop >= distance || self.direction == Direction::Backward {
                    self.ramp_step = -steps_to_stop;
                }
            } else if self.ramp_step < 0
                && steps_to_stop < distance
                && self.direction == Direction::Forward
            {
                self.ramp_step = -self.ramp_step;
            }
        } else if distance < 0 {
            if self.ramp_step > 0 {
                if steps_to_stop >= -distance || self.direction == Direction::Forward {
                    self.ramp_step = -steps_to_stop;
                }
            } else if self.ramp_step < 0
                && steps_to_stop < -distance
                && self.direction == Direction::Backward
            {
                self.ramp_step = -self.ramp_step;
            }
        }

        if self.ramp_step == 0 {
            self.cn = self.c0;
            self.direction = if distance > 0 {
                Direction::Forward
            } else {
                Direction::Backward
            };
        } else {
            self.cn -= (2.0 * self.cn) / ((4.0 * self.ramp_step as f32) + 1.0);
            self.cn = self.cn.max(self.cmin);
        }
        self.ramp_step += 1;

        self.step_interval = (self.cn as u32).max(1);
        self.speed = TIMER_HZ as f32 / self.cn;
        if self.direction == Direction::Backward {
            self.speed = -self.speed;
        }
    }

    fn is_step_due(&self, now: TimerInstant<TIMER_HZ>) -> bool {
        match self.last_step {
            None => true,
            // https://playground.arduino.cc/Code/TimingRollover/
            Some(last) => now.ticks().wrapping_sub(last.ticks()) >= self.step_interval,
        }
    }

    fn drive_direction(&mut self) -> Result<(), AxisError<PinStep::Error, PinDir::Error>> {
        let high = (self.direction == Direction::Forward) != self.invert_direction;
        let result = if high {
            self.dir.set_high()
        } else {
            self.dir.set_low()
        };
        result.map_err(AxisError::Direction)?;

        self.driven_direction = Some(self.direction);
        Ok(())
    }
}

impl<PinStep, PinDir, Clock, const TIMER_HZ: u32> MotionAxis
    for AccelAxis<PinStep, PinDir, Clock, TIMER_HZ>
where
    PinStep: OutputPin,
    PinStep::Error: Debug,
    PinDir: OutputPin,
    PinDir::Error: Debug,
    Clock: Monotonic<TIMER_HZ>,
{
    type Error = AxisError<PinStep::Error, PinDir::Error>;

    fn set_velocity_limit(&mut self, steps_per_sec: f32) {
        let max_velocity = libm::fabsf(steps_per_sec);
        if max_velocity == 0.0 || max_velocity == self.max_velocity {
            return;
        }

        self.max_velocity = max_velocity;
        self.cmin = TIMER_HZ as f32 / max_velocity;

        // recompute the ramp position if we are accelerating
        if self.ramp_step > 0 {
            self.ramp_step = self.steps_to_stop();
            self.compute_new_speed();
        }
    }

    fn set_acceleration_limit(&mut self, steps_per_sec_per_sec: f32) {
        let acceleration = libm::fabsf(steps_per_sec_per_sec);
        if acceleration == 0.0 || acceleration == self.acceleration {
            return;
        }

        if self.acceleration > 0.0 {
            self.ramp_step = (self.ramp_step as f32 * (self.acceleration / acceleration)) as i32;
        }
        self.c0 = 0.676 * libm::sqrtf(2.0 / acceleration) * TIMER_HZ as f32;
        self.acceleration = acceleration;
        self.compute_new_speed();
    }

    fn move_by(&mut self, delta: i32) {
        let target_step = self.current_step.saturating_add(delta);
        if target_step != self.target_step {
            self.target_step = target_step;
            self.compute_new_speed();
        }
    }

    fn tick(&mut self) -> Poll<Result<(), Self::Error>> {
        let now = self.clock.now();

        if let Some(since) = self.hold_from {
            if now.ticks().wrapping_sub(since.ticks()) < Self::HOLD_TICKS {
                return Poll::Pending;
            }
            self.hold_from = None;

            if self.step_high {
                self.step.set_low().map_err(AxisError::Step)?;
                self.step_high = false;
            }
        }

        if self.step_interval == 0 && self.distance_remaining() != 0 {
            self.compute_new_speed();
        }

        if self.step_interval == 0 {
            return Poll::Ready(Ok(()));
        }

        if self.is_step_due(now) {
            if self.driven_direction != Some(self.direction) {
                self.drive_direction()?;
                self.hold_from = Some(now);
                return Poll::Pending;
            }

            self.current_step += match self.direction {
                Direction::Forward => 1,
                Direction::Backward => -1,
            };
            self.step.set_high().map_err(AxisError::Step)?;
            self.step_high = true;
            self.hold_from = Some(now);
            self.last_step = Some(now);

            self.compute_new_speed();
        }

        Poll::Pending
    }

    fn distance_remaining(&self) -> i32 {
        self.target_step - self.current_step
    }

    fn current_position(&self) -> i32 {
        self.current_step
    }

    fn stop(&mut self) {
        self.target_step = self.current_step;
        self.speed = 0.0;
        self.ramp_step = 0;
        self.step_interval = 0;
    }

    fn reset_position_to_zero(&mut self) {
        self.current_step = 0;
        self.stop();
    }
}
