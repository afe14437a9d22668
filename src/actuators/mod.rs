pub mod axis;

use alloc::boxed::Box;
use core::task::Poll;

use crate::config::MotionParams;
use crate::error::{BoxError, Error};

// poll inspired by https://docs.rs/stepper
// ramp inspired by https://www.airspayce.com/mikem/arduino/AccelStepper/
/// One stepper-driven joint axis, positioned in whole steps.
///
/// Motion is requested with [`MotionAxis::move_by`] and then advanced by
/// calling [`MotionAxis::tick`] from the control loop until it returns
/// `Poll::Ready`. `tick` never blocks.
pub trait MotionAxis {
    type Error: Error;

    fn set_velocity_limit(&mut self, steps_per_sec: f32);
    fn set_acceleration_limit(&mut self, steps_per_sec_per_sec: f32);
    /// Retargets relative to the current position.
    fn move_by(&mut self, delta: i32);
    fn tick(&mut self) -> Poll<Result<(), Self::Error>>;
    fn distance_remaining(&self) -> i32;
    fn current_position(&self) -> i32;
    /// Halts at the current step, discarding any remaining distance.
    fn stop(&mut self);
    fn reset_position_to_zero(&mut self);

    fn apply_params(&mut self, params: MotionParams) {
        self.set_velocity_limit(params.max_velocity as f32);
        self.set_acceleration_limit(params.acceleration as f32);
    }
}

impl<A: MotionAxis + ?Sized> MotionAxis for Box<A> {
    type Error = A::Error;

    fn set_velocity_limit(&mut self, steps_per_sec: f32) {
        (**self).set_velocity_limit(steps_per_sec)
    }
    fn set_acceleration_limit(&mut self, steps_per_sec_per_sec: f32) {
        (**self).set_acceleration_limit(steps_per_sec_per_sec)
    }
    fn move_by(&mut self, delta: i32) {
        (**self).move_by(delta)
    }
    fn tick(&mut self) -> Poll<Result<(), Self::Error>> {
        (**self).tick()
    }
    fn distance_remaining(&self) -> i32 {
        (**self).distance_remaining()
    }
    fn current_position(&self) -> i32 {
        (**self).current_position()
    }
    fn stop(&mut self) {
        (**self).stop()
    }
    fn reset_position_to_zero(&mut self) {
        (**self).reset_position_to_zero()
    }
}

pub type BoxAxis = Box<dyn MotionAxis<Error = BoxError>>;

pub struct BoxifyAxis<A: MotionAxis>(A);

impl<A: MotionAxis> BoxifyAxis<A> {
    pub fn new(axis: A) -> Self {
        Self(axis)
    }
}

impl<A: MotionAxis> MotionAxis for BoxifyAxis<A>
where
    A::Error: 'static,
{
    type Error = BoxError;

    fn set_velocity_limit(&mut self, steps_per_sec: f32) {
        self.0.set_velocity_limit(steps_per_sec)
    }
    fn set_acceleration_limit(&mut self, steps_per_sec_per_sec: f32) {
        self.0.set_acceleration_limit(steps_per_sec_per_sec)
    }
    fn move_by(&mut self, delta: i32) {
        self.0.move_by(delta)
    }
    fn tick(&mut self) -> Poll<Result<(), Self::Error>> {
        self.0
            .tick()
            .map_err(|error| (Box::new(error) as Box<dyn Error>).into())
    }
    fn distance_remaining(&self) -> i32 {
        self.0.distance_remaining()
    }
    fn current_position(&self) -> i32 {
        self.0.current_position()
    }
    fn stop(&mut self) {
        self.0.stop()
    }
    fn reset_position_to_zero(&mut self) {
        self.0.reset_position_to_zero()
    }
}
