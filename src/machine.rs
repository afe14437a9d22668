use core::task::Poll;
use fugit::{TimerDurationU32 as TimerDuration, TimerInstantU32 as TimerInstant};

use crate::actuators::MotionAxis;
use crate::config::{MotionParams, HOMING_SEARCH_STEPS, HOMING_TIMEOUT_MS};
use crate::error::ErrorCode;
use crate::registry::{JointId, JointRegistry};
use crate::sensors::{switch::SwitchStatus, DigitalIo};
use crate::timer::Monotonic;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingStatus<const TIMER_HZ: u32> {
    Idle,
    Seeking { started: TimerInstant<TIMER_HZ> },
    Calibrated,
    TimedOut,
    Faulted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingOutcome {
    Calibrated,
    TimedOut,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingError {
    UndefinedDirection,
    Fault,
}

impl HomingError {
    /// Wire code, if this failure has one.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            HomingError::UndefinedDirection => Some(ErrorCode::InvalidLimitSwitchConversion),
            HomingError::Fault => None,
        }
    }
}

/// Homing sequence for one joint.
///
/// The joint runs at [`MotionParams::HOMING`] toward its limit switch for up to
/// [`HOMING_SEARCH_STEPS`]. Reaching the switch zeroes and calibrates the joint;
/// running out of time leaves its calibration untouched. Either way the shared
/// motion params are restored on the axis.
pub struct Homing<const TIMER_HZ: u32> {
    joint: JointId,
    status: HomingStatus<TIMER_HZ>,
}

impl<const TIMER_HZ: u32> Homing<TIMER_HZ> {
    pub fn new(joint: JointId) -> Self {
        Self {
            joint,
            status: HomingStatus::Idle,
        }
    }

    pub fn joint(&self) -> JointId {
        self.joint
    }

    pub fn status(&self) -> HomingStatus<TIMER_HZ> {
        self.status
    }

    pub fn poll<A, Io, Clock>(
        &mut self,
        registry: &mut JointRegistry,
        axis: &mut A,
        io: &mut Io,
        clock: &mut Clock,
    ) -> Poll<Result<HomingOutcome, HomingError>>
    where
        A: MotionAxis,
        Io: DigitalIo,
        Clock: Monotonic<TIMER_HZ>,
    {
        let joint = self.joint;

        match self.status {
            HomingStatus::Idle => {
                let direction = registry.get(joint).homing_direction();
                let delta = match direction.toward_limit(HOMING_SEARCH_STEPS) {
                    Some(delta) => delta,
                    None => {
                        warn!("joint {} has no homing direction", joint.index());
                        return Poll::Ready(Err(HomingError::UndefinedDirection));
                    }
                };

                axis.apply_params(MotionParams::HOMING);
                axis.move_by(delta);
                self.status = HomingStatus::Seeking {
                    started: clock.now(),
                };

                info!("homing joint {}", joint.index());
                Poll::Pending
            }
            HomingStatus::Seeking { started } => {
                let status = registry.get(joint).limit().sense(io);
                match status {
                    Ok(SwitchStatus::On) => {
                        axis.stop();
                        axis.reset_position_to_zero();
                        registry.get_mut(joint).mark_home();
                        self.finish(registry, axis, HomingStatus::Calibrated);

                        info!("joint {} homed", joint.index());
                        return Poll::Ready(Ok(HomingOutcome::Calibrated));
                    }
                    Ok(SwitchStatus::Off) => {}
                    Err(_) => {
                        error!("joint {} limit switch read failed", joint.index());
                        self.finish(registry, axis, HomingStatus::Faulted);
                        return Poll::Ready(Err(HomingError::Fault));
                    }
                }

                if let Poll::Ready(Err(_)) = axis.tick() {
                    error!("joint {} axis fault while homing", joint.index());
                    self.finish(registry, axis, HomingStatus::Faulted);
                    return Poll::Ready(Err(HomingError::Fault));
                }

                let timeout = TimerDuration::<TIMER_HZ>::millis(HOMING_TIMEOUT_MS);
                if clock.elapsed_since(started) > timeout {
                    warn!(
                        "joint {} homing timed out after {} ms",
                        joint.index(),
                        HOMING_TIMEOUT_MS
                    );
                    self.finish(registry, axis, HomingStatus::TimedOut);
                    return Poll::Ready(Ok(HomingOutcome::TimedOut));
                }

                Poll::Pending
            }
            HomingStatus::Calibrated => Poll::Ready(Ok(HomingOutcome::Calibrated)),
            HomingStatus::TimedOut => Poll::Ready(Ok(HomingOutcome::TimedOut)),
            HomingStatus::Faulted => Poll::Ready(Err(HomingError::Fault)),
        }
    }

    fn finish<A: MotionAxis>(
        &mut self,
        registry: &mut JointRegistry,
        axis: &mut A,
        status: HomingStatus<TIMER_HZ>,
    ) {
        axis.stop();
        axis.apply_params(registry.params());
        registry
            .get_mut(self.joint)
            .set_position(axis.current_position());
        self.status = status;
    }
}
