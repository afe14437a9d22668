use core::fmt::{Display, Formatter, Result as FmtResult};
use core::mem;
use core::task::Poll;
use heapless::{Deque, Vec};

use crate::actuators::MotionAxis;
use crate::config::JOINT_COUNT;
use crate::registry::{JointId, JointRegistry};
use crate::sensors::{switch::SwitchStatus, DigitalIo};

/// Relative step deltas for one synchronized move, in request order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveRequest {
    deltas: Vec<(JointId, i32), JOINT_COUNT>,
}

impl MoveRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deltas for a joint named more than once are summed.
    pub fn add(&mut self, joint: JointId, delta: i32) {
        match self.deltas.iter_mut().find(|(id, _)| *id == joint) {
            Some((_, existing)) => *existing = existing.saturating_add(delta),
            // one entry per joint, so this never overflows
            None => {
                let _ = self.deltas.push((joint, delta));
            }
        }
    }

    pub fn delta(&self, joint: JointId) -> Option<i32> {
        self.deltas
            .iter()
            .find(|(id, _)| *id == joint)
            .map(|(_, delta)| *delta)
    }

    pub fn iter(&self) -> impl Iterator<Item = (JointId, i32)> + '_ {
        self.deltas.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}

/// Renders as `{1:200,2:-100}`.
impl Display for MoveRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("{")?;
        for (position, (joint, delta)) in self.deltas.iter().enumerate() {
            if position > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", joint, delta)?;
        }
        f.write_str("}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MoveOutcome {
    Completed,
    /// Stopped on the limit switch with `remaining` steps still to go; the
    /// joint is now homed at zero.
    LimitReached {
        remaining: i32,
    },
    /// The axis or its limit switch reported a fault; the axis was stopped.
    Faulted,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveReport {
    outcomes: Vec<(JointId, MoveOutcome), JOINT_COUNT>,
}

impl MoveReport {
    pub fn outcome(&self, joint: JointId) -> Option<MoveOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| *id == joint)
            .map(|(_, outcome)| *outcome)
    }

    /// Outcomes in the order joints finished.
    pub fn iter(&self) -> impl Iterator<Item = (JointId, MoveOutcome)> + '_ {
        self.outcomes.iter().copied()
    }

    fn record(&mut self, joint: JointId, outcome: MoveOutcome) {
        let _ = self.outcomes.push((joint, outcome));
    }
}

/// A move in flight. Each [`SyncMove::poll`] gives every joint still moving
/// one limit check and one axis tick, round-robin.
pub struct SyncMove {
    active: Deque<(JointId, i32), JOINT_COUNT>,
    report: MoveReport,
}

impl SyncMove {
    /// Retargets the axes of every non-zero delta in `request`.
    ///
    /// `axes` is indexed by [`JointId::slot`].
    pub fn start<A: MotionAxis>(request: &MoveRequest, axes: &mut [A]) -> Self {
        let mut active = Deque::new();

        for (joint, delta) in request.iter() {
            if delta == 0 {
                continue;
            }
            axes[joint.slot()].move_by(delta);
            let _ = active.push_back((joint, delta));
        }

        debug!("move started on {} joints", active.len());

        Self {
            active,
            report: MoveReport::default(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.active.is_empty()
    }

    pub fn poll<A, Io>(
        &mut self,
        registry: &mut JointRegistry,
        axes: &mut [A],
        io: &mut Io,
    ) -> Poll<MoveReport>
    where
        A: MotionAxis,
        Io: DigitalIo,
    {
        let num_active = self.active.len();
        for _ in 0..num_active {
            let (joint, delta) = match self.active.pop_front() {
                Some(entry) => entry,
                None => break,
            };
            let axis = &mut axes[joint.slot()];

            match advance(registry, axis, io, joint, delta) {
                Poll::Pending => {
                    let _ = self.active.push_back((joint, delta));
                }
                Poll::Ready(outcome) => {
                    registry.get_mut(joint).set_position(axis.current_position());
                    self.report.record(joint, outcome);
                }
            }
        }

        if self.active.is_empty() {
            Poll::Ready(mem::take(&mut self.report))
        } else {
            Poll::Pending
        }
    }
}

fn advance<A, Io>(
    registry: &mut JointRegistry,
    axis: &mut A,
    io: &mut Io,
    joint: JointId,
    delta: i32,
) -> Poll<MoveOutcome>
where
    A: MotionAxis,
    Io: DigitalIo,
{
    let entry = registry.get(joint);

    if entry.homing_direction().is_toward_limit(delta) {
        let status = entry.limit().sense(io);
        match status {
            Ok(SwitchStatus::Off) => {}
            Ok(SwitchStatus::On) => {
                let remaining = axis.distance_remaining();
                axis.stop();
                axis.reset_position_to_zero();
                registry.get_mut(joint).mark_home();

                info!(
                    "joint {} hit its limit switch, {} steps short",
                    joint.index(),
                    remaining
                );
                return Poll::Ready(MoveOutcome::LimitReached { remaining });
            }
            Err(_) => {
                axis.stop();
                error!("joint {} limit switch read failed", joint.index());
                return Poll::Ready(MoveOutcome::Faulted);
            }
        }
    }

    match axis.tick() {
        Poll::Pending => Poll::Pending,
        Poll::Ready(Ok(())) => Poll::Ready(MoveOutcome::Completed),
        Poll::Ready(Err(_)) => {
            axis.stop();
            error!("joint {} axis fault", joint.index());
            Poll::Ready(MoveOutcome::Faulted)
        }
    }
}
