use core::fmt::{Display, Formatter, Result as FmtResult};

use crate::config::{MotionParams, JOINT_COUNT};
use crate::registry::{JointId, JointRegistry};
use crate::sensors::DigitalIo;

pub const STATE_PREFIX: &str = "[STATE];";
pub const STEPS_PREFIX: &str = "[STEPS];";
pub const PARAMS_PREFIX: &str = "[PARAMS];";
pub const CALIBRATION_PREFIX: &str = "[CALIBRATION];";
pub const CALIBRATION_STATE_PREFIX: &str = "[CALSTATE];";

/// `[STATE];J1_ENABLED;J2_DISABLED;...;`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateReport {
    enabled: [bool; JOINT_COUNT],
}

impl StateReport {
    /// Reads each joint's enable output back through its polarity. A line that
    /// cannot be read falls back to the last toggled state.
    pub fn read<Io: DigitalIo>(registry: &JointRegistry, io: &mut Io) -> Self {
        let mut enabled = [false; JOINT_COUNT];

        for (slot, joint) in registry.iter().enumerate() {
            enabled[slot] = match io.output_level(joint.enable_pin()) {
                Ok(level) => joint.enable_polarity().is_active(level),
                Err(_) => {
                    warn!("enable line of joint {} unreadable", joint.id().index());
                    joint.is_enabled()
                }
            };
        }

        Self { enabled }
    }
}

impl Display for StateReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(STATE_PREFIX)?;
        for (id, enabled) in JointId::all().zip(self.enabled.iter()) {
            let state = if *enabled { "ENABLED" } else { "DISABLED" };
            write!(f, "J{}_{};", id, state)?;
        }
        Ok(())
    }
}

/// `[STEPS];J1_UNKNOWN;J2_-40;...;`
pub struct StepsReport<'a>(pub &'a JointRegistry);

impl Display for StepsReport<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(STEPS_PREFIX)?;
        for joint in self.0.iter() {
            match joint.position() {
                Some(position) => write!(f, "J{}_{};", joint.id(), position)?,
                None => write!(f, "J{}_UNKNOWN;", joint.id())?,
            }
        }
        Ok(())
    }
}

/// `[PARAMS];VEL_2000;ACC_1000;`
pub struct ParamsReport(pub MotionParams);

impl Display for ParamsReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{}VEL_{};ACC_{};",
            PARAMS_PREFIX, self.0.max_velocity, self.0.acceleration
        )
    }
}

/// `[CALSTATE];J1_1;J2_0;...;`
pub struct CalibrationStateReport<'a>(pub &'a JointRegistry);

impl Display for CalibrationStateReport<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(CALIBRATION_STATE_PREFIX)?;
        for joint in self.0.iter() {
            write!(f, "J{}_{};", joint.id(), u8::from(joint.is_calibrated()))?;
        }
        Ok(())
    }
}

/// Result of a `CALIBRATE` command: `[CALIBRATION];OK` or the failed joints,
/// `[CALIBRATION];J2;J5;`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CalibrationReport {
    failed: [bool; JOINT_COUNT],
}

impl CalibrationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, joint: JointId) {
        self.failed[joint.slot()] = true;
    }

    pub fn is_ok(&self) -> bool {
        !self.failed.iter().any(|failed| *failed)
    }
}

impl Display for CalibrationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(CALIBRATION_PREFIX)?;
        if self.is_ok() {
            return f.write_str("OK");
        }
        for (id, failed) in JointId::all().zip(self.failed.iter()) {
            if *failed {
                write!(f, "J{};", id)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_JOINTS;
    use crate::sensors::{Level, PinId, Polarity};
    use crate::sim::SimPinBank;
    use alloc::string::ToString;

    fn joint(index: i32) -> JointId {
        JointId::new(index).unwrap()
    }

    #[test]
    fn steps_unknown_until_calibrated() {
        let mut registry = JointRegistry::new(&DEFAULT_JOINTS).unwrap();
        assert_eq!(
            StepsReport(&registry).to_string(),
            "[STEPS];J1_UNKNOWN;J2_UNKNOWN;J3_UNKNOWN;J4_UNKNOWN;J5_UNKNOWN;J6_UNKNOWN;"
        );

        registry.get_mut(joint(2)).mark_home();
        registry.get_mut(joint(2)).set_position(-40);
        registry.get_mut(joint(4)).set_position(99);
        assert_eq!(
            StepsReport(&registry).to_string(),
            "[STEPS];J1_UNKNOWN;J2_-40;J3_UNKNOWN;J4_UNKNOWN;J5_UNKNOWN;J6_UNKNOWN;"
        );
    }

    #[test]
    fn state_follows_output_level_and_polarity() {
        let mut configs = DEFAULT_JOINTS;
        configs[1].enable_polarity = Polarity::ActiveHigh;
        let registry = JointRegistry::new(&configs).unwrap();
        let mut io = SimPinBank::new();

        for config in configs.iter() {
            io.set_output_level(config.enable_pin, Level::Low).unwrap();
        }
        io.set_output_level(PinId(38), Level::High).unwrap();

        assert_eq!(
            StateReport::read(&registry, &mut io).to_string(),
            "[STATE];J1_ENABLED;J2_DISABLED;J3_DISABLED;J4_ENABLED;J5_ENABLED;J6_ENABLED;"
        );
    }

    #[test]
    fn params() {
        let report = ParamsReport(MotionParams {
            max_velocity: 500,
            acceleration: -3,
        });
        assert_eq!(report.to_string(), "[PARAMS];VEL_500;ACC_-3;");
    }

    #[test]
    fn calibration_state() {
        let mut registry = JointRegistry::new(&DEFAULT_JOINTS).unwrap();
        registry.get_mut(joint(3)).mark_home();

        assert_eq!(
            CalibrationStateReport(&registry).to_string(),
            "[CALSTATE];J1_0;J2_0;J3_1;J4_0;J5_0;J6_0;"
        );
    }

    #[test]
    fn calibration_aggregate() {
        let mut report = CalibrationReport::new();
        assert_eq!(report.to_string(), "[CALIBRATION];OK");

        report.fail(joint(5));
        report.fail(joint(2));
        report.fail(joint(5));
        assert!(!report.is_ok());
        assert_eq!(report.to_string(), "[CALIBRATION];J2;J5;");
    }
}
