use core::fmt::{Display, Formatter, Result as FmtResult};

use crate::config::{JointConfig, MotionParams, JOINT_COUNT};
use crate::error::ErrorCode;
use crate::sensors::switch::LimitSwitch;
use crate::sensors::{PinId, Polarity};

/// Which sign of step delta drives a joint toward its limit switch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingDirection {
    TowardLimitOnPositiveSteps,
    TowardLimitOnNegativeSteps,
    Undefined,
}

impl HomingDirection {
    pub fn is_toward_limit(self, delta: i32) -> bool {
        match self {
            HomingDirection::TowardLimitOnPositiveSteps => delta > 0,
            HomingDirection::TowardLimitOnNegativeSteps => delta < 0,
            HomingDirection::Undefined => false,
        }
    }

    /// Signed delta that travels `distance` steps toward the limit switch.
    pub fn toward_limit(self, distance: i32) -> Option<i32> {
        match self {
            HomingDirection::TowardLimitOnPositiveSteps => Some(distance),
            HomingDirection::TowardLimitOnNegativeSteps => Some(-distance),
            HomingDirection::Undefined => None,
        }
    }
}

/// Joint number in `1..=JOINT_COUNT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JointId(u8);

impl JointId {
    pub fn new(index: i32) -> Result<Self, ErrorCode> {
        if (1..=JOINT_COUNT as i32).contains(&index) {
            Ok(JointId(index as u8))
        } else {
            Err(ErrorCode::InvalidStepper)
        }
    }

    pub fn all() -> impl Iterator<Item = JointId> {
        (1..=JOINT_COUNT as u8).map(JointId)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    /// Zero-based position in per-joint arrays.
    pub fn slot(self) -> usize {
        usize::from(self.0) - 1
    }
}

impl Display for JointId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Joint {
    id: JointId,
    enable_pin: PinId,
    enable_polarity: Polarity,
    limit: LimitSwitch,
    homing_direction: HomingDirection,
    enabled: bool,
    calibrated: bool,
    current_position: i32,
}

impl Joint {
    fn new(id: JointId, config: &JointConfig) -> Self {
        Self {
            id,
            enable_pin: config.enable_pin,
            enable_polarity: config.enable_polarity,
            limit: LimitSwitch::new(config.limit_pin, config.limit_polarity),
            homing_direction: config.homing_direction,
            enabled: true,
            calibrated: false,
            current_position: 0,
        }
    }

    pub fn id(&self) -> JointId {
        self.id
    }

    pub fn enable_pin(&self) -> PinId {
        self.enable_pin
    }

    pub fn enable_polarity(&self) -> Polarity {
        self.enable_polarity
    }

    pub fn limit(&self) -> &LimitSwitch {
        &self.limit
    }

    pub fn homing_direction(&self) -> HomingDirection {
        self.homing_direction
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    /// Step position, known only once the joint has found its limit switch.
    pub fn position(&self) -> Option<i32> {
        if self.calibrated {
            Some(self.current_position)
        } else {
            None
        }
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn set_position(&mut self, position: i32) {
        self.current_position = position;
    }

    pub(crate) fn mark_home(&mut self) {
        self.current_position = 0;
        self.calibrated = true;
    }
}

#[derive(Clone, Copy, Debug)]
pub enum RegistryError {
    IndexOutOfRange(u8),
    DuplicateIndex(u8),
}

/// The six joints and the shared motion limits, owned by the control loop.
#[derive(Clone, Debug)]
pub struct JointRegistry {
    joints: [Joint; JOINT_COUNT],
    params: MotionParams,
}

impl JointRegistry {
    pub fn new(configs: &[JointConfig; JOINT_COUNT]) -> Result<Self, RegistryError> {
        let mut seen = [false; JOINT_COUNT];
        for config in configs.iter() {
            let id = JointId::new(i32::from(config.index))
                .map_err(|_| RegistryError::IndexOutOfRange(config.index))?;
            if seen[id.slot()] {
                return Err(RegistryError::DuplicateIndex(config.index));
            }
            seen[id.slot()] = true;
        }

        let mut ordered = *configs;
        ordered.sort_unstable_by_key(|config| config.index);

        let joints = ordered.map(|config| Joint::new(JointId(config.index), &config));

        Ok(Self {
            joints,
            params: MotionParams::default(),
        })
    }

    pub fn get(&self, id: JointId) -> &Joint {
        &self.joints[id.slot()]
    }

    pub(crate) fn get_mut(&mut self, id: JointId) -> &mut Joint {
        &mut self.joints[id.slot()]
    }

    /// Bounds-checked lookup by wire index.
    pub fn lookup(&self, index: i32) -> Result<&Joint, ErrorCode> {
        JointId::new(index).map(|id| self.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Joint> {
        self.joints.iter()
    }

    pub fn params(&self) -> MotionParams {
        self.params
    }

    pub(crate) fn set_max_velocity(&mut self, max_velocity: i32) {
        self.params.max_velocity = max_velocity;
    }

    pub(crate) fn set_acceleration(&mut self, acceleration: i32) {
        self.params.acceleration = acceleration;
    }
}
