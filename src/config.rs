use crate::registry::HomingDirection;
use crate::sensors::{PinId, Polarity};

pub const JOINT_COUNT: usize = 6;

/// Steps per second.
pub const DEFAULT_MAX_VELOCITY: i32 = 2000;
/// Steps per second squared.
pub const DEFAULT_ACCELERATION: i32 = 1000;

pub const HOMING_MAX_VELOCITY: i32 = 200;
pub const HOMING_ACCELERATION: i32 = 100;
/// Longer than the travel of any joint, so homing runs out of time before distance.
pub const HOMING_SEARCH_STEPS: i32 = 100_000;
pub const HOMING_TIMEOUT_MS: u32 = 10_000;

pub const LINE_CAPACITY: usize = 128;

/// Velocity and acceleration limits shared by every joint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotionParams {
    pub max_velocity: i32,
    pub acceleration: i32,
}

impl MotionParams {
    pub const HOMING: MotionParams = MotionParams {
        max_velocity: HOMING_MAX_VELOCITY,
        acceleration: HOMING_ACCELERATION,
    };
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            max_velocity: DEFAULT_MAX_VELOCITY,
            acceleration: DEFAULT_ACCELERATION,
        }
    }
}

/// Static wiring of one joint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JointConfig {
    /// 1-based joint number as used on the wire (`J1`..`J6`).
    pub index: u8,
    pub enable_pin: PinId,
    pub limit_pin: PinId,
    pub enable_polarity: Polarity,
    pub limit_polarity: Polarity,
    pub homing_direction: HomingDirection,
}

impl JointConfig {
    pub const fn new(
        index: u8,
        enable_pin: u8,
        limit_pin: u8,
        homing_direction: HomingDirection,
    ) -> Self {
        Self {
            index,
            enable_pin: PinId(enable_pin),
            limit_pin: PinId(limit_pin),
            enable_polarity: Polarity::ActiveLow,
            limit_polarity: Polarity::ActiveLow,
            homing_direction,
        }
    }

    pub const fn with_enable_polarity(mut self, polarity: Polarity) -> Self {
        self.enable_polarity = polarity;
        self
    }

    pub const fn with_limit_polarity(mut self, polarity: Polarity) -> Self {
        self.limit_polarity = polarity;
        self
    }
}

/// RAMPS 1.4 wiring: J5 and J6 share the E0 enable line with J1 and have no
/// homing direction until their switches are mounted.
pub const DEFAULT_JOINTS: [JointConfig; JOINT_COUNT] = [
    JointConfig::new(1, 24, 3, HomingDirection::TowardLimitOnNegativeSteps),
    JointConfig::new(2, 30, 14, HomingDirection::TowardLimitOnNegativeSteps),
    JointConfig::new(3, 38, 18, HomingDirection::TowardLimitOnPositiveSteps),
    JointConfig::new(4, 56, 2, HomingDirection::TowardLimitOnPositiveSteps),
    JointConfig::new(5, 24, 15, HomingDirection::Undefined),
    JointConfig::new(6, 24, 19, HomingDirection::Undefined),
];
