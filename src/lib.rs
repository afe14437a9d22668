//! Firmware core for a six-joint stepper arm driven over a line-based serial
//! protocol.
//!
//! The host sends `<CODE>><ARGS>` lines such as `MOVE>J1_200;J2_-100;`. Each
//! line runs to completion inside [`robot::Robot::handle_line`], which answers
//! with plain-text response lines. [`serial::SerialLink`] frames bytes from a
//! UART into lines and writes the responses back.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

// must go first, so the log macros are visible to every other module
mod fmt;

pub mod actuators;
pub mod command;
pub mod config;
pub mod error;
pub mod machine;
pub mod query;
pub mod registry;
pub mod robot;
pub mod runner;
pub mod sensors;
pub mod serial;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod timer;
pub mod util;

pub use error::ErrorCode;
pub use robot::{Robot, RobotBuilder};
pub use serial::SerialLink;
