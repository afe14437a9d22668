use alloc::boxed::Box;
use core::convert::Infallible;
use core::fmt::{Debug, Display, Formatter, Result as FmtResult};

pub trait Error: Debug {}

impl Error for Infallible {}

impl<E: Error + 'static> From<E> for Box<dyn Error> {
    fn from(error: E) -> Box<dyn Error> {
        Box::new(error)
    }
}

pub struct BoxError(Box<dyn Error>);

impl Debug for BoxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        self.0.fmt(f)
    }
}
impl Error for BoxError {}

impl From<Box<dyn Error>> for BoxError {
    fn from(error: Box<dyn Error>) -> BoxError {
        BoxError(error)
    }
}

/// Protocol-level failures, each answered on the wire by a fixed code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorCode {
    /// `C001`: no `>` separator, or a list argument without any `;`.
    CommandFormat,
    /// `C002`: command code not in the protocol.
    CommandNotDefined,
    /// `I001`: joint index outside 1..=6.
    InvalidStepper,
    /// `I002`: toggle value other than `ENABLED`/`DISABLED`.
    InvalidState,
    /// `I003`: joint has no homing direction configured.
    InvalidLimitSwitchConversion,
}

impl ErrorCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::CommandFormat => "C001",
            ErrorCode::CommandNotDefined => "C002",
            ErrorCode::InvalidStepper => "I001",
            ErrorCode::InvalidState => "I002",
            ErrorCode::InvalidLimitSwitchConversion => "I003",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl Error for ErrorCode {}
