pub mod switch;

use core::fmt::Debug;
use embedded_hal::digital::v2::{InputPin, StatefulOutputPin};
use heapless::FnvIndexMap;

use crate::error::Error;

/// Logical handle for a digital line, numbered as on the controller board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinId(pub u8);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(is_high: bool) -> Self {
        if is_high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Which electrical level means "asserted" for a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    ActiveLow,
    ActiveHigh,
}

impl Polarity {
    pub fn level(self, active: bool) -> Level {
        match (self, active) {
            (Polarity::ActiveLow, true) | (Polarity::ActiveHigh, false) => Level::Low,
            (Polarity::ActiveLow, false) | (Polarity::ActiveHigh, true) => Level::High,
        }
    }

    pub fn is_active(self, level: Level) -> bool {
        self.level(true) == level
    }
}

pub trait DigitalIo {
    type Error: Error;

    fn set_output_level(&mut self, pin: PinId, level: Level) -> Result<(), Self::Error>;
    /// Level the output is currently driven to (not the electrical reading).
    fn output_level(&mut self, pin: PinId) -> Result<Level, Self::Error>;
    fn read_input_level(&mut self, pin: PinId) -> Result<Level, Self::Error>;
}

#[derive(Clone, Copy, Debug)]
pub enum PinBankError<OutputError: Debug, InputError: Debug> {
    UnknownPin(PinId),
    Output(OutputError),
    Input(InputError),
}

impl<OutputError: Debug, InputError: Debug> Error for PinBankError<OutputError, InputError> {}

#[derive(Clone, Copy, Debug)]
pub enum PinBankBuilderError {
    TooManyOutputs,
    TooManyInputs,
}

/// Board pins looked up by [`PinId`]. Pins shared between joints are registered once.
pub struct HalPinBank<Out, In, const OUTPUTS: usize, const INPUTS: usize>
where
    Out: StatefulOutputPin,
    In: InputPin,
{
    outputs: FnvIndexMap<u8, Out, OUTPUTS>,
    inputs: FnvIndexMap<u8, In, INPUTS>,
}

impl<Out, In, const OUTPUTS: usize, const INPUTS: usize> HalPinBank<Out, In, OUTPUTS, INPUTS>
where
    Out: StatefulOutputPin,
    In: InputPin,
{
    pub fn new() -> Self {
        Self {
            outputs: FnvIndexMap::new(),
            inputs: FnvIndexMap::new(),
        }
    }

    pub fn add_output(&mut self, id: PinId, pin: Out) -> Result<(), PinBankBuilderError> {
        self.outputs
            .insert(id.0, pin)
            .map_err(|_| PinBankBuilderError::TooManyOutputs)?;

        Ok(())
    }

    pub fn add_input(&mut self, id: PinId, pin: In) -> Result<(), PinBankBuilderError> {
        self.inputs
            .insert(id.0, pin)
            .map_err(|_| PinBankBuilderError::TooManyInputs)?;

        Ok(())
    }
}

impl<Out, In, const OUTPUTS: usize, const INPUTS: usize> Default
    for HalPinBank<Out, In, OUTPUTS, INPUTS>
where
    Out: StatefulOutputPin,
    In: InputPin,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Out, In, const OUTPUTS: usize, const INPUTS: usize> DigitalIo
    for HalPinBank<Out, In, OUTPUTS, INPUTS>
where
    Out: StatefulOutputPin,
    Out::Error: Debug,
    In: InputPin,
    In::Error: Debug,
{
    type Error = PinBankError<Out::Error, In::Error>;

    fn set_output_level(&mut self, pin: PinId, level: Level) -> Result<(), Self::Error> {
        let output = self
            .outputs
            .get_mut(&pin.0)
            .ok_or(PinBankError::UnknownPin(pin))?;

        let result = match level {
            Level::High => output.set_high(),
            Level::Low => output.set_low(),
        };

        result.map_err(PinBankError::Output)
    }

    fn output_level(&mut self, pin: PinId) -> Result<Level, Self::Error> {
        let output = self
            .outputs
            .get(&pin.0)
            .ok_or(PinBankError::UnknownPin(pin))?;

        output
            .is_set_high()
            .map(Level::from)
            .map_err(PinBankError::Output)
    }

    fn read_input_level(&mut self, pin: PinId) -> Result<Level, Self::Error> {
        let input = self
            .inputs
            .get(&pin.0)
            .ok_or(PinBankError::UnknownPin(pin))?;

        input.is_high().map(Level::from).map_err(PinBankError::Input)
    }
}
