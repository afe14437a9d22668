use super::{DigitalIo, PinId, Polarity};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SwitchStatus {
    On,
    Off,
}

/// Limit switch wired to one input line of a [`DigitalIo`] bank.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LimitSwitch {
    pin: PinId,
    polarity: Polarity,
}

impl LimitSwitch {
    pub const fn new(pin: PinId, polarity: Polarity) -> Self {
        Self { pin, polarity }
    }

    pub fn pin(&self) -> PinId {
        self.pin
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn sense<Io: DigitalIo>(&self, io: &mut Io) -> Result<SwitchStatus, Io::Error> {
        let level = io.read_input_level(self.pin)?;

        let status = if self.polarity.is_active(level) {
            SwitchStatus::On
        } else {
            SwitchStatus::Off
        };

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::Level;
    use crate::sim::SimPinBank;

    #[test]
    fn active_low_switch_with_pull_up() {
        let mut io = SimPinBank::new();
        let switch = LimitSwitch::new(PinId(3), Polarity::ActiveLow);

        io.set_input(PinId(3), Level::High);
        assert_eq!(switch.sense(&mut io).unwrap(), SwitchStatus::Off);

        io.set_input(PinId(3), Level::Low);
        assert_eq!(switch.sense(&mut io).unwrap(), SwitchStatus::On);
    }

    #[test]
    fn active_high_switch() {
        let mut io = SimPinBank::new();
        let switch = LimitSwitch::new(PinId(18), Polarity::ActiveHigh);
        assert_eq!(switch.pin(), PinId(18));
        assert_eq!(switch.polarity(), Polarity::ActiveHigh);

        io.set_input(PinId(18), Level::High);
        assert_eq!(switch.sense(&mut io).unwrap(), SwitchStatus::On);
    }
}
