//! Port 1 handling for the two USI bus lines.
//!
//! Only the pins the USI uses in I2C mode are modelled: SCL on P1.6 and SDA on P1.7. Once the USI
//! port function is enabled the peripheral owns the pin drivers, so the only thing software sets
//! up here is the pin direction and the internal pull-ups.

use crate::hw_traits::gpio::GpioPeriph;

/// One of the two I2C lines of the USI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusLine {
    /// Clock line, P1.6
    Scl,
    /// Data line, P1.7
    Sda,
}

impl BusLine {
    #[inline(always)]
    fn num(self) -> u8 {
        match self {
            BusLine::Scl => 6,
            BusLine::Sda => 7,
        }
    }

    #[inline(always)]
    fn mask(self) -> u8 {
        1 << self.num()
    }
}

/// Pin direction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinDirection {
    /// Input, line is released
    Input,
    /// Output
    Output,
}

/// Set the direction of one bus line.
#[inline]
pub fn set_direction<P: GpioPeriph>(port: &P, line: BusLine, dir: PinDirection) {
    match dir {
        PinDirection::Input => port.pxdir_clear(line.mask()),
        PinDirection::Output => port.pxdir_set(line.mask()),
    }
}

/// Make a bus line an input with the internal pull-up enabled.
#[inline]
pub fn pull_up<P: GpioPeriph>(port: &P, line: BusLine) {
    set_direction(port, line, PinDirection::Input);
    port.pxout_set(line.mask());
    port.pxren_set(line.mask());
}

/// Turn off the internal pull-up of a bus line, leaving it floating.
#[inline]
pub fn float<P: GpioPeriph>(port: &P, line: BusLine) {
    set_direction(port, line, PinDirection::Input);
    port.pxren_clear(line.mask());
    port.pxout_clear(line.mask());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePort;

    #[test]
    fn pull_up_sets_out_and_ren() {
        let port = FakePort::default();
        port.dir.set(0xFF);
        pull_up(&port, BusLine::Sda);
        pull_up(&port, BusLine::Scl);
        assert_eq!(port.dir.get(), 0x3F);
        assert_eq!(port.out.get(), 0xC0);
        assert_eq!(port.ren.get(), 0xC0);
    }

    #[test]
    fn float_only_touches_one_line() {
        let port = FakePort::default();
        pull_up(&port, BusLine::Sda);
        pull_up(&port, BusLine::Scl);
        float(&port, BusLine::Scl);
        assert_eq!(port.out.get(), 0x80);
        assert_eq!(port.ren.get(), 0x80);
    }

    #[test]
    fn direction() {
        let port = FakePort::default();
        set_direction(&port, BusLine::Scl, PinDirection::Output);
        assert_eq!(port.dir.get(), 0x40);
        set_direction(&port, BusLine::Scl, PinDirection::Input);
        assert_eq!(port.dir.get(), 0x00);
    }
}
