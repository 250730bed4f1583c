//! DCO calibration
//!
//! G2xx devices carry factory calibration constants for the DCO in information memory segment A.
//! If that segment has been erased the constants read back as 0xFF and the clock would run at an
//! unknown rate, which on an I2C master means garbage timing on the bus. The only supported
//! reaction is to stop: [`calibrate_or_halt`] never returns with an uncalibrated clock.

#[cfg(feature = "g2xx2")]
use crate::hw_traits::Reg8;

const ERASED: u8 = 0xFF;

/// Calibrated DCO frequencies
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DcoFreq {
    /// 1 MHz
    _1MHz,
    /// 8 MHz
    _8MHz,
    /// 12 MHz
    _12MHz,
    /// 16 MHz
    _16MHz,
}

impl DcoFreq {
    /// Frequency in Hz
    pub const fn hz(self) -> u32 {
        match self {
            DcoFreq::_1MHz => 1_000_000,
            DcoFreq::_8MHz => 8_000_000,
            DcoFreq::_12MHz => 12_000_000,
            DcoFreq::_16MHz => 16_000_000,
        }
    }

    // (CALBC1_xMHZ, CALDCO_xMHZ)
    #[cfg(any(test, feature = "g2xx2"))]
    const fn constant_addrs(self) -> (usize, usize) {
        match self {
            DcoFreq::_1MHz => (0x10FF, 0x10FE),
            DcoFreq::_8MHz => (0x10FD, 0x10FC),
            DcoFreq::_12MHz => (0x10FB, 0x10FA),
            DcoFreq::_16MHz => (0x10F9, 0x10F8),
        }
    }
}

/// The calibration constants for the requested frequency have been erased
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationMissing;

/// Validated pair of DCO calibration values
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Calibration {
    bcsctl1: u8,
    dcoctl: u8,
}

impl Calibration {
    /// Validate raw calibration values. An erased `bcsctl1` constant means the whole set is gone.
    pub fn from_raw(bcsctl1: u8, dcoctl: u8) -> Result<Self, CalibrationMissing> {
        if bcsctl1 == ERASED {
            Err(CalibrationMissing)
        } else {
            Ok(Calibration { bcsctl1, dcoctl })
        }
    }

    /// Value for BCSCTL1
    #[inline]
    pub fn bcsctl1(&self) -> u8 {
        self.bcsctl1
    }

    /// Value for DCOCTL
    #[inline]
    pub fn dcoctl(&self) -> u8 {
        self.dcoctl
    }
}

#[cfg(feature = "g2xx2")]
const DCOCTL: Reg8 = Reg8::at(0x0056);
#[cfg(feature = "g2xx2")]
const BCSCTL1: Reg8 = Reg8::at(0x0057);

#[cfg(feature = "g2xx2")]
impl Calibration {
    /// Read the factory constants for `freq` from information memory
    pub fn read(freq: DcoFreq) -> Result<Self, CalibrationMissing> {
        let (bc1, dco) = freq.constant_addrs();
        Calibration::from_raw(Reg8::at(bc1).read(), Reg8::at(dco).read())
    }

    /// Switch the DCO to the calibrated frequency
    pub fn apply(&self) {
        // Lowest DCO setting first so the range change never overshoots
        DCOCTL.write(0);
        BCSCTL1.write(self.bcsctl1);
        DCOCTL.write(self.dcoctl);
    }
}

/// Calibrate the DCO to `freq`, or halt forever if the constants are missing.
#[cfg(feature = "g2xx2")]
pub fn calibrate_or_halt(freq: DcoFreq) -> Calibration {
    match Calibration::read(freq) {
        Ok(cal) => {
            cal.apply();
            debug!("DCO calibrated to {} Hz", freq.hz());
            cal
        }
        Err(err) => {
            warn!("DCO calibration missing: {}", err);
            halt()
        }
    }
}

/// Stop all execution: interrupts off, spin forever.
#[cfg(feature = "g2xx2")]
pub fn halt() -> ! {
    msp430::interrupt::disable();
    loop {
        msp430::asm::nop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erased_constant_is_missing() {
        assert_eq!(Calibration::from_raw(0xFF, 0x12), Err(CalibrationMissing));
        assert_eq!(Calibration::from_raw(0xFF, 0xFF), Err(CalibrationMissing));
    }

    #[test]
    fn valid_constants() {
        let cal = Calibration::from_raw(0x86, 0xB5).unwrap();
        assert_eq!(cal.bcsctl1(), 0x86);
        assert_eq!(cal.dcoctl(), 0xB5);
    }

    #[test]
    fn constants_live_in_segment_a() {
        for freq in [DcoFreq::_1MHz, DcoFreq::_8MHz, DcoFreq::_12MHz, DcoFreq::_16MHz] {
            let (bc1, dco) = freq.constant_addrs();
            assert_eq!(bc1, dco + 1);
            assert!((0x10C0..=0x10FF).contains(&bc1));
        }
        assert_eq!(DcoFreq::_1MHz.constant_addrs(), (0x10FF, 0x10FE));
        assert_eq!(DcoFreq::_16MHz.hz(), 16_000_000);
    }
}
