//! Watchdog timer (WDT+)
//!
//! **Note**: MSP430 devices reset after bootup if the watchdog is not stopped within roughly 32
//! ms. Call [`Wdt::hold()`] as early as possible. It hands out the watchdog only once.
//!
//! In interval mode the watchdog is a periodic interrupt source instead. Each interrupt wakes the
//! CPU from LPM0, which gives [`Completion::wait`](crate::completion::Completion::wait) a time
//! base for its idle limit.
#![cfg_attr(not(feature = "g2xx2"), allow(dead_code))]

use core::marker::PhantomData;

const PASSWORD: u16 = 0x5A00;
const WDTHOLD: u16 = 1 << 7;
const WDTTMSEL: u16 = 1 << 4;
const WDTCNTCL: u16 = 1 << 3;
const WDTSSEL: u16 = 1 << 2;

/// Interval mode period, in cycles of the selected clock
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WdtInterval {
    /// SMCLK / 32768
    Smclk32768,
    /// SMCLK / 8192
    Smclk8192,
    /// SMCLK / 512
    Smclk512,
    /// SMCLK / 64
    Smclk64,
    /// ACLK / 32768
    Aclk32768,
    /// ACLK / 8192
    Aclk8192,
    /// ACLK / 512
    Aclk512,
    /// ACLK / 64
    Aclk64,
}

impl WdtInterval {
    #[inline(always)]
    fn bits(self) -> u16 {
        let (aclk, is) = match self {
            WdtInterval::Smclk32768 => (false, 0),
            WdtInterval::Smclk8192 => (false, 1),
            WdtInterval::Smclk512 => (false, 2),
            WdtInterval::Smclk64 => (false, 3),
            WdtInterval::Aclk32768 => (true, 0),
            WdtInterval::Aclk8192 => (true, 1),
            WdtInterval::Aclk512 => (true, 2),
            WdtInterval::Aclk64 => (true, 3),
        };
        if aclk {
            WDTSSEL | is
        } else {
            is
        }
    }
}

#[inline(always)]
fn interval_ctl(period: WdtInterval) -> u16 {
    PASSWORD | WDTTMSEL | WDTCNTCL | period.bits()
}

#[inline(always)]
fn hold_ctl() -> u16 {
    PASSWORD | WDTHOLD
}

/// Held typestate
pub struct Held;
/// Interval mode typestate
pub struct IntervalMode;

/// Watchdog timer, either stopped or running as an interval timer
pub struct Wdt<MODE> {
    _mode: PhantomData<MODE>,
    period: WdtInterval,
}

#[cfg(feature = "g2xx2")]
mod regs {
    use crate::hw_traits::{Reg16, Reg8};

    pub(super) const WDTCTL: Reg16 = Reg16::at(0x0120);
    pub(super) const IE1: Reg8 = Reg8::at(0x0000);
    pub(super) const IFG1: Reg8 = Reg8::at(0x0002);
    pub(super) const WDTIE: u8 = 1 << 0;
    pub(super) const WDTIFG: u8 = 1 << 0;
}

#[cfg(feature = "g2xx2")]
static TAKEN: crate::util::TakeOnce = crate::util::TakeOnce::new();

#[cfg(feature = "g2xx2")]
impl Wdt<Held> {
    /// Take the watchdog and stop it. Returns `None` if it has been taken before, in which case
    /// the watchdog is left alone.
    pub fn hold() -> Option<Self> {
        TAKEN.take().then(|| {
            regs::WDTCTL.write(hold_ctl());
            Wdt {
                _mode: PhantomData,
                period: WdtInterval::Smclk32768,
            }
        })
    }

    /// Run as an interval timer with its interrupt enabled
    pub fn interval(self, period: WdtInterval) -> Wdt<IntervalMode> {
        regs::IFG1.clear_bits(regs::WDTIFG);
        regs::WDTCTL.write(interval_ctl(period));
        regs::IE1.set_bits(regs::WDTIE);
        Wdt {
            _mode: PhantomData,
            period,
        }
    }
}

#[cfg(feature = "g2xx2")]
impl Wdt<IntervalMode> {
    /// Restart the current period from zero
    pub fn restart(&mut self) {
        regs::WDTCTL.write(interval_ctl(self.period));
    }

    /// Configured period
    pub fn period(&self) -> WdtInterval {
        self.period
    }

    /// Stop the timer and disable its interrupt
    pub fn pause(self) -> Wdt<Held> {
        regs::IE1.clear_bits(regs::WDTIE);
        regs::WDTCTL.write(hold_ctl());
        Wdt {
            _mode: PhantomData,
            period: self.period,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_words() {
        assert_eq!(hold_ctl(), 0x5A80);
        assert_eq!(interval_ctl(WdtInterval::Smclk32768), 0x5A18);
        assert_eq!(interval_ctl(WdtInterval::Smclk64), 0x5A1B);
        assert_eq!(interval_ctl(WdtInterval::Aclk512), 0x5A1E);
        assert_eq!(interval_ctl(WdtInterval::Aclk64), 0x5A1F);
    }
}
