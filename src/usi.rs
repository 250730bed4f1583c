//! USI (Universal Serial Interface) in I2C mode.
//!
//! The USI is a plain shift register with a bit counter. In I2C mode it clocks SCL, drives SDA
//! open drain and detects start conditions, but addressing, acknowledge bits and stop conditions
//! are left to software. [`Usi`] exposes the peripheral as a [`UsiBus`] for the
//! [`I2cEngine`](crate::i2c::I2cEngine).
//!
//! Pins used:
//!
//! {SCL: P1.6, SDA: P1.7}, both with internal pull-ups enabled.
//!
//! The bit clock configured in [`UsiConfig`] only matters for a master. A slave is clocked by the
//! master's SCL.

use crate::bus::UsiBus;
use crate::gpio::{self, BusLine};
use crate::hw_traits::{gpio::GpioPeriph, usi::UsiPeriph};
use crate::i2c::Role;
use crate::util::BitsExt;
use bitflags::bitflags;

bitflags! {
    /// USICTL0
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub(crate) struct UsiCtl0: u8 {
        /// SDA port function
        const USIPE7 = 1 << 7;
        /// SCL port function
        const USIPE6 = 1 << 6;
        const USIPE5 = 1 << 5;
        const USILSB = 1 << 4;
        /// Master mode
        const USIMST = 1 << 3;
        /// Output latch transparent
        const USIGE = 1 << 2;
        /// SDA output enable
        const USIOE = 1 << 1;
        /// Held in reset
        const USISWRST = 1 << 0;
    }
}

bitflags! {
    /// USICTL1
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub(crate) struct UsiCtl1: u8 {
        const USICKPH = 1 << 7;
        /// I2C mode
        const USII2C = 1 << 6;
        /// Start condition interrupt enable
        const USISTTIE = 1 << 5;
        /// Counter interrupt enable
        const USIIE = 1 << 4;
        /// Arbitration lost
        const USIAL = 1 << 3;
        /// Stop condition received
        const USISTP = 1 << 2;
        /// Start condition received
        const USISTTIFG = 1 << 1;
        /// Counter reached zero
        const USIIFG = 1 << 0;
    }
}

bitflags! {
    /// USICKCTL, single bit fields only. Divider and clock select are placed by `UsiConfig`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub(crate) struct UsiCkctl: u8 {
        /// Clock idles high, required for I2C
        const USICKPL = 1 << 1;
        const USISWCLK = 1 << 0;
    }
}

bitflags! {
    /// USICNT
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub(crate) struct UsiCnt: u8 {
        /// Release SCL
        const USISCLREL = 1 << 7;
        const USI16B = 1 << 6;
        /// Flag is cleared by software only
        const USIIFGCC = 1 << 5;
        /// Bit count field
        const USICNTX = 0x1F;
    }
}

/// USI bit clock source
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSource {
    /// ACLK
    Aclk = 1,
    /// SMCLK
    Smclk = 2,
}

/// USI bit clock divider
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockDivider {
    /// Divide by 1
    _1 = 0,
    /// Divide by 2
    _2 = 1,
    /// Divide by 4
    _4 = 2,
    /// Divide by 8
    _8 = 3,
    /// Divide by 16
    _16 = 4,
    /// Divide by 32
    _32 = 5,
    /// Divide by 64
    _64 = 6,
    /// Divide by 128
    _128 = 7,
}

/// Clock configuration of the USI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UsiConfig {
    source: ClockSource,
    divider: ClockDivider,
}

impl UsiConfig {
    /// SMCLK / 128. With the 1 MHz calibrated DCO this gives roughly 8 kHz on SCL.
    pub const fn new() -> Self {
        UsiConfig {
            source: ClockSource::Smclk,
            divider: ClockDivider::_128,
        }
    }

    /// Clock the bus from SMCLK
    pub const fn use_smclk(mut self, divider: ClockDivider) -> Self {
        self.source = ClockSource::Smclk;
        self.divider = divider;
        self
    }

    /// Clock the bus from ACLK
    pub const fn use_aclk(mut self, divider: ClockDivider) -> Self {
        self.source = ClockSource::Aclk;
        self.divider = divider;
        self
    }

    #[inline(always)]
    fn ckctl(&self, role: Role) -> u8 {
        match role {
            Role::Slave => UsiCkctl::USICKPL.bits(),
            Role::Master => {
                ((self.divider as u8) << 5)
                    | ((self.source as u8) << 2)
                    | UsiCkctl::USICKPL.bits()
            }
        }
    }
}

impl Default for UsiConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// USI peripheral together with the port its pins live on.
pub struct Usi<USI: UsiPeriph, PORT: GpioPeriph> {
    usi: USI,
    port: PORT,
    config: UsiConfig,
}

impl<USI: UsiPeriph, PORT: GpioPeriph> Usi<USI, PORT> {
    /// Wrap the register blocks. Nothing is written until the bus is configured.
    pub fn new(usi: USI, port: PORT, config: UsiConfig) -> Self {
        Usi { usi, port, config }
    }

    /// Clock configuration in use
    pub fn config(&self) -> UsiConfig {
        self.config
    }

    /// Put the USI back into reset, disconnect it from the pins and turn the pull-ups off.
    pub fn free(self) -> (USI, PORT) {
        self.usi.ctl0_wr(UsiCtl0::USISWRST.bits());
        self.usi.ctl1_wr(0);
        gpio::float(&self.port, BusLine::Scl);
        gpio::float(&self.port, BusLine::Sda);
        (self.usi, self.port)
    }
}

impl<USI: UsiPeriph, PORT: GpioPeriph> UsiBus for Usi<USI, PORT> {
    fn configure(&mut self, role: Role) {
        gpio::pull_up(&self.port, BusLine::Scl);
        gpio::pull_up(&self.port, BusLine::Sda);

        let mut ctl0 = UsiCtl0::USIPE6 | UsiCtl0::USIPE7 | UsiCtl0::USISWRST;
        let mut ctl1 = UsiCtl1::USII2C | UsiCtl1::USIIE;
        match role {
            Role::Master => ctl0 |= UsiCtl0::USIMST,
            Role::Slave => ctl1 |= UsiCtl1::USISTTIE,
        }

        // Configure while held in reset
        self.usi.ctl0_wr(ctl0.bits());
        self.usi.ctl1_wr(ctl1.bits());
        self.usi.ckctl_wr(self.config.ckctl(role));
        self.usi.cnt_set(UsiCnt::USIIFGCC.bits());
        self.usi.ctl0_clear(UsiCtl0::USISWRST.bits());
        self.usi.ctl1_clear(UsiCtl1::USIIFG.bits());
    }

    #[inline(always)]
    fn set_output_enable(&mut self, enabled: bool) {
        if enabled {
            self.usi.ctl0_set(UsiCtl0::USIOE.bits());
        } else {
            self.usi.ctl0_clear(UsiCtl0::USIOE.bits());
        }
    }

    #[inline(always)]
    fn write_shift(&mut self, byte: u8) {
        self.usi.srl_wr(byte);
    }

    #[inline(always)]
    fn read_shift(&mut self) -> u8 {
        self.usi.srl_rd()
    }

    #[inline(always)]
    fn arm(&mut self, bits: u8) {
        let cnt = UsiCnt::USICNTX.bits();
        let ctl = self.usi.cnt_rd().clear_mask(cnt);
        self.usi.cnt_wr(ctl.set_mask(bits & cnt));
    }

    #[inline(always)]
    fn pulse_latch(&mut self) {
        self.usi.ctl0_set(UsiCtl0::USIGE.bits());
        self.usi.ctl0_clear(UsiCtl0::USIGE.bits());
    }

    #[inline(always)]
    fn start_detected(&mut self) -> bool {
        UsiCtl1::from_bits_retain(self.usi.ctl1_rd()).contains(UsiCtl1::USISTTIFG)
    }

    #[inline(always)]
    fn clear_start(&mut self) {
        self.usi.ctl1_clear(UsiCtl1::USISTTIFG.bits());
    }

    #[inline(always)]
    fn shift_complete(&mut self) -> bool {
        UsiCtl1::from_bits_retain(self.usi.ctl1_rd()).contains(UsiCtl1::USIIFG)
    }

    #[inline(always)]
    fn clear_shift_complete(&mut self) {
        self.usi.ctl1_clear(UsiCtl1::USIIFG.bits());
    }
}

#[cfg(feature = "g2xx2")]
mod g2xx2 {
    use super::{Usi, UsiConfig};
    use crate::hw_traits::{gpio::Port1, usi::UsiRegs, Steal};
    use crate::util::TakeOnce;

    static TAKEN: TakeOnce = TakeOnce::new();

    /// The USI of an MSP430G2xx2 on port 1
    pub type UsiG2xx2 = Usi<UsiRegs, Port1>;

    impl Usi<UsiRegs, Port1> {
        /// Take the USI and its port. Returns `None` if it has been taken before.
        pub fn take(config: UsiConfig) -> Option<Self> {
            // Safety: the flag hands out the registers at most once
            TAKEN.take().then(|| unsafe { Usi::new(UsiRegs::steal(), Port1::steal(), config) })
        }
    }
}

#[cfg(feature = "g2xx2")]
pub use g2xx2::UsiG2xx2;
