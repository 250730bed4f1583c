pub trait UsiPeriph {
    fn ctl0_wr(&self, bits: u8);
    fn ctl0_set(&self, bits: u8);
    fn ctl0_clear(&self, bits: u8);

    fn ctl1_rd(&self) -> u8;
    fn ctl1_wr(&self, bits: u8);
    fn ctl1_clear(&self, bits: u8);

    fn ckctl_wr(&self, bits: u8);

    fn cnt_rd(&self) -> u8;
    fn cnt_wr(&self, bits: u8);
    fn cnt_set(&self, bits: u8);

    fn srl_rd(&self) -> u8;
    fn srl_wr(&self, bits: u8);
}

#[cfg(feature = "g2xx2")]
pub use self::g2xx2::UsiRegs;

#[cfg(feature = "g2xx2")]
mod g2xx2 {
    use super::UsiPeriph;
    use crate::hw_traits::{Reg8, Steal};

    const USICTL0: Reg8 = Reg8::at(0x0078);
    const USICTL1: Reg8 = Reg8::at(0x0079);
    const USICKCTL: Reg8 = Reg8::at(0x007A);
    const USICNT: Reg8 = Reg8::at(0x007B);
    const USISRL: Reg8 = Reg8::at(0x007C);

    /// USI register block of the MSP430G2xx2.
    pub struct UsiRegs(());

    impl Steal for UsiRegs {
        #[inline(always)]
        unsafe fn steal() -> Self {
            UsiRegs(())
        }
    }

    impl UsiPeriph for UsiRegs {
        #[inline(always)]
        fn ctl0_wr(&self, bits: u8) {
            USICTL0.write(bits)
        }

        #[inline(always)]
        fn ctl0_set(&self, bits: u8) {
            USICTL0.set_bits(bits)
        }

        #[inline(always)]
        fn ctl0_clear(&self, bits: u8) {
            USICTL0.clear_bits(bits)
        }

        #[inline(always)]
        fn ctl1_rd(&self) -> u8 {
            USICTL1.read()
        }

        #[inline(always)]
        fn ctl1_wr(&self, bits: u8) {
            USICTL1.write(bits)
        }

        #[inline(always)]
        fn ctl1_clear(&self, bits: u8) {
            USICTL1.clear_bits(bits)
        }

        #[inline(always)]
        fn ckctl_wr(&self, bits: u8) {
            USICKCTL.write(bits)
        }

        #[inline(always)]
        fn cnt_rd(&self) -> u8 {
            USICNT.read()
        }

        #[inline(always)]
        fn cnt_wr(&self, bits: u8) {
            USICNT.write(bits)
        }

        #[inline(always)]
        fn cnt_set(&self, bits: u8) {
            USICNT.set_bits(bits)
        }

        #[inline(always)]
        fn srl_rd(&self) -> u8 {
            USISRL.read()
        }

        #[inline(always)]
        fn srl_wr(&self, bits: u8) {
            USISRL.write(bits)
        }
    }
}
