pub trait GpioPeriph {
    fn pxout_set(&self, bits: u8);
    fn pxout_clear(&self, bits: u8);

    fn pxdir_set(&self, bits: u8);
    fn pxdir_clear(&self, bits: u8);

    fn pxren_set(&self, bits: u8);
    fn pxren_clear(&self, bits: u8);
}

#[cfg(feature = "g2xx2")]
pub use self::g2xx2::Port1;

#[cfg(feature = "g2xx2")]
mod g2xx2 {
    use super::GpioPeriph;
    use crate::hw_traits::{Reg8, Steal};

    const P1OUT: Reg8 = Reg8::at(0x0021);
    const P1DIR: Reg8 = Reg8::at(0x0022);
    const P1REN: Reg8 = Reg8::at(0x0027);

    /// Port 1 register block. The USI pins live on P1.6 and P1.7.
    pub struct Port1(());

    impl Steal for Port1 {
        #[inline(always)]
        unsafe fn steal() -> Self {
            Port1(())
        }
    }

    macro_rules! reg_methods {
        ($reg:ident, $set:ident, $clear:ident) => {
            #[inline(always)]
            fn $set(&self, bits: u8) {
                $reg.set_bits(bits)
            }

            #[inline(always)]
            fn $clear(&self, bits: u8) {
                $reg.clear_bits(bits)
            }
        };
    }

    impl GpioPeriph for Port1 {
        reg_methods!(P1OUT, pxout_set, pxout_clear);
        reg_methods!(P1DIR, pxdir_set, pxdir_clear);
        reg_methods!(P1REN, pxren_set, pxren_clear);
    }
}
