use core::cell::Cell;
use critical_section::Mutex;

/// Flag guarding a peripheral that may be handed out only once
#[cfg_attr(not(feature = "g2xx2"), allow(dead_code))]
pub(crate) struct TakeOnce(Mutex<Cell<bool>>);

#[cfg_attr(not(feature = "g2xx2"), allow(dead_code))]
impl TakeOnce {
    pub(crate) const fn new() -> Self {
        TakeOnce(Mutex::new(Cell::new(false)))
    }

    /// True the first time only
    #[inline]
    pub(crate) fn take(&self) -> bool {
        critical_section::with(|cs| !self.0.borrow(cs).replace(true))
    }
}

pub(crate) trait BitsExt {
    fn check(self, shift: u8) -> Self;
    fn set_mask(self, mask: Self) -> Self;
    fn clear_mask(self, mask: Self) -> Self;
}

impl BitsExt for u8 {
    #[inline(always)]
    fn check(self, shift: u8) -> Self {
        self & (1 << shift)
    }

    #[inline(always)]
    fn set_mask(self, mask: Self) -> Self {
        self | mask
    }

    #[inline(always)]
    fn clear_mask(self, mask: Self) -> Self {
        self & !mask
    }
}
