pub mod gpio;
pub mod usi;

#[cfg(feature = "g2xx2")]
pub trait Steal {
    // Create a peripheral handle without checking that another one exists
    unsafe fn steal() -> Self;
}

/// Byte-wide register in the MSP430 peripheral address space.
#[cfg(feature = "g2xx2")]
#[derive(Clone, Copy)]
pub(crate) struct Reg8(usize);

#[cfg(feature = "g2xx2")]
impl Reg8 {
    #[inline(always)]
    pub const fn at(addr: usize) -> Self {
        Reg8(addr)
    }

    #[inline(always)]
    pub fn read(self) -> u8 {
        // Safety: only constructed with addresses of byte registers from the device datasheet
        unsafe { core::ptr::read_volatile(self.0 as *const u8) }
    }

    #[inline(always)]
    pub fn write(self, bits: u8) {
        unsafe { core::ptr::write_volatile(self.0 as *mut u8, bits) }
    }

    #[inline(always)]
    pub fn set_bits(self, bits: u8) {
        self.write(self.read() | bits)
    }

    #[inline(always)]
    pub fn clear_bits(self, bits: u8) {
        self.write(self.read() & !bits)
    }
}

/// Word-wide register. Written as a whole, since password protected registers reject byte writes.
#[cfg(feature = "g2xx2")]
#[derive(Clone, Copy)]
pub(crate) struct Reg16(usize);

#[cfg(feature = "g2xx2")]
impl Reg16 {
    #[inline(always)]
    pub const fn at(addr: usize) -> Self {
        Reg16(addr)
    }

    #[inline(always)]
    pub fn write(self, bits: u16) {
        unsafe { core::ptr::write_volatile(self.0 as *mut u16, bits) }
    }
}
