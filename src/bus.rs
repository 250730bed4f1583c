//! Bus abstraction used by the protocol engine.
//!
//! The [`I2cEngine`](crate::i2c::I2cEngine) never touches registers. Everything it needs from the
//! shift-register hardware goes through [`UsiBus`], which [`Usi`](crate::usi::Usi) implements for
//! the real peripheral.

use crate::i2c::Role;

/// Shift-register view of an I2C bus.
///
/// SDA is open drain: "driving" a bit means enabling the output with the MSB of the shift
/// register, releasing means disabling the output so the line floats high unless someone else
/// pulls it low.
pub trait UsiBus {
    /// Put the lines into I2C mode for the given role, with pull-ups enabled and the shift
    /// interrupt flag cleared. For a slave the start condition interrupt is enabled as well.
    fn configure(&mut self, role: Role);

    /// Enable or disable the SDA output driver.
    fn set_output_enable(&mut self, enabled: bool);

    /// Load the shift register. Bits are shifted out MSB first.
    fn write_shift(&mut self, byte: u8);

    /// Read the shift register. Received bits are shifted in at the LSB.
    fn read_shift(&mut self) -> u8;

    /// Start clocking `bits` bits (8 for a byte, 1 for an acknowledge bit).
    fn arm(&mut self, bits: u8);

    /// Make the shift register output transparent for a moment so the current MSB reaches SDA
    /// immediately. Used to generate start and stop conditions.
    fn pulse_latch(&mut self);

    /// Whether a start condition has been seen since the flag was last cleared.
    fn start_detected(&mut self) -> bool;

    /// Clear the start condition flag.
    fn clear_start(&mut self);

    /// Whether the armed bits have all been clocked.
    fn shift_complete(&mut self) -> bool;

    /// Clear the shift-complete flag.
    fn clear_shift_complete(&mut self);
}

impl<T: UsiBus + ?Sized> UsiBus for &mut T {
    #[inline(always)]
    fn configure(&mut self, role: Role) {
        (**self).configure(role)
    }

    #[inline(always)]
    fn set_output_enable(&mut self, enabled: bool) {
        (**self).set_output_enable(enabled)
    }

    #[inline(always)]
    fn write_shift(&mut self, byte: u8) {
        (**self).write_shift(byte)
    }

    #[inline(always)]
    fn read_shift(&mut self) -> u8 {
        (**self).read_shift()
    }

    #[inline(always)]
    fn arm(&mut self, bits: u8) {
        (**self).arm(bits)
    }

    #[inline(always)]
    fn pulse_latch(&mut self) {
        (**self).pulse_latch()
    }

    #[inline(always)]
    fn start_detected(&mut self) -> bool {
        (**self).start_detected()
    }

    #[inline(always)]
    fn clear_start(&mut self) {
        (**self).clear_start()
    }

    #[inline(always)]
    fn shift_complete(&mut self) -> bool {
        (**self).shift_complete()
    }

    #[inline(always)]
    fn clear_shift_complete(&mut self) {
        (**self).clear_shift_complete()
    }
}
