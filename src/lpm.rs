//! Low Power Mode 0 (LPM0)
//!
//! LPM0 turns off the CPU and MCLK while SMCLK, ACLK and the USI keep running, so a slave can
//! sleep through a whole transaction. The interrupt that should wake the main loop must return
//! the CPU to active mode, e.g. with `#[interrupt(wake_cpu)]` from `msp430-rt`.

use core::arch::asm;

// Status register:
// SCG1 SCG0 OSC_OFF CPU_OFF GIE N Z C
// 7    6    5       4       3   2 1 0
const CPU_OFF: u8 = 1 << 4;
const GIE: u8 = 1 << 3;

/// For each set bit in the bitmask, set the corresponding bit in the status register.
#[inline(always)]
fn set_sr_bits<const MASK: u8>() {
    unsafe { asm!("bis.b #{mask}, SR", mask = const MASK, options(nomem, nostack)) };
}

/// Enter LPM0. Interrupts are left as they are.
#[inline(always)]
pub fn enter_lpm0() {
    set_sr_bits::<CPU_OFF>();
}

/// Enter LPM0 with interrupts enabled, unless `pending` returns true.
///
/// `pending` runs with interrupts disabled and LPM0 is entered in the same instruction that
/// enables them again, so an interrupt that fires after the check still wakes the CPU.
#[inline]
pub fn enter_lpm0_unless(pending: impl FnOnce() -> bool) {
    msp430::interrupt::disable();
    if pending() {
        // Safety: not called from inside a critical section
        unsafe { msp430::interrupt::enable() };
        return;
    }
    const LPM0_GIE: u8 = CPU_OFF + GIE;
    set_sr_bits::<LPM0_GIE>();
    msp430::asm::nop();
}
