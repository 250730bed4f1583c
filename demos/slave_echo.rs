#![no_main]
#![no_std]
#![feature(abi_msp430_interrupt)]
#![feature(asm_experimental_arch)]

// Echo slave at address 0x48. Bytes written to it come back, in order, from the following reads.
// Once everything has been read back it keeps returning the last byte written.
// The CPU sleeps in LPM0 between transactions and is woken by the USI interrupt.

// Connect:
// P1.6 <--> SCL
// P1.7 <--> SDA
// Both lines need pull-ups. The internal ones are enabled but are weak, add external ones for
// faster bus clocks.

mod device;

use core::cell::RefCell;
use critical_section::Mutex;
use device::interrupt;
use msp430_rt::entry;
use msp430_usi_i2c::{
    clock::{self, DcoFreq},
    completion::Completion,
    handler::EchoBuffer,
    i2c::{I2cConfig, I2cEngine},
    lpm::enter_lpm0_unless,
    usi::{Usi, UsiConfig, UsiG2xx2},
    watchdog::Wdt,
};
use panic_msp430 as _;

const OWN_ADDRESS: u8 = 0x48;

static SLAVE: Mutex<RefCell<Option<I2cEngine<UsiG2xx2, EchoBuffer<8>>>>> =
    Mutex::new(RefCell::new(None));
static DONE: Completion = Completion::new();

#[entry]
fn main() -> ! {
    let _wdt = Wdt::hold().unwrap();
    // Traps here if the DCO calibration constants have been erased
    clock::calibrate_or_halt(DcoFreq::_1MHz);

    let usi = Usi::take(UsiConfig::new()).unwrap();
    let slave = I2cEngine::new(usi, I2cConfig::slave(OWN_ADDRESS), EchoBuffer::new());
    critical_section::with(|cs| SLAVE.borrow_ref_mut(cs).replace(slave));

    let mut echoed = 0usize;
    loop {
        // Interrupts are enabled by the first sleep
        match DONE.wait(None, || enter_lpm0_unless(|| DONE.is_signaled())) {
            Ok(bytes) => echoed = echoed.wrapping_add(bytes),
            // Frames for other devices on the bus
            Err(_) => {}
        }
    }
}

#[interrupt(wake_cpu)]
fn USI() {
    critical_section::with(|cs| {
        let mut slave = SLAVE.borrow_ref_mut(cs);
        let Some(slave) = slave.as_mut() else { return };
        if let Some(outcome) = slave.service() {
            DONE.signal(outcome);
        }
    });
}

// The compiler will emit calls to the abort() compiler intrinsic if debug assertions are
// enabled (default for dev profile). MSP430 does not actually have meaningful abort() support
// so for now, we create our own in each application where debug assertions are present.
#[no_mangle]
extern "C" fn abort() -> ! {
    panic!();
}
