#![no_main]
#![no_std]
#![feature(abi_msp430_interrupt)]
#![feature(asm_experimental_arch)]

// Register-mapped slave at address 0x48, exposing 8 one-byte registers.
// The first byte of a write selects the register index. Further bytes are stored starting at that
// index, which increments after each byte and wraps around after register 7.
// To read, write the index alone, then read (a repeated start works too). Reads continue from the
// index and increment the same way.
// Register 7 is read-only from the bus side: after every transaction the main loop overwrites it
// with the number of transactions seen.

// Connect:
// P1.6 <--> SCL
// P1.7 <--> SDA

mod device;

use core::cell::RefCell;
use critical_section::Mutex;
use device::interrupt;
use msp430_rt::entry;
use msp430_usi_i2c::{
    clock::{self, DcoFreq},
    completion::Completion,
    handler::RegisterFile,
    i2c::{I2cConfig, I2cEngine},
    lpm::enter_lpm0_unless,
    usi::{Usi, UsiConfig, UsiG2xx2},
    watchdog::Wdt,
};
use panic_msp430 as _;

const OWN_ADDRESS: u8 = 0x48;
const REG_COUNT: usize = 8;

static SLAVE: Mutex<RefCell<Option<I2cEngine<UsiG2xx2, RegisterFile<REG_COUNT>>>>> =
    Mutex::new(RefCell::new(None));
static DONE: Completion = Completion::new();

#[entry]
fn main() -> ! {
    let _wdt = Wdt::hold().unwrap();
    clock::calibrate_or_halt(DcoFreq::_1MHz);

    let usi = Usi::take(UsiConfig::new()).unwrap();
    let slave = I2cEngine::new(usi, I2cConfig::slave(OWN_ADDRESS), RegisterFile::new());
    critical_section::with(|cs| SLAVE.borrow_ref_mut(cs).replace(slave));

    let mut transactions: u8 = 0;
    loop {
        if DONE.wait(None, || enter_lpm0_unless(|| DONE.is_signaled())).is_ok() {
            transactions = transactions.wrapping_add(1);
        }
        critical_section::with(|cs| {
            if let Some(slave) = SLAVE.borrow_ref_mut(cs).as_mut() {
                slave.handler_mut().registers_mut()[REG_COUNT - 1] = transactions;
            }
        });
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
