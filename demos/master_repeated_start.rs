#![no_main]
#![no_std]
#![feature(abi_msp430_interrupt)]
#![feature(asm_experimental_arch)]

// Interrupt-driven master. Over and over, it writes 2 bytes to the slave at 0x48, then switches to
// reading with a repeated start and reads 3 bytes back. The written bytes count up from 0x55.
// Run `slave_echo` on a second board and the bytes read back are the ones just written, with the
// last one repeated.

// The watchdog runs as an interval timer and wakes the CPU every 32768 SMCLK cycles (~33 ms at
// 1 MHz). It paces the transfers and bounds how long the main loop waits for one.

// Connect:
// P1.6 <--> SCL
// P1.7 <--> SDA
// and GND between the two boards.

mod device;

use core::cell::RefCell;
use critical_section::Mutex;
use device::interrupt;
use msp430_rt::entry;
use msp430_usi_i2c::{
    clock::{self, DcoFreq},
    completion::Completion,
    handler::Incrementing,
    i2c::{I2cConfig, I2cEngine, I2cError, Transfer},
    lpm::enter_lpm0_unless,
    usi::{ClockDivider, Usi, UsiConfig, UsiG2xx2},
    watchdog::{Wdt, WdtInterval},
};
use panic_msp430 as _;

const SLAVE_ADDRESS: u8 = 0x48;
const TX_BYTES: usize = 2;
const RX_BYTES: usize = 3;
// Watchdog ticks before a transfer is given up
const TIMEOUT_TICKS: u32 = 4;

static MASTER: Mutex<RefCell<Option<I2cEngine<UsiG2xx2, Incrementing>>>> =
    Mutex::new(RefCell::new(None));
static DONE: Completion = Completion::new();

#[entry]
fn main() -> ! {
    let wdt = Wdt::hold().unwrap();
    clock::calibrate_or_halt(DcoFreq::_1MHz);
    let _wdt = wdt.interval(WdtInterval::Smclk32768);

    // SMCLK / 8, about 60 kHz on SCL once the bit timing overhead is included
    let usi = Usi::take(UsiConfig::new().use_smclk(ClockDivider::_8)).unwrap();
    let master = I2cEngine::new(usi, I2cConfig::master(), Incrementing::new(0x55));
    critical_section::with(|cs| MASTER.borrow_ref_mut(cs).replace(master));

    let mut failures = 0u16;
    loop {
        critical_section::with(|cs| {
            if let Some(master) = MASTER.borrow_ref_mut(cs).as_mut() {
                master
                    .begin_with_restart(
                        Transfer::write(SLAVE_ADDRESS, TX_BYTES),
                        Transfer::read(SLAVE_ADDRESS, RX_BYTES),
                    )
                    .ok();
            }
        });

        let outcome = DONE.wait(Some(TIMEOUT_TICKS), || {
            enter_lpm0_unless(|| DONE.is_signaled())
        });
        match outcome {
            Ok(_) => {}
            Err(I2cError::Timeout) => {
                failures = failures.wrapping_add(1);
                // Stuck bus, start over from Idle
                critical_section::with(|cs| {
                    if let Some(master) = MASTER.borrow_ref_mut(cs).as_mut() {
                        master.reset();
                    }
                });
                DONE.clear();
            }
            Err(_) => failures = failures.wrapping_add(1),
        }

        // Wait one watchdog tick between transfers
        enter_lpm0_unless(|| false);
    }
}

#[interrupt(wake_cpu)]
fn USI() {
    critical_section::with(|cs| {
        let mut master = MASTER.borrow_ref_mut(cs);
        let Some(master) = master.as_mut() else { return };
        if let Some(outcome) = master.service() {
            DONE.signal(outcome);
        }
    });
}

// Interval tick, only here to wake the CPU
#[interrupt(wake_cpu)]
fn WDT() {}

// The compiler will emit calls to the abort() compiler intrinsic if debug assertions are
// enabled (default for dev profile). MSP430 does not actually have meaningful abort() support
// so for now, we create our own in each application where debug assertions are present.
#[no_mangle]
extern "C" fn abort() -> ! {
    panic!();
}
