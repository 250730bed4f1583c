//! Interrupt-driven I2C master and slave for the USI peripheral of MSP430G2xx2 microcontrollers.
//! Here are the [`datasheet`] and [`User's guide`] for reference.
//!
//! The USI has no I2C protocol logic of its own, only a shift register, a bit counter and start
//! condition detection. This crate runs the protocol in software as one state machine per bus,
//! advanced once per bus event:
//!
//! * [`i2c::I2cEngine`] is the state machine, for either role
//! * [`usi::Usi`] connects it to the peripheral through the [`bus::UsiBus`] trait
//! * [`handler`] supplies and consumes the data bytes
//! * [`completion::Completion`] carries results from the interrupt to the main loop
//! * [`master::UsiMaster`] is a polled master implementing the `embedded-hal` I2C traits
//!
//! [`datasheet`]: https://www.ti.com/lit/ds/symlink/msp430g2452.pdf
//! [`User's guide`]: https://www.ti.com/lit/ug/slau144j/slau144j.pdf
//!
//! # Usage
//!
//! Enable exactly one device feature (`msp430g2452`, `msp430g2332`, `msp430g2232` or
//! `msp430g2132`) to get the register level implementations. Without one the crate still builds,
//! which is how the protocol logic is tested on the host.
//!
//! Requires `msp430-elf-gcc` installed and in $PATH to build for the device.
//!
//! ```ignore
//! let _wdt = Wdt::hold().unwrap();
//! clock::calibrate_or_halt(DcoFreq::_1MHz);
//!
//! let usi = Usi::take(UsiConfig::new()).unwrap();
//! let slave = I2cEngine::new(usi, I2cConfig::slave(0x48).rx_limit(4), RegisterFile::<4>::new());
//! critical_section::with(|cs| SLAVE.borrow_ref_mut(cs).replace(slave));
//! ```

#![cfg_attr(not(test), no_std)]
#![cfg_attr(target_arch = "msp430", feature(asm_experimental_arch))]
#![deny(missing_docs)]

#[macro_use]
mod fmt;

pub mod bus;
pub mod clock;
pub mod completion;
pub mod gpio;
pub mod handler;
pub mod i2c;
#[cfg(all(feature = "g2xx2", target_arch = "msp430"))]
pub mod lpm;
pub mod master;
pub mod prelude;
pub mod usi;
pub mod watchdog;

mod hw_traits;
mod util;

#[cfg(test)]
mod testing;
