//! Prelude

pub use crate::bus::UsiBus as _msp430_usi_i2c_UsiBus;
pub use crate::handler::Handler as _msp430_usi_i2c_Handler;
pub use embedded_hal::i2c::I2c as _msp430_usi_i2c_I2c;
