//! Blocking I2C master
//!
//! [`UsiMaster`] drives an [`I2cEngine`] by polling the shift-complete flag, so it works with
//! interrupts disabled. It implements the `embedded-hal` 1.0 [`I2c`](embedded_hal::i2c::I2c)
//! trait, and the 0.2 blocking traits with the `embedded-hal-02` feature.
//!
//! Consecutive operations of the same kind share one address phase. A change between reading and
//! writing produces a repeated start, and the last operation ends with a stop.
//!
//! ```ignore
//! let usi = Usi::take(UsiConfig::new().use_smclk(ClockDivider::_8)).unwrap();
//! let mut master = UsiMaster::new(usi).with_timeout(10_000);
//!
//! let mut temp = [0; 2];
//! master.write_read(0x48, &[0x00], &mut temp)?;
//! ```

use crate::bus::UsiBus;
use crate::handler::Handler;
use crate::i2c::{I2cConfig, I2cEngine, I2cError, Role, Transfer};
use core::mem::discriminant;
use embedded_hal::i2c::Operation;

/// Polled I2C master on a [`UsiBus`]
pub struct UsiMaster<BUS: UsiBus> {
    bus: BUS,
    timeout: Option<u32>,
}

impl<BUS: UsiBus> UsiMaster<BUS> {
    /// Configure the bus as a master. Without a timeout a stuck bus blocks forever.
    pub fn new(mut bus: BUS) -> Self {
        bus.configure(Role::Master);
        UsiMaster { bus, timeout: None }
    }

    /// Give up on a transfer after `polls` polls of the shift flag, reset the bus and return
    /// [`I2cError::Timeout`].
    pub fn with_timeout(mut self, polls: u32) -> Self {
        self.timeout = Some(polls);
        self
    }

    /// Release the bus
    pub fn free(self) -> BUS {
        self.bus
    }

    /// Write `bytes` to `address`. An empty slice only checks that the address is acknowledged.
    pub fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), I2cError> {
        self.transaction(address, &mut [Operation::Write(bytes)])
    }

    /// Fill `buffer` from `address`. An empty buffer only checks the address, using a write frame.
    pub fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), I2cError> {
        self.transaction(address, &mut [Operation::Read(buffer)])
    }

    /// Write `bytes`, then fill `buffer` after a repeated start
    pub fn write_read(
        &mut self,
        address: u8,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), I2cError> {
        self.transaction(address, &mut [Operation::Write(bytes), Operation::Read(buffer)])
    }

    /// Run `ops` against `address` as one bus transaction.
    ///
    /// A data NACK reports the number of bytes moved in the whole transaction before it. A NACK of
    /// the address, including one after a repeated start, is always `UnexpectedNack(0)`.
    pub fn transaction(&mut self, address: u8, ops: &mut [Operation<'_>]) -> Result<(), I2cError> {
        let mut start = 0;
        let mut moved = 0;
        while start < ops.len() {
            let kind = discriminant(&ops[start]);
            let end = ops[start..]
                .iter()
                .position(|op| discriminant(op) != kind)
                .map_or(ops.len(), |n| start + n);

            let is_last = end == ops.len();
            let group = &mut ops[start..end];
            let len: usize = group.iter().map(op_len).sum();
            let transfer = match group[0] {
                Operation::Write(_) => Transfer::write(address, len),
                Operation::Read(_) => Transfer::read(address, len),
            };
            let transfer = if is_last {
                transfer
            } else {
                transfer.with_repeated_start()
            };

            // An address NACK stays an address NACK after a repeated start
            self.run(transfer, group).map_err(|err| match err {
                I2cError::UnexpectedNack(n) if n > 0 => I2cError::UnexpectedNack(n + moved),
                err => err,
            })?;
            moved += len;
            start = end;
        }
        Ok(())
    }

    fn run(&mut self, transfer: Transfer, ops: &mut [Operation<'_>]) -> Result<(), I2cError> {
        let timeout = self.timeout;
        let mut engine = I2cEngine::resume(&mut self.bus, I2cConfig::master(), Cursor::new(ops));
        engine.begin(transfer)?;

        let mut polls: u32 = 0;
        loop {
            if let Some(outcome) = engine.service() {
                return outcome.map(|_| ());
            }
            polls = polls.saturating_add(1);
            if timeout.map_or(false, |limit| polls >= limit) {
                warn!("i2c master timed out in {}", engine.state());
                engine.reset();
                return Err(I2cError::Timeout);
            }
        }
    }
}

fn op_len(op: &Operation<'_>) -> usize {
    match op {
        Operation::Write(bytes) => bytes.len(),
        Operation::Read(buffer) => buffer.len(),
    }
}

/// Walks the buffers of a run of operations
struct Cursor<'a, 'b> {
    ops: &'a mut [Operation<'b>],
    op: usize,
    pos: usize,
}

impl<'a, 'b> Cursor<'a, 'b> {
    fn new(ops: &'a mut [Operation<'b>]) -> Self {
        Cursor { ops, op: 0, pos: 0 }
    }
}

impl Handler for Cursor<'_, '_> {
    fn on_byte_received(&mut self, byte: u8) {
        while let Some(op) = self.ops.get_mut(self.op) {
            if let Operation::Read(buffer) = op {
                if let Some(slot) = buffer.get_mut(self.pos) {
                    *slot = byte;
                    self.pos += 1;
                    return;
                }
            }
            self.op += 1;
            self.pos = 0;
        }
    }

    fn on_byte_requested(&mut self) -> u8 {
        while let Some(op) = self.ops.get(self.op) {
            if let Operation::Write(bytes) = op {
                if let Some(&byte) = bytes.get(self.pos) {
                    self.pos += 1;
                    return byte;
                }
            }
            self.op += 1;
            self.pos = 0;
        }
        0xFF
    }
}

mod ehal1 {
    use super::*;
    use embedded_hal::i2c::{ErrorType, I2c, SevenBitAddress};

    impl<BUS: UsiBus> ErrorType for UsiMaster<BUS> {
        type Error = I2cError;
    }

    impl<BUS: UsiBus> I2c<SevenBitAddress> for UsiMaster<BUS> {
        #[inline]
        fn transaction(
            &mut self,
            address: SevenBitAddress,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            UsiMaster::transaction(self, address, operations)
        }
    }
}

#[cfg(feature = "embedded-hal-02")]
mod ehal02 {
    use super::*;
    use embedded_hal_02::blocking::i2c::{Read, SevenBitAddress, Write, WriteRead};

    impl<BUS: UsiBus> Read<SevenBitAddress> for UsiMaster<BUS> {
        type Error = I2cError;

        #[inline]
        fn read(&mut self, address: SevenBitAddress, buffer: &mut [u8]) -> Result<(), Self::Error> {
            UsiMaster::read(self, address, buffer)
        }
    }

    impl<BUS: UsiBus> Write<SevenBitAddress> for UsiMaster<BUS> {
        type Error = I2cError;

        #[inline]
        fn write(&mut self, address: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error> {
            UsiMaster::write(self, address, bytes)
        }
    }

    impl<BUS: UsiBus> WriteRead<SevenBitAddress> for UsiMaster<BUS> {
        type Error = I2cError;

        #[inline]
        fn write_read(
            &mut self,
            address: SevenBitAddress,
            bytes: &[u8],
            buffer: &mut [u8],
        ) -> Result<(), Self::Error> {
            UsiMaster::write_read(self, address, bytes, buffer)
        }
    }
}
