//! I2C protocol engine
//!
//! The USI only knows how to shift bits and spot start conditions, so the I2C protocol itself is
//! run in software by [`I2cEngine`]: one state per bus event, advanced every time the bit counter
//! runs out. The same engine runs either role, chosen by [`I2cConfig`].
//!
//! A slave is driven from the USI interrupt:
//!
//! ```ignore
//! static SLAVE: Mutex<RefCell<Option<I2cEngine<UsiG2xx2, EchoBuffer<8>>>>> =
//!     Mutex::new(RefCell::new(None));
//! static DONE: Completion = Completion::new();
//!
//! #[interrupt]
//! fn USI() {
//!     critical_section::with(|cs| {
//!         if let Some(slave) = SLAVE.borrow_ref_mut(cs).as_mut() {
//!             if let Some(outcome) = slave.service() {
//!                 DONE.signal(outcome);
//!             }
//!         }
//!     });
//! }
//! ```
//!
//! A master is normally used through [`UsiMaster`](crate::master::UsiMaster), which polls the
//! engine instead.
//!
//! Failures are reported once per transaction as an [`Outcome`], when the engine gets back to
//! [`State::Idle`]. A slave cannot see stop conditions, so a slave transaction with no receive
//! limit only completes when the next start condition arrives.

use crate::bus::UsiBus;
use crate::handler::Handler;
use crate::util::BitsExt;

const ACK: u8 = 0x00;
const NACK: u8 = 0xFF;

/// Bus role of an engine. Fixed for the lifetime of the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// Generates start/stop conditions and the clock
    Master,
    /// Answers to its own address
    Slave,
}

/// Direction of the data phase, from the engine's own point of view. A slave addressed for a read
/// transmits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Engine shifts bytes out
    Transmit,
    /// Engine shifts bytes in
    Receive,
}

/// Protocol state. Exactly one is active at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Waiting for a start condition (slave) or a call to `begin` (master)
    Idle,
    /// Address and R/W bit are being shifted
    AddressPhase,
    /// Address acknowledge bit
    AddressAckPhase,
    /// A data byte is being shifted
    DataPhase(Direction),
    /// Data acknowledge bit
    DataAckPhase(Direction),
    /// Last bit before the bus is released
    StopPrep,
    /// Bus released, transaction done. Left immediately for `Idle` or the next chained transfer.
    StopDone,
}

/// I2C transaction errors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum I2cError {
    /// A slave saw a transaction for some other address
    AddressMismatch,
    /// The other side NACKed. The contained value is the number of data bytes sent before the
    /// NACK, so 0 means the address was not acknowledged.
    UnexpectedNack(usize),
    /// A master asked for more bytes than the slave's transmit limit
    ProtocolOverrun,
    /// The bus stopped making progress
    Timeout,
    /// A transaction is already in progress
    Busy,
    /// Only a master can start transactions
    NotMaster,
}

/// Result of one transaction: the number of payload bytes moved, or what went wrong.
pub type Outcome = Result<usize, I2cError>;

/// Engine configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct I2cConfig {
    role: Role,
    own_address: u8,
    rx_limit: Option<usize>,
    tx_limit: Option<usize>,
}

impl I2cConfig {
    /// Slave answering to a 7-bit `address`. Bits above the 7th are ignored.
    pub const fn slave(address: u8) -> Self {
        I2cConfig {
            role: Role::Slave,
            own_address: address & 0x7F,
            rx_limit: None,
            tx_limit: None,
        }
    }

    /// Master
    pub const fn master() -> Self {
        I2cConfig {
            role: Role::Master,
            own_address: 0,
            rx_limit: None,
            tx_limit: None,
        }
    }

    /// Number of bytes a slave accepts per transaction. The last one is NACKed, after which the
    /// slave stops listening until the next start condition. With a limit of 0 the slave NACKs its
    /// own address for writes.
    pub const fn rx_limit(mut self, bytes: usize) -> Self {
        self.rx_limit = Some(bytes);
        self
    }

    /// Number of bytes a slave supplies per transaction. A master that ACKs past this gets
    /// [`I2cError::ProtocolOverrun`] reported on the slave side and the bus released. With a
    /// limit of 0 the slave NACKs its own address for reads.
    pub const fn tx_limit(mut self, bytes: usize) -> Self {
        self.tx_limit = Some(bytes);
        self
    }

    /// Configured role
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Own address of a slave
    #[inline]
    pub fn own_address(&self) -> u8 {
        self.own_address
    }
}

/// One master transfer: address phase followed by `len` data bytes in one direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transfer {
    address: u8,
    direction: Direction,
    len: usize,
    repeated_start: bool,
}

impl Transfer {
    /// Write `len` bytes to the 7-bit `address`. With `len == 0` only the address is sent, to check that a device answers.
    pub const fn write(address: u8, len: usize) -> Self {
        Transfer {
            address: address & 0x7F,
            direction: Direction::Transmit,
            len,
            repeated_start: false,
        }
    }

    /// Read `len` bytes from the 7-bit `address`. With `len == 0` this is the same address check
    /// as an empty write, since an addressed slave transmitter would already be driving SDA when
    /// the stop condition is due.
    pub const fn read(address: u8, len: usize) -> Self {
        if len == 0 {
            return Self::write(address, 0);
        }
        Transfer {
            address: address & 0x7F,
            direction: Direction::Receive,
            len,
            repeated_start: false,
        }
    }

    /// Keep the bus after this transfer, so the next one starts with a repeated start instead of
    /// a stop followed by a start.
    pub const fn with_repeated_start(mut self) -> Self {
        self.repeated_start = true;
        self
    }

    /// Target address
    #[inline]
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Number of data bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this is an address-only transfer
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    fn frame(&self) -> u8 {
        let rw = match self.direction {
            Direction::Transmit => 0,
            Direction::Receive => 1,
        };
        (self.address << 1) | rw
    }
}

/// I2C master/slave state machine on top of a [`UsiBus`], moving bytes to and from a [`Handler`].
pub struct I2cEngine<BUS: UsiBus, H: Handler> {
    bus: BUS,
    handler: H,
    config: I2cConfig,
    state: State,
    transfer: Transfer,
    next: Option<Transfer>,
    direction: Direction,
    matched: bool,
    byte_count: usize,
    total: usize,
    error: Option<I2cError>,
    last: Option<Outcome>,
}

impl<BUS: UsiBus, H: Handler> I2cEngine<BUS, H> {
    /// Create an engine and configure the bus for its role.
    pub fn new(bus: BUS, config: I2cConfig, handler: H) -> Self {
        let mut engine = Self::resume(bus, config, handler);
        engine.reset();
        engine
    }

    /// Create an idle engine on a bus that is already configured for `config`'s role.
    pub(crate) fn resume(bus: BUS, config: I2cConfig, handler: H) -> Self {
        I2cEngine {
            bus,
            handler,
            config,
            state: State::Idle,
            transfer: Transfer::write(0, 0),
            next: None,
            direction: Direction::Receive,
            matched: false,
            byte_count: 0,
            total: 0,
            error: None,
            last: None,
        }
    }

    /// Install a new configuration and reconfigure the bus. Does nothing while a transaction is
    /// in progress.
    pub fn initialize(&mut self, config: I2cConfig) -> Result<(), I2cError> {
        if self.state != State::Idle {
            warn!("initialize ignored, transaction in progress");
            return Err(I2cError::Busy);
        }
        self.config = config;
        self.reset();
        Ok(())
    }

    /// Abandon whatever is in progress, reconfigure the bus and go back to `Idle`.
    pub fn reset(&mut self) {
        self.bus.configure(self.config.role);
        self.next = None;
        self.matched = false;
        self.byte_count = 0;
        self.total = 0;
        self.error = None;
        self.enter(State::Idle);
    }

    /// Current state
    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    /// Configured role
    #[inline]
    pub fn role(&self) -> Role {
        self.config.role
    }

    /// Configuration in use
    #[inline]
    pub fn config(&self) -> I2cConfig {
        self.config
    }

    /// Payload bytes moved so far in the current transfer
    #[inline]
    pub fn byte_count(&self) -> usize {
        self.byte_count
    }

    /// Outcome of the most recently finished transaction
    #[inline]
    pub fn last_outcome(&self) -> Option<Outcome> {
        self.last
    }

    /// Byte handler
    #[inline]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Byte handler, mutably. Only safe to use on the bus side between transactions.
    #[inline]
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Release the bus and the handler
    pub fn free(self) -> (BUS, H) {
        (self.bus, self.handler)
    }

    /// Start a master transfer. The engine must be an idle master.
    pub fn begin(&mut self, transfer: Transfer) -> Result<(), I2cError> {
        if self.config.role != Role::Master {
            return Err(I2cError::NotMaster);
        }
        if self.state != State::Idle {
            return Err(I2cError::Busy);
        }
        self.next = None;
        self.total = 0;
        self.start(transfer);
        Ok(())
    }

    /// Start `first`, then switch to `second` with a repeated start. The outcome covers both and
    /// counts the bytes of both.
    pub fn begin_with_restart(&mut self, first: Transfer, second: Transfer) -> Result<(), I2cError> {
        self.begin(first.with_repeated_start())?;
        self.next = Some(second);
        Ok(())
    }

    /// Handle the pending bus event, if any. A start condition takes precedence over a finished
    /// shift. Call this from the USI interrupt.
    pub fn service(&mut self) -> Option<Outcome> {
        if self.bus.start_detected() {
            self.on_start_detected()
        } else if self.bus.shift_complete() {
            self.on_shift_complete()
        } else {
            None
        }
    }

    /// Start condition seen by a slave. Whatever transaction was running is finished first and
    /// its outcome returned, since the USI cannot see the stop condition that ended it.
    pub fn on_start_detected(&mut self) -> Option<Outcome> {
        if self.config.role != Role::Slave {
            self.bus.clear_start();
            return None;
        }

        let previous = match self.state {
            State::Idle => None,
            _ => self.finish(),
        };

        self.error = None;
        self.total = 0;
        self.enter(State::AddressPhase);
        // Flags are cleared only once the address receive is armed
        self.bus.clear_start();
        self.bus.clear_shift_complete();
        previous
    }

    /// The armed bits have been shifted. Returns the outcome once a transaction is over.
    pub fn on_shift_complete(&mut self) -> Option<Outcome> {
        let next = self.transition();
        trace!("i2c {} -> {}", self.state, next);
        let outcome = self.enter(next);
        self.bus.clear_shift_complete();
        outcome
    }

    fn transition(&mut self) -> State {
        use State::*;

        match (self.config.role, self.state) {
            (_, Idle) => Idle,

            (Role::Slave, AddressPhase) => {
                let frame = self.bus.read_shift();
                self.direction = if frame.check(0) != 0 {
                    Direction::Transmit
                } else {
                    Direction::Receive
                };
                self.matched = frame >> 1 == self.config.own_address;
                if self.matched {
                    self.handler.on_start();
                } else {
                    self.error = Some(I2cError::AddressMismatch);
                }
                AddressAckPhase
            }
            (Role::Master, AddressPhase) => AddressAckPhase,

            (Role::Slave, AddressAckPhase) => {
                if self.accepts() {
                    DataPhase(self.direction)
                } else {
                    StopPrep
                }
            }
            (Role::Master, AddressAckPhase) => {
                if self.nacked() {
                    self.fail(I2cError::UnexpectedNack(0));
                    StopPrep
                } else if self.transfer.is_empty() {
                    StopPrep
                } else {
                    DataPhase(self.direction)
                }
            }

            (_, DataPhase(Direction::Receive)) => {
                let byte = self.bus.read_shift();
                self.handler.on_byte_received(byte);
                self.byte_count += 1;
                DataAckPhase(Direction::Receive)
            }
            (_, DataPhase(Direction::Transmit)) => {
                self.byte_count += 1;
                DataAckPhase(Direction::Transmit)
            }

            (_, DataAckPhase(Direction::Receive)) => {
                if self.wants_more() {
                    DataPhase(Direction::Receive)
                } else {
                    StopPrep
                }
            }
            (Role::Slave, DataAckPhase(Direction::Transmit)) => {
                if self.nacked() {
                    StopPrep
                } else if self.config.tx_limit.map_or(false, |limit| self.byte_count >= limit) {
                    self.fail(I2cError::ProtocolOverrun);
                    StopPrep
                } else {
                    DataPhase(Direction::Transmit)
                }
            }
            (Role::Master, DataAckPhase(Direction::Transmit)) => {
                if self.nacked() {
                    self.fail(I2cError::UnexpectedNack(self.byte_count));
                    StopPrep
                } else if self.byte_count < self.transfer.len {
                    DataPhase(Direction::Transmit)
                } else {
                    StopPrep
                }
            }

            (_, StopPrep) => StopDone,
            (_, StopDone) => Idle,
        }
    }

    fn enter(&mut self, state: State) -> Option<Outcome> {
        use State::*;

        self.state = state;
        match (self.config.role, state) {
            (_, Idle) => self.bus.set_output_enable(false),

            (Role::Slave, AddressPhase) => {
                self.bus.set_output_enable(false);
                self.bus.arm(8);
            }
            (Role::Master, AddressPhase) => {
                // SDA falls while SCL is high
                self.bus.write_shift(0x00);
                self.bus.set_output_enable(true);
                self.bus.pulse_latch();
                self.bus.write_shift(self.transfer.frame());
                self.bus.arm(8);
            }

            (Role::Slave, AddressAckPhase) => {
                self.bus.set_output_enable(true);
                self.bus.write_shift(if self.accepts() { ACK } else { NACK });
                self.bus.arm(1);
            }
            (Role::Master, AddressAckPhase) => {
                self.bus.set_output_enable(false);
                self.bus.arm(1);
            }

            (_, DataPhase(Direction::Receive)) => {
                self.bus.set_output_enable(false);
                self.bus.arm(8);
            }
            (_, DataPhase(Direction::Transmit)) => {
                let byte = self.handler.on_byte_requested();
                self.bus.set_output_enable(true);
                self.bus.write_shift(byte);
                self.bus.arm(8);
            }

            (_, DataAckPhase(Direction::Receive)) => {
                let ack = if self.wants_more() { ACK } else { NACK };
                self.bus.set_output_enable(true);
                self.bus.write_shift(ack);
                self.bus.arm(1);
            }
            (_, DataAckPhase(Direction::Transmit)) => {
                self.bus.set_output_enable(false);
                self.bus.arm(1);
            }

            (Role::Master, StopPrep) => {
                // Holding SDA high through this bit skips the stop condition
                let hold = self.transfer.repeated_start && self.error.is_none();
                self.bus.set_output_enable(true);
                self.bus.write_shift(if hold { 0xFF } else { 0x00 });
                self.bus.arm(1);
            }
            (Role::Slave, StopPrep) => {
                self.bus.set_output_enable(false);
                self.bus.arm(1);
            }

            (Role::Master, StopDone) => {
                // SDA rises while SCL is high
                self.bus.write_shift(0xFF);
                self.bus.pulse_latch();
                self.bus.set_output_enable(false);
                return self.finish();
            }
            (Role::Slave, StopDone) => {
                self.bus.set_output_enable(false);
                return self.finish();
            }
        }
        None
    }

    fn start(&mut self, transfer: Transfer) {
        self.transfer = transfer;
        self.direction = transfer.direction;
        self.byte_count = 0;
        self.error = None;
        self.handler.on_start();
        self.enter(State::AddressPhase);
    }

    fn finish(&mut self) -> Option<Outcome> {
        self.total += self.byte_count;
        self.byte_count = 0;
        self.matched = false;

        let outcome = match self.error.take() {
            Some(err) => Err(err),
            None => Ok(self.total),
        };

        if outcome.is_ok() {
            if let Some(next) = self.next.take() {
                self.start(next);
                return None;
            }
        }

        debug!("i2c transaction done: {}", outcome);
        self.next = None;
        self.total = 0;
        self.enter(State::Idle);
        self.last = Some(outcome);
        Some(outcome)
    }

    #[inline(always)]
    fn nacked(&mut self) -> bool {
        self.bus.read_shift().check(0) != 0
    }

    // Addressed, and allowed at least one byte in this direction
    #[inline(always)]
    fn accepts(&self) -> bool {
        let limit = match self.direction {
            Direction::Receive => self.config.rx_limit,
            Direction::Transmit => self.config.tx_limit,
        };
        self.matched && limit != Some(0)
    }

    #[inline(always)]
    fn wants_more(&self) -> bool {
        match self.config.role {
            Role::Master => self.byte_count < self.transfer.len,
            Role::Slave => self.config.rx_limit.map_or(true, |limit| self.byte_count < limit),
        }
    }

    #[inline(always)]
    fn fail(&mut self, err: I2cError) {
        warn!("i2c error: {}", err);
        self.error = Some(err);
    }

    #[cfg(test)]
    pub(crate) fn bus_mut(&mut self) -> &mut BUS {
        &mut self.bus
    }
}

mod ehal1 {
    use super::I2cError;
    use embedded_hal::i2c::{Error, ErrorKind, NoAcknowledgeSource};

    impl Error for I2cError {
        fn kind(&self) -> ErrorKind {
            match self {
                I2cError::UnexpectedNack(0) => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
                I2cError::UnexpectedNack(_) => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data),
                I2cError::ProtocolOverrun => ErrorKind::Overrun,
                _ => ErrorKind::Other,
            }
        }
    }
}
