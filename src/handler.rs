//! Byte sources and sinks for the protocol engine.
//!
//! The engine calls into a [`Handler`] from interrupt context, once per byte. Handlers must not
//! block. A few ready-made handlers cover the usual slave setups:
//!
//! * [`EchoBuffer`] sends back what was last written to it
//! * [`RegisterFile`] behaves like a small register-mapped device
//! * [`Incrementing`] sends a counting test pattern

/// Callbacks invoked by the [`I2cEngine`](crate::i2c::I2cEngine)
pub trait Handler {
    /// A transaction addressed to us has started. For a master this fires on every start,
    /// repeated ones included.
    fn on_start(&mut self) {}

    /// A byte has been received
    fn on_byte_received(&mut self, byte: u8);

    /// A byte is needed for transmission
    fn on_byte_requested(&mut self) -> u8;
}

impl<H: Handler + ?Sized> Handler for &mut H {
    #[inline(always)]
    fn on_start(&mut self) {
        (**self).on_start()
    }

    #[inline(always)]
    fn on_byte_received(&mut self, byte: u8) {
        (**self).on_byte_received(byte)
    }

    #[inline(always)]
    fn on_byte_requested(&mut self) -> u8 {
        (**self).on_byte_requested()
    }
}

/// Returns received bytes in the order they arrived. Once drained it keeps repeating the last byte
/// it received (0 if it never received one). When full, new bytes overwrite the oldest.
pub struct EchoBuffer<const N: usize> {
    buf: [u8; N],
    head: usize,
    len: usize,
    last: u8,
}

impl<const N: usize> EchoBuffer<N> {
    /// Empty buffer
    pub const fn new() -> Self {
        EchoBuffer {
            buf: [0; N],
            head: 0,
            len: 0,
            last: 0,
        }
    }

    /// Number of bytes waiting to be echoed
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing is waiting to be echoed
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<const N: usize> Default for EchoBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Handler for EchoBuffer<N> {
    fn on_byte_received(&mut self, byte: u8) {
        self.last = byte;
        if N == 0 {
            return;
        }
        let tail = (self.head + self.len) % N;
        self.buf[tail] = byte;
        if self.len == N {
            self.head = (self.head + 1) % N;
        } else {
            self.len += 1;
        }
    }

    fn on_byte_requested(&mut self) -> u8 {
        if self.len == 0 {
            return self.last;
        }
        let byte = self.buf[self.head];
        self.head = (self.head + 1) % N;
        self.len -= 1;
        byte
    }
}

/// Register-mapped device. The first byte written in a transaction selects the register index,
/// further written bytes are stored starting at that index and reads return registers starting at
/// that index, both wrapping around after the last register. The index carries over between
/// transactions, so a write of just the index followed by a read returns that register.
pub struct RegisterFile<const N: usize> {
    regs: [u8; N],
    index: usize,
    expect_index: bool,
}

impl<const N: usize> RegisterFile<N> {
    /// All registers zero, index 0
    pub const fn new() -> Self {
        Self::with_contents([0; N])
    }

    /// Preloaded registers
    pub const fn with_contents(regs: [u8; N]) -> Self {
        RegisterFile {
            regs,
            index: 0,
            expect_index: true,
        }
    }

    /// Register contents
    #[inline]
    pub fn registers(&self) -> &[u8; N] {
        &self.regs
    }

    /// Register contents, mutably. Only touch this outside of a transaction.
    #[inline]
    pub fn registers_mut(&mut self) -> &mut [u8; N] {
        &mut self.regs
    }

    /// Current register index
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline(always)]
    fn advance(&mut self) {
        self.index = (self.index + 1) % N;
    }
}

impl<const N: usize> Default for RegisterFile<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Handler for RegisterFile<N> {
    fn on_start(&mut self) {
        self.expect_index = true;
    }

    fn on_byte_received(&mut self, byte: u8) {
        if N == 0 {
            return;
        }
        if self.expect_index {
            self.index = byte as usize % N;
            self.expect_index = false;
        } else {
            self.regs[self.index] = byte;
            self.advance();
        }
    }

    fn on_byte_requested(&mut self) -> u8 {
        if N == 0 {
            return 0xFF;
        }
        let byte = self.regs[self.index];
        self.advance();
        byte
    }
}

/// Sends `seed, seed + 1, seed + 2, ...` and counts received bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Incrementing {
    next: u8,
    received: usize,
    last_received: Option<u8>,
}

impl Incrementing {
    /// Start the sequence at `seed`
    pub const fn new(seed: u8) -> Self {
        Incrementing {
            next: seed,
            received: 0,
            last_received: None,
        }
    }

    /// Next byte that will be sent
    #[inline]
    pub fn peek(&self) -> u8 {
        self.next
    }

    /// Bytes received so far
    #[inline]
    pub fn received(&self) -> usize {
        self.received
    }

    /// Most recently received byte
    #[inline]
    pub fn last_received(&self) -> Option<u8> {
        self.last_received
    }
}

impl Default for Incrementing {
    fn default() -> Self {
        Self::new(0x55)
    }
}

impl Handler for Incrementing {
    fn on_byte_received(&mut self, byte: u8) {
        self.received += 1;
        self.last_received = Some(byte);
    }

    fn on_byte_requested(&mut self) -> u8 {
        let byte = self.next;
        self.next = self.next.wrapping_add(1);
        byte
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_in_order() {
        let mut echo = EchoBuffer::<4>::new();
        assert_eq!(echo.on_byte_requested(), 0);
        for b in [1, 2, 3] {
            echo.on_byte_received(b);
        }
        assert_eq!(echo.len(), 3);
        assert_eq!(echo.on_byte_requested(), 1);
        assert_eq!(echo.on_byte_requested(), 2);
        assert_eq!(echo.on_byte_requested(), 3);
        assert!(echo.is_empty());
        // Drained, last byte repeats
        assert_eq!(echo.on_byte_requested(), 3);
        assert_eq!(echo.on_byte_requested(), 3);
    }

    #[test]
    fn echo_overwrites_oldest() {
        let mut echo = EchoBuffer::<2>::new();
        for b in [7, 8, 9] {
            echo.on_byte_received(b);
        }
        assert_eq!(echo.len(), 2);
        assert_eq!(echo.on_byte_requested(), 8);
        assert_eq!(echo.on_byte_requested(), 9);
    }

    #[test]
    fn zero_sized_echo_repeats_last() {
        let mut echo = EchoBuffer::<0>::new();
        echo.on_byte_received(0x42);
        assert_eq!(echo.on_byte_requested(), 0x42);
    }

    #[test]
    fn register_file_index_and_autoincrement() {
        let mut regs = RegisterFile::<4>::new();
        regs.on_start();
        for b in [2, 0xAA, 0xBB, 0xCC] {
            regs.on_byte_received(b);
        }
        assert_eq!(regs.registers(), &[0xCC, 0, 0xAA, 0xBB]);
        assert_eq!(regs.index(), 1);

        // Select register 2, then read across the wrap
        regs.on_start();
        regs.on_byte_received(2);
        regs.on_start();
        assert_eq!(regs.on_byte_requested(), 0xAA);
        assert_eq!(regs.on_byte_requested(), 0xBB);
        assert_eq!(regs.on_byte_requested(), 0xCC);
        assert_eq!(regs.on_byte_requested(), 0x00);
    }

    #[test]
    fn register_index_wraps() {
        let mut regs = RegisterFile::with_contents([1, 2, 3]);
        regs.on_start();
        regs.on_byte_received(4);
        assert_eq!(regs.index(), 1);
        assert_eq!(regs.on_byte_requested(), 2);
    }

    #[test]
    fn incrementing_pattern() {
        let mut inc = Incrementing::default();
        assert_eq!(inc.on_byte_requested(), 0x55);
        assert_eq!(inc.on_byte_requested(), 0x56);
        assert_eq!(inc.peek(), 0x57);

        let mut inc = Incrementing::new(0xFF);
        assert_eq!(inc.on_byte_requested(), 0xFF);
        assert_eq!(inc.on_byte_requested(), 0x00);
        inc.on_byte_received(9);
        assert_eq!(inc.received(), 1);
        assert_eq!(inc.last_received(), Some(9));
    }

    #[test]
    fn forwarding_through_reference() {
        fn exchange<H: Handler>(mut handler: H) -> u8 {
            handler.on_start();
            handler.on_byte_received(0);
            handler.on_byte_requested()
        }

        let mut inc = Incrementing::new(1);
        assert_eq!(exchange(&mut inc), 1);
        assert_eq!(inc.peek(), 2);
        assert_eq!(inc.received(), 1);
    }
}
