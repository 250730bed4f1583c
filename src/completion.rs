//! Completion signal from interrupt context to the main loop.
//!
//! The USI interrupt hands each finished [`Outcome`] to a [`Completion`], and the main loop picks
//! it up with [`poll`](Completion::poll) or waits for it with [`wait`](Completion::wait). There is
//! one writer and one waiter. An outcome that is never collected is overwritten by the next one.
//!
//! ```ignore
//! static DONE: Completion = Completion::new();
//!
//! loop {
//!     // Watchdog interval interrupts bound the number of wake-ups spent waiting
//!     let outcome = DONE.wait(Some(64), || lpm::enter_lpm0_unless(|| DONE.is_signaled()));
//!     match outcome {
//!         Ok(n) => { /* n bytes moved */ }
//!         Err(I2cError::Timeout) => { /* bus stuck, reset the engine */ }
//!         Err(_) => {}
//!     }
//! }
//! ```

use crate::i2c::{I2cError, Outcome};
use core::cell::Cell;
use core::convert::Infallible;
use critical_section::Mutex;

/// Single-slot outcome mailbox, usable from a `static`
pub struct Completion {
    outcome: Mutex<Cell<Option<Outcome>>>,
}

impl Completion {
    /// Empty mailbox
    pub const fn new() -> Self {
        Completion {
            outcome: Mutex::new(Cell::new(None)),
        }
    }

    /// Publish an outcome. Called from the interrupt that finished the transaction.
    pub fn signal(&self, outcome: Outcome) {
        critical_section::with(|cs| {
            if self.outcome.borrow(cs).replace(Some(outcome)).is_some() {
                warn!("previous outcome was never collected");
            }
        });
    }

    /// Take the outcome if there is one, otherwise `WouldBlock`
    pub fn poll(&self) -> nb::Result<Outcome, Infallible> {
        critical_section::with(|cs| self.outcome.borrow(cs).take()).ok_or(nb::Error::WouldBlock)
    }

    /// Whether an outcome is waiting, without taking it
    pub fn is_signaled(&self) -> bool {
        critical_section::with(|cs| self.outcome.borrow(cs).get().is_some())
    }

    /// Drop any outcome that is waiting
    pub fn clear(&self) {
        critical_section::with(|cs| self.outcome.borrow(cs).set(None));
    }

    /// Block until an outcome arrives. `idle` is called between checks, typically to sleep until
    /// the next interrupt. With `Some(limit)`, giving up after `limit` calls to `idle` yields
    /// [`I2cError::Timeout`].
    pub fn wait(&self, limit: Option<u32>, mut idle: impl FnMut()) -> Outcome {
        let mut idled = 0;
        loop {
            match self.poll() {
                Ok(outcome) => return outcome,
                Err(nb::Error::WouldBlock) => {}
                Err(nb::Error::Other(never)) => match never {},
            }
            if limit.map_or(false, |limit| idled >= limit) {
                debug!("completion wait timed out after {} idles", idled);
                return Err(I2cError::Timeout);
            }
            idle();
            idled += 1;
        }
    }
}

impl Default for Completion {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_consumes() {
        let done = Completion::new();
        assert_eq!(done.poll(), Err(nb::Error::WouldBlock));
        assert!(!done.is_signaled());

        done.signal(Ok(3));
        assert!(done.is_signaled());
        assert_eq!(done.poll(), Ok(Ok(3)));
        assert_eq!(done.poll(), Err(nb::Error::WouldBlock));
    }

    #[test]
    fn newer_outcome_wins() {
        let done = Completion::new();
        done.signal(Ok(1));
        done.signal(Err(I2cError::UnexpectedNack(0)));
        assert_eq!(done.poll(), Ok(Err(I2cError::UnexpectedNack(0))));
        done.signal(Ok(1));
        done.clear();
        assert!(!done.is_signaled());
    }

    #[test]
    fn wait_times_out() {
        let done = Completion::new();
        let mut idles = 0;
        assert_eq!(done.wait(Some(5), || idles += 1), Err(I2cError::Timeout));
        assert_eq!(idles, 5);

        let mut idles = 0;
        assert_eq!(done.wait(Some(0), || idles += 1), Err(I2cError::Timeout));
        assert_eq!(idles, 0);
    }

    #[test]
    fn wait_returns_signaled_outcome() {
        static DONE: Completion = Completion::new();
        let mut idles = 0;
        let outcome = DONE.wait(None, || {
            idles += 1;
            if idles == 3 {
                // Stands in for the interrupt
                DONE.signal(Ok(7));
            }
        });
        assert_eq!(outcome, Ok(7));
        assert_eq!(idles, 3);
    }

    #[test]
    fn already_signaled_never_idles() {
        let done = Completion::new();
        done.signal(Ok(0));
        assert_eq!(done.wait(Some(0), || panic!("idled")), Ok(0));
    }
}
