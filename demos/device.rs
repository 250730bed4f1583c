//! Interrupt vectors of the MSP430G2xx2, for use with `msp430-rt`'s `device` feature.
//!
//! `#[interrupt] fn USI()` in a demo overrides the matching entry, everything else falls back to
//! `DefaultHandler` through `device.x`.

pub use msp430_rt::interrupt;

#[doc(hidden)]
pub union Vector {
    _handler: unsafe extern "msp430-interrupt" fn(),
    _reserved: u16,
}

extern "msp430-interrupt" {
    fn PORT1();
    fn PORT2();
    fn USI();
    fn ADC10();
    fn TIMER0_A1();
    fn TIMER0_A0();
    fn WDT();
    fn COMPARATORA();
    fn NMI();
}

// 0xFFE0 to 0xFFFC, the reset vector is placed by msp430-rt
#[doc(hidden)]
#[link_section = ".vector_table.interrupts"]
#[no_mangle]
#[used]
pub static __INTERRUPTS: [Vector; 15] = [
    Vector { _reserved: 0 },
    Vector { _reserved: 0 },
    Vector { _handler: PORT1 },
    Vector { _handler: PORT2 },
    Vector { _handler: USI },
    Vector { _handler: ADC10 },
    Vector { _reserved: 0 },
    Vector { _reserved: 0 },
    Vector { _handler: TIMER0_A1 },
    Vector { _handler: TIMER0_A0 },
    Vector { _handler: WDT },
    Vector { _handler: COMPARATORA },
    Vector { _reserved: 0 },
    Vector { _reserved: 0 },
    Vector { _handler: NMI },
];

/// Interrupt sources, named as the handlers must be
#[allow(non_camel_case_types, clippy::upper_case_acronyms, dead_code)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interrupt {
    PORT1 = 2,
    PORT2 = 3,
    USI = 4,
    ADC10 = 5,
    TIMER0_A1 = 8,
    TIMER0_A0 = 9,
    WDT = 10,
    COMPARATORA = 11,
    NMI = 14,
}

pub use self::Interrupt as interrupt;
