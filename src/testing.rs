//! Test doubles: in-memory register blocks, a scripted bus, a recording handler and a bit-level
//! simulation of a master and a slave sharing one open-drain bus.

use crate::bus::UsiBus;
use crate::handler::Handler;
use crate::hw_traits::{gpio::GpioPeriph, usi::UsiPeriph};
use crate::i2c::{I2cConfig, I2cEngine, Outcome, Role};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Default)]
pub struct FakeUsi {
    pub ctl0: Cell<u8>,
    pub ctl1: Cell<u8>,
    pub ckctl: Cell<u8>,
    pub cnt: Cell<u8>,
    pub srl: Cell<u8>,
    pub ge_pulses: Cell<u32>,
}

impl UsiPeriph for FakeUsi {
    fn ctl0_wr(&self, bits: u8) {
        self.ctl0.set(bits)
    }

    fn ctl0_set(&self, bits: u8) {
        if bits & 0x04 != 0 {
            self.ge_pulses.set(self.ge_pulses.get() + 1);
        }
        self.ctl0.set(self.ctl0.get() | bits)
    }

    fn ctl0_clear(&self, bits: u8) {
        self.ctl0.set(self.ctl0.get() & !bits)
    }

    fn ctl1_rd(&self) -> u8 {
        self.ctl1.get()
    }

    fn ctl1_wr(&self, bits: u8) {
        self.ctl1.set(bits)
    }

    fn ctl1_clear(&self, bits: u8) {
        self.ctl1.set(self.ctl1.get() & !bits)
    }

    fn ckctl_wr(&self, bits: u8) {
        self.ckctl.set(bits)
    }

    fn cnt_rd(&self) -> u8 {
        self.cnt.get()
    }

    fn cnt_wr(&self, bits: u8) {
        self.cnt.set(bits)
    }

    fn cnt_set(&self, bits: u8) {
        self.cnt.set(self.cnt.get() | bits)
    }

    fn srl_rd(&self) -> u8 {
        self.srl.get()
    }

    fn srl_wr(&self, bits: u8) {
        self.srl.set(bits)
    }
}

#[derive(Default)]
pub struct FakePort {
    pub out: Cell<u8>,
    pub dir: Cell<u8>,
    pub ren: Cell<u8>,
}

impl GpioPeriph for FakePort {
    fn pxout_set(&self, bits: u8) {
        self.out.set(self.out.get() | bits)
    }

    fn pxout_clear(&self, bits: u8) {
        self.out.set(self.out.get() & !bits)
    }

    fn pxdir_set(&self, bits: u8) {
        self.dir.set(self.dir.get() | bits)
    }

    fn pxdir_clear(&self, bits: u8) {
        self.dir.set(self.dir.get() & !bits)
    }

    fn pxren_set(&self, bits: u8) {
        self.ren.set(self.ren.get() | bits)
    }

    fn pxren_clear(&self, bits: u8) {
        self.ren.set(self.ren.get() & !bits)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusOp {
    Configure(Role),
    Output(bool),
    Write(u8),
    Arm(u8),
    Latch,
    ClearStart,
    ClearShift,
}

/// Bus whose flags and shift register are set by the test
#[derive(Default)]
pub struct MockBus {
    pub ops: Vec<BusOp>,
    pub shift: u8,
    pub start: bool,
    pub shifted: bool,
    pub output: bool,
    pub armed: u8,
}

impl MockBus {
    /// Pretend the armed bits were clocked and left `byte` in the shift register
    pub fn feed(&mut self, byte: u8) {
        self.shift = byte;
        self.shifted = true;
    }

    pub fn last_write(&self) -> Option<u8> {
        self.ops.iter().rev().find_map(|op| match op {
            BusOp::Write(byte) => Some(*byte),
            _ => None,
        })
    }

    pub fn take_ops(&mut self) -> Vec<BusOp> {
        std::mem::take(&mut self.ops)
    }
}

impl UsiBus for MockBus {
    fn configure(&mut self, role: Role) {
        self.ops.push(BusOp::Configure(role));
        self.shifted = false;
    }

    fn set_output_enable(&mut self, enabled: bool) {
        self.ops.push(BusOp::Output(enabled));
        self.output = enabled;
    }

    fn write_shift(&mut self, byte: u8) {
        self.ops.push(BusOp::Write(byte));
        self.shift = byte;
    }

    fn read_shift(&mut self) -> u8 {
        self.shift
    }

    fn arm(&mut self, bits: u8) {
        self.ops.push(BusOp::Arm(bits));
        self.armed = bits;
    }

    fn pulse_latch(&mut self) {
        self.ops.push(BusOp::Latch);
    }

    fn start_detected(&mut self) -> bool {
        self.start
    }

    fn clear_start(&mut self) {
        self.ops.push(BusOp::ClearStart);
        self.start = false;
    }

    fn shift_complete(&mut self) -> bool {
        self.shifted
    }

    fn clear_shift_complete(&mut self) {
        self.ops.push(BusOp::ClearShift);
        self.shifted = false;
    }
}

/// Bus that completes every armed shift on the next poll. Acknowledge bits sampled with the
/// output released come from `acks` (ACK once it runs out), received data bytes read as `data`.
#[derive(Default)]
pub struct ScriptedBus {
    pub acks: VecDeque<bool>,
    pub data: u8,
    pub frames: Vec<u8>,
    shift: u8,
    output: bool,
    armed: u8,
    shifted: bool,
}

impl ScriptedBus {
    pub fn with_acks(acks: impl IntoIterator<Item = bool>) -> Self {
        ScriptedBus {
            acks: acks.into_iter().collect(),
            ..ScriptedBus::default()
        }
    }
}

impl UsiBus for ScriptedBus {
    fn configure(&mut self, _role: Role) {
        self.armed = 0;
        self.shifted = false;
    }

    fn set_output_enable(&mut self, enabled: bool) {
        self.output = enabled;
    }

    fn write_shift(&mut self, byte: u8) {
        self.shift = byte;
    }

    fn read_shift(&mut self) -> u8 {
        self.shift
    }

    fn arm(&mut self, bits: u8) {
        if bits == 8 && self.output {
            self.frames.push(self.shift);
        }
        self.armed = bits;
    }

    fn pulse_latch(&mut self) {}

    fn start_detected(&mut self) -> bool {
        false
    }

    fn clear_start(&mut self) {}

    fn shift_complete(&mut self) -> bool {
        if self.armed > 0 {
            if !self.output {
                self.shift = match self.armed {
                    1 => {
                        if self.acks.pop_front().unwrap_or(true) {
                            0x00
                        } else {
                            0xFF
                        }
                    }
                    _ => self.data,
                };
            }
            self.armed = 0;
            self.shifted = true;
        }
        self.shifted
    }

    fn clear_shift_complete(&mut self) {
        self.shifted = false;
    }
}

/// Handler that records every callback
#[derive(Default)]
pub struct Recorder {
    pub starts: usize,
    pub received: Vec<u8>,
    pub to_send: VecDeque<u8>,
    pub requested: usize,
}

impl Handler for Recorder {
    fn on_start(&mut self) {
        self.starts += 1;
    }

    fn on_byte_received(&mut self, byte: u8) {
        self.received.push(byte);
    }

    fn on_byte_requested(&mut self) -> u8 {
        self.requested += 1;
        self.to_send.pop_front().unwrap_or(0xFF)
    }
}

/// Shift register and flags of one USI on the simulated bus
#[derive(Default)]
pub struct Port {
    pub role: Option<Role>,
    pub srl: u8,
    pub output: bool,
    pub count: u8,
    pub ifg: bool,
    pub start: bool,
}

impl Port {
    // Open drain: a released output reads as high
    fn drives_low(&self) -> bool {
        self.output && self.srl & 0x80 == 0
    }
}

#[derive(Default)]
pub struct Wire {
    pub master: Port,
    pub slave: Port,
    pub sda_low: bool,
    pub stops: usize,
}

impl Wire {
    fn port(&mut self, side: Side) -> &mut Port {
        match side {
            Side::Master => &mut self.master,
            Side::Slave => &mut self.slave,
        }
    }

    fn clock(&mut self) {
        let high = !self.master.drives_low() && !self.slave.drives_low();
        for port in [&mut self.master, &mut self.slave] {
            if port.count > 0 {
                port.srl = (port.srl << 1) | high as u8;
                port.count -= 1;
                if port.count == 0 {
                    port.ifg = true;
                }
            }
        }
        self.sda_low = !high;
    }

    fn latch(&mut self, side: Side) {
        let low = self.port(side).drives_low() || self.port(side.other()).drives_low();
        if side == Side::Master {
            if low && !self.sda_low && self.slave.role == Some(Role::Slave) {
                self.slave.start = true;
            } else if !low && self.sda_low {
                self.stops += 1;
            }
        }
        self.sda_low = low;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Master,
    Slave,
}

impl Side {
    fn other(self) -> Side {
        match self {
            Side::Master => Side::Slave,
            Side::Slave => Side::Master,
        }
    }
}

/// One side of the simulated bus. The master side runs the simulation: whenever the master polls
/// its shift flag, bits are clocked and the slave's interrupt is serviced until the master has
/// something to do.
pub struct SimBus {
    wire: Rc<RefCell<Wire>>,
    side: Side,
    isr: Option<Box<dyn FnMut()>>,
}

impl SimBus {
    fn settle(&mut self) {
        loop {
            let (slave_pending, master_ifg, master_count) = {
                let wire = self.wire.borrow();
                (wire.slave.start || wire.slave.ifg, wire.master.ifg, wire.master.count)
            };
            if slave_pending {
                if let Some(isr) = self.isr.as_mut() {
                    isr();
                    continue;
                }
            }
            if master_ifg || master_count == 0 {
                return;
            }
            self.wire.borrow_mut().clock();
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut Port) -> R) -> R {
        f(self.wire.borrow_mut().port(self.side))
    }
}

impl UsiBus for SimBus {
    fn configure(&mut self, role: Role) {
        self.with(|port| {
            *port = Port {
                role: Some(role),
                ..Port::default()
            }
        });
    }

    fn set_output_enable(&mut self, enabled: bool) {
        self.with(|port| port.output = enabled);
    }

    fn write_shift(&mut self, byte: u8) {
        self.with(|port| port.srl = byte);
    }

    fn read_shift(&mut self) -> u8 {
        self.with(|port| port.srl)
    }

    fn arm(&mut self, bits: u8) {
        self.with(|port| port.count = bits & 0x1F);
    }

    fn pulse_latch(&mut self) {
        self.wire.borrow_mut().latch(self.side);
    }

    fn start_detected(&mut self) -> bool {
        self.with(|port| port.start)
    }

    fn clear_start(&mut self) {
        self.with(|port| port.start = false);
    }

    fn shift_complete(&mut self) -> bool {
        if self.side == Side::Master {
            self.settle();
        }
        self.with(|port| port.ifg)
    }

    fn clear_shift_complete(&mut self) {
        self.with(|port| port.ifg = false);
    }
}

pub type SimSlave<H> = Rc<RefCell<I2cEngine<SimBus, H>>>;

/// A slave engine on a simulated bus, serviced as if from its interrupt
pub struct Sim<H: Handler> {
    pub wire: Rc<RefCell<Wire>>,
    pub slave: SimSlave<H>,
    pub outcomes: Rc<RefCell<Vec<Outcome>>>,
}

impl<H: Handler + 'static> Sim<H> {
    pub fn new(config: I2cConfig, handler: H) -> Self {
        let wire = Rc::new(RefCell::new(Wire::default()));
        let bus = SimBus {
            wire: wire.clone(),
            side: Side::Slave,
            isr: None,
        };
        Sim {
            slave: Rc::new(RefCell::new(I2cEngine::new(bus, config, handler))),
            wire,
            outcomes: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Master side of the bus, with the slave's interrupt wired up
    pub fn master_bus(&self) -> SimBus {
        let slave = self.slave.clone();
        let outcomes = self.outcomes.clone();
        SimBus {
            wire: self.wire.clone(),
            side: Side::Master,
            isr: Some(Box::new(move || {
                if let Some(outcome) = slave.borrow_mut().service() {
                    outcomes.borrow_mut().push(outcome);
                }
            })),
        }
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        self.outcomes.borrow().clone()
    }
}
