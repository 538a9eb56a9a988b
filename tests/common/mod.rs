//! A simulated STMPE610 for driving the driver without hardware.
#![allow(dead_code)]

use embedded_hal::{
    delay::DelayNs,
    spi::{ErrorKind, ErrorType, Operation, SpiDevice},
};
use stmpe610::{
    registers::{FIFO_SIZE, FIFO_STA, FIFO_STA_RESET, TSC_DATA},
    RecoveryTimer, TouchEvent, TouchHandler,
};
use std::{cell::RefCell, collections::VecDeque, rc::Rc};

const NS_PER_MS: u64 = 1_000_000;

/// Register file, sample FIFO and clock of the simulated controller.
#[derive(Debug)]
pub struct Controller {
    pub registers: [u8; 256],
    pub fifo: VecDeque<[u8; 4]>,
    /// Bytes of the front FIFO entry already read out.
    cursor: usize,
    /// Samples that land in the FIFO once the clock reaches the given time.
    pub arriving: Vec<(u64, [u8; 4])>,
    pub elapsed_ns: u64,
    pub writes: Vec<(u8, u8)>,
    pub fail: bool,
}

impl Controller {
    fn new() -> Self {
        let mut registers = [0; 256];
        registers[0] = 0x08;
        registers[1] = 0x11;
        Self {
            registers,
            fifo: VecDeque::new(),
            cursor: 0,
            arriving: Vec::new(),
            elapsed_ns: 0,
            writes: Vec::new(),
            fail: false,
        }
    }

    fn read(&mut self, register: u8) -> u8 {
        match register {
            FIFO_SIZE => {
                self.deliver();
                self.fifo.len() as u8
            }
            TSC_DATA => match self.fifo.front() {
                Some(entry) => {
                    let byte = entry[self.cursor];
                    self.cursor += 1;
                    if self.cursor == entry.len() {
                        self.fifo.pop_front();
                        self.cursor = 0;
                    }
                    byte
                }
                None => 0,
            },
            _ => self.registers[usize::from(register)],
        }
    }

    fn write(&mut self, register: u8, value: u8) {
        self.writes.push((register, value));
        if register == FIFO_STA && value & FIFO_STA_RESET != 0 {
            self.fifo.clear();
            self.cursor = 0;
        }
        self.registers[usize::from(register)] = value;
    }

    fn deliver(&mut self) {
        let now = self.elapsed_ns;
        let (due, later): (Vec<_>, Vec<_>) = self.arriving.drain(..).partition(|(at, _)| *at <= now);
        self.arriving = later;
        self.fifo.extend(due.into_iter().map(|(_, entry)| entry));
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / NS_PER_MS
    }

    pub fn writes_to(&self, register: u8) -> Vec<u8> {
        self.writes
            .iter()
            .filter(|(r, _)| *r == register)
            .map(|(_, v)| *v)
            .collect()
    }
}

pub fn pack(x: u16, y: u16, z: u8) -> [u8; 4] {
    [
        (x >> 4) as u8,
        (((x & 0x0F) << 4) as u8) | ((y >> 8) as u8 & 0x0F),
        y as u8,
        z,
    ]
}

/// Handle on the simulated controller, shared by the SPI device and the
/// delay handed to the driver.
#[derive(Debug, Clone)]
pub struct Sim(Rc<RefCell<Controller>>);

impl Sim {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(Controller::new())))
    }

    pub fn spi(&self) -> FakeSpi {
        FakeSpi(self.0.clone())
    }

    pub fn delay(&self) -> FakeDelay {
        FakeDelay(self.0.clone())
    }

    pub fn controller(&self) -> std::cell::RefMut<'_, Controller> {
        self.0.borrow_mut()
    }

    /// Queues samples in the FIFO right away.
    pub fn push_samples(&self, samples: &[(u16, u16, u8)]) {
        let mut controller = self.controller();
        for &(x, y, z) in samples {
            controller.fifo.push_back(pack(x, y, z));
        }
    }

    /// Queues samples that reach the FIFO `after_ms` from now.
    pub fn push_samples_after(&self, after_ms: u64, samples: &[(u16, u16, u8)]) {
        let mut controller = self.controller();
        let at = controller.elapsed_ns + after_ms * NS_PER_MS;
        for &(x, y, z) in samples {
            controller.arriving.push((at, pack(x, y, z)));
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.controller().fail = fail;
    }

    pub fn clear_writes(&self) {
        self.controller().writes.clear();
    }
}

#[derive(Debug)]
pub struct FakeSpi(Rc<RefCell<Controller>>);

impl ErrorType for FakeSpi {
    type Error = ErrorKind;
}

impl SpiDevice<u8> for FakeSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut controller = self.0.borrow_mut();
        if controller.fail {
            return Err(ErrorKind::Other);
        }
        match operations {
            [Operation::Write(command), Operation::Read(response)]
                if command.len() == 1 && command[0] & 0x80 != 0 && response.len() == 1 =>
            {
                response[0] = controller.read(command[0] & 0x7F);
            }
            [Operation::Write(data)] if data.len() == 2 && data[0] & 0x80 == 0 => {
                controller.write(data[0], data[1]);
            }
            _ => panic!("unexpected SPI transaction"),
        }
        Ok(())
    }
}

/// Delay that advances the simulated clock instead of sleeping.
#[derive(Debug)]
pub struct FakeDelay(Rc<RefCell<Controller>>);

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().elapsed_ns += u64::from(ns);
    }
}

/// Records every requested recovery delay.
#[derive(Debug, Default)]
pub struct Timer {
    pub scheduled: Vec<u32>,
}

impl RecoveryTimer for Timer {
    fn schedule_once(&mut self, delay_ms: u32) {
        self.scheduled.push(delay_ms);
    }
}

/// Handler appending every event to a shared list.
#[derive(Debug, Clone, Default)]
pub struct Recorder(pub Rc<RefCell<Vec<TouchEvent>>>);

impl Recorder {
    pub fn events(&self) -> Vec<TouchEvent> {
        self.0.borrow().clone()
    }
}

impl TouchHandler for Recorder {
    fn on_touch(&mut self, event: &TouchEvent) {
        self.0.borrow_mut().push(*event);
    }
}
