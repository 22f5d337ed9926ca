//! Peripheral models: GPIO banks and UART0.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use lex_common::flags::UartConf;
use lex_common::mmio::{GPIO_IDATA, GPIO_INT_CONF, GPIO_MODE, GPIO_ODATA, UART_CONF, UART_DATA};

/// Selects one of the three GPIO banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioPort {
    A,
    B,
    C,
}

impl GpioPort {
    pub const ALL: [GpioPort; 3] = [GpioPort::A, GpioPort::B, GpioPort::C];

    pub(crate) const fn index(self) -> usize {
        match self {
            GpioPort::A => 0,
            GpioPort::B => 1,
            GpioPort::C => 2,
        }
    }
}

/// A GPIO bank. `IDATA` is driven from outside through [`GpioBank::drive`];
/// stores to it are ignored.
#[derive(Default)]
pub struct GpioBank {
    mode: Cell<u32>,
    idata: Cell<u32>,
    odata: Cell<u32>,
    int_conf: Cell<u32>,
}

impl GpioBank {
    pub fn drive(&self, inputs: u32) {
        self.idata.set(inputs);
    }

    pub fn mode(&self) -> u32 {
        self.mode.get()
    }

    /// Output latch, masked to the pins configured as outputs.
    pub fn outputs(&self) -> u32 {
        self.odata.get() & self.mode.get()
    }

    pub(crate) fn load(&self, offset: usize) -> Option<u32> {
        match offset {
            GPIO_MODE => Some(self.mode.get()),
            GPIO_IDATA => Some(self.idata.get()),
            GPIO_ODATA => Some(self.odata.get()),
            GPIO_INT_CONF => Some(self.int_conf.get()),
            _ => None,
        }
    }

    pub(crate) fn store(&self, offset: usize, value: u32) -> bool {
        match offset {
            GPIO_MODE => self.mode.set(value),
            GPIO_IDATA => {}
            GPIO_ODATA => self.odata.set(value),
            GPIO_INT_CONF => self.int_conf.set(value),
            _ => return false,
        }
        true
    }
}

/// UART0 with an unbounded transmit log and a receive queue.
///
/// Transmission is instantaneous, so `TX_FULL` is never raised and
/// `TX_EMPTY` always reads set.
#[derive(Default)]
pub struct UartDevice {
    conf: Cell<u32>,
    sent: RefCell<Vec<u8>>,
    pending: RefCell<VecDeque<u8>>,
}

impl UartDevice {
    const CONFIG_BITS: UartConf = UartConf::RX_INT
        .union(UartConf::TX_INT)
        .union(UartConf::DBG)
        .union(UartConf::RST);

    /// Queues bytes for the firmware to receive.
    pub fn feed(&self, bytes: &[u8]) {
        self.pending.borrow_mut().extend(bytes.iter().copied());
    }

    /// Every byte transmitted so far.
    pub fn sent(&self) -> Vec<u8> {
        self.sent.borrow().clone()
    }

    pub fn take_sent(&self) -> Vec<u8> {
        std::mem::take(&mut *self.sent.borrow_mut())
    }

    fn status(&self) -> UartConf {
        let mut status = UartConf::from_bits_retain(self.conf.get()) | UartConf::TX_EMPTY;
        if self.pending.borrow().is_empty() {
            status |= UartConf::RX_EMPTY;
        }
        status
    }

    pub(crate) fn load(&self, offset: usize) -> Option<u32> {
        match offset {
            UART_DATA => Some(u32::from(self.pending.borrow_mut().pop_front().unwrap_or(0))),
            UART_CONF => Some(self.status().bits()),
            _ => None,
        }
    }

    pub(crate) fn store(&self, offset: usize, value: u32) -> bool {
        match offset {
            UART_DATA => self.sent.borrow_mut().push(value as u8),
            UART_CONF => {
                let conf = UartConf::from_bits_retain(value) & Self::CONFIG_BITS;
                if conf.contains(UartConf::RST) {
                    self.pending.borrow_mut().clear();
                }
                self.conf.set(conf.bits());
            }
            _ => return false,
        }
        true
    }
}
