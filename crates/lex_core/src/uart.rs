//! Polled UART driver.

use core::fmt;

use lex_common::flags::UartConf;
use lex_common::mmio::{UART_CONF, UART_DATA};

use crate::reg::{MmioBus, Reg};

pub struct Uart<'a, B: MmioBus + ?Sized> {
    bus: &'a B,
    base: usize,
}

impl<'a, B: MmioBus + ?Sized> Uart<'a, B> {
    pub const fn new(bus: &'a B, base: usize) -> Self {
        Self { bus, base }
    }

    #[inline(always)]
    fn data(&self) -> Reg<'a, B> {
        Reg::new(self.bus, self.base + UART_DATA)
    }

    #[inline(always)]
    fn conf(&self) -> Reg<'a, B> {
        Reg::new(self.bus, self.base + UART_CONF)
    }

    /// Status and configuration flags.
    #[inline]
    pub fn status(&self) -> UartConf {
        UartConf::from_bits_retain(self.conf().load())
    }

    /// Sends one byte, waiting for room in the transmit FIFO.
    pub fn tx(&self, byte: u8) {
        while self.status().contains(UartConf::TX_FULL) {
            core::hint::spin_loop();
        }
        self.data().store(u32::from(byte));
    }

    /// Receives one byte, waiting until one is available.
    pub fn rx(&self) -> u8 {
        loop {
            if let Some(byte) = self.try_rx() {
                return byte;
            }
            core::hint::spin_loop();
        }
    }

    /// Receives one byte if the receive FIFO holds any.
    pub fn try_rx(&self) -> Option<u8> {
        if self.status().contains(UartConf::RX_EMPTY) {
            None
        } else {
            Some(self.data().load() as u8)
        }
    }

    /// Pulses the reset bit, flushing both FIFOs.
    pub fn reset(&self) {
        self.conf().set_bits(UartConf::RST.bits());
        self.conf().clear_bits(UartConf::RST.bits());
    }

    /// Enables the given interrupt conditions in `CONF`.
    pub fn enable_interrupts(&self, flags: UartConf) {
        self.conf()
            .set_bits((flags & (UartConf::RX_INT | UartConf::TX_INT)).bits());
    }

    pub fn disable_interrupts(&self, flags: UartConf) {
        self.conf()
            .clear_bits((flags & (UartConf::RX_INT | UartConf::TX_INT)).bits());
    }
}

impl<B: MmioBus + ?Sized> fmt::Write for Uart<'_, B> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.tx(b'\r');
            }
            self.tx(byte);
        }
        Ok(())
    }
}
