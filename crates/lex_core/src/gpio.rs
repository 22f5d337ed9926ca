//! GPIO bank driver.
//!
//! A bank is four words: `MODE` (1 = output), `IDATA`, `ODATA` and
//! `INT_CONF`. Per-pin updates are load/store sequences on `MODE` and
//! `ODATA`; the interrupt handler never touches a GPIO bank, so they cannot
//! be torn by preemption.

use lex_common::mmio::{GPIO_IDATA, GPIO_INT_CONF, GPIO_MODE, GPIO_ODATA};

use crate::reg::{MmioBus, Reg, bit};

/// Direction of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
}

/// Logic level of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    #[inline]
    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

impl core::ops::Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

/// One GPIO bank, 32 pins wide.
pub struct Gpio<'a, B: MmioBus + ?Sized> {
    bus: &'a B,
    base: usize,
}

impl<'a, B: MmioBus + ?Sized> Gpio<'a, B> {
    pub const fn new(bus: &'a B, base: usize) -> Self {
        Self { bus, base }
    }

    #[inline(always)]
    fn reg(&self, offset: usize) -> Reg<'a, B> {
        Reg::new(self.bus, self.base + offset)
    }

    /// Sets the direction of `pin`.
    pub fn mode(&self, pin: u32, mode: PinMode) {
        match mode {
            PinMode::Output => self.reg(GPIO_MODE).set_bits(bit(pin)),
            PinMode::Input => self.reg(GPIO_MODE).clear_bits(bit(pin)),
        }
    }

    /// Sets the direction of every pin in `mask`.
    pub fn mode_mask(&self, mask: u32, mode: PinMode) {
        match mode {
            PinMode::Output => self.reg(GPIO_MODE).set_bits(mask),
            PinMode::Input => self.reg(GPIO_MODE).clear_bits(mask),
        }
    }

    pub fn pin_mode(&self, pin: u32) -> PinMode {
        if self.reg(GPIO_MODE).test_bit(pin & 31) {
            PinMode::Output
        } else {
            PinMode::Input
        }
    }

    /// Samples the input level of `pin`.
    #[inline]
    pub fn read(&self, pin: u32) -> Level {
        Level::from(self.reg(GPIO_IDATA).test_bit(pin & 31))
    }

    /// Drives `pin` to `level`.
    #[inline]
    pub fn write(&self, pin: u32, level: Level) {
        match level {
            Level::High => self.reg(GPIO_ODATA).set_bits(bit(pin)),
            Level::Low => self.reg(GPIO_ODATA).clear_bits(bit(pin)),
        }
    }

    /// Inverts the driven level of `pin`.
    pub fn toggle(&self, pin: u32) {
        let odata = self.reg(GPIO_ODATA);
        odata.store(odata.load() ^ bit(pin));
    }

    /// Level currently driven on `pin`.
    pub fn output(&self, pin: u32) -> Level {
        Level::from(self.reg(GPIO_ODATA).test_bit(pin & 31))
    }

    /// Samples all 32 inputs at once.
    #[inline]
    pub fn read_all(&self) -> u32 {
        self.reg(GPIO_IDATA).load()
    }

    /// Drives all 32 outputs at once.
    #[inline]
    pub fn write_all(&self, value: u32) {
        self.reg(GPIO_ODATA).store(value);
    }

    /// Raw interrupt configuration word. Pin interrupts are not dispatched.
    pub fn interrupt_config(&self) -> u32 {
        self.reg(GPIO_INT_CONF).load()
    }
}
