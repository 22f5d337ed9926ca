//! Demonstration applications shared by the firmware and the simulator.

use lex_common::mmio::MemoryMap;

use crate::gpio::{Gpio, Level, PinMode};
use crate::reg::{Bus, MmioBus};
use crate::timer::Timer;

/// Pins mirrored by the reference board demo.
pub const MIRROR_PINS: u32 = 16;

/// Mask with the low `pins` bits set.
pub const fn pin_mask(pins: u32) -> u32 {
    if pins >= 32 { u32::MAX } else { (1 << pins) - 1 }
}

/// Copies GPIOB inputs onto GPIOA outputs, pin by pin.
pub struct Mirror<'a, B: MmioBus + ?Sized> {
    input: Gpio<'a, B>,
    output: Gpio<'a, B>,
    pins: u32,
}

impl<'a, B: MmioBus + ?Sized> Mirror<'a, B> {
    pub const fn new(bus: &'a B, map: &MemoryMap, pins: u32) -> Self {
        Self {
            input: Gpio::new(bus, map.gpiob),
            output: Gpio::new(bus, map.gpioa),
            pins,
        }
    }

    /// Configures the mirrored pins: GPIOA as outputs, GPIOB as inputs.
    pub fn setup(&self) {
        let mask = pin_mask(self.pins);
        self.output.mode_mask(mask, PinMode::Output);
        self.input.mode_mask(mask, PinMode::Input);
    }

    /// One pass over every mirrored pin.
    pub fn step(&self) {
        for pin in 0..self.pins.min(32) {
            self.output.write(pin, self.input.read(pin));
        }
    }
}

/// Toggles one GPIOA pin with a fixed period.
pub struct Blink<'a, B: Bus + ?Sized> {
    gpio: Gpio<'a, B>,
    timer: &'a Timer<'a, B>,
    pin: u32,
    half_period_ms: u32,
}

impl<'a, B: Bus + ?Sized> Blink<'a, B> {
    pub const fn new(
        bus: &'a B,
        map: &MemoryMap,
        timer: &'a Timer<'a, B>,
        pin: u32,
        period_ms: u32,
    ) -> Self {
        Self {
            gpio: Gpio::new(bus, map.gpioa),
            timer,
            pin,
            half_period_ms: period_ms / 2,
        }
    }

    pub fn setup(&self) {
        self.gpio.mode(self.pin, PinMode::Output);
        self.gpio.write(self.pin, Level::Low);
    }

    /// Toggles the pin and waits half a period. Returns the new level.
    pub fn step(&self) -> Level {
        self.gpio.toggle(self.pin);
        let level = self.gpio.output(self.pin);
        log::info!("blink: {:?} at tick {}", level, self.timer.millis());
        self.timer.delay(self.half_period_ms);
        level
    }
}
