//! UART0 console and `log` backend.
//!
//! Output is written with interrupts masked so a line printed from the trap
//! handler never interleaves with one printed by the main loop.

use core::fmt::{self, Write};

use lex_common::mmio::MemoryMap;
use lex_core::hart::Hart;
use lex_core::trap::TrapController;
use lex_core::uart::Uart;
use log::{LevelFilter, Log, Metadata, Record};

use crate::HART;

fn uart0() -> Uart<'static, Hart> {
    Uart::new(&HART, MemoryMap::LEXINGTON.uart0)
}

pub fn _print(args: fmt::Arguments) {
    TrapController::new(&HART).free(|| {
        let _ = uart0().write_fmt(args);
    });
}

macro_rules! println {
    () => ($crate::console::_print(format_args!("\n")));
    ($($arg:tt)*) => ($crate::console::_print(format_args!("{}\n", format_args!($($arg)*))));
}
pub(crate) use println;

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            _print(format_args!("[{:5}] {}\n", record.level(), record.args()));
        }
    }

    fn flush(&self) {}
}

/// Resets UART0 and routes `log` records to it.
pub fn init() {
    uart0().reset();
    // Only fails if a logger is already installed, in which case keep it.
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
}
