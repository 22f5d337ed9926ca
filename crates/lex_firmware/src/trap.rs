//! Machine-mode trap entry.
//!
//! `_trap_vector` in `entry.S` saves the caller-saved registers and lands
//! here. The timer interrupt goes to the bound [`Timer`](lex_core::timer::Timer);
//! anything else is fatal, since nothing in this firmware can recover from it.

use lex_core::trap::{Dispatch, TrapCause, handle_trap};
use riscv::register::{mcause, mepc, mtval};

use crate::{DISPATCHER, HART, console};

#[unsafe(no_mangle)]
pub extern "C" fn rust_trap_handler() {
    let dispatcher = unsafe { DISPATCHER.get() };
    if let Dispatch::Unhandled(cause) = handle_trap(&HART, dispatcher) {
        fatal(cause);
    }
}

fn fatal(cause: TrapCause) -> ! {
    console::println!(
        "[TRAP] {} mcause={:#010x} mepc={:#010x} mtval={:#010x}",
        cause,
        mcause::read().bits(),
        mepc::read(),
        mtval::read()
    );
    loop {
        unsafe { riscv::asm::wfi() };
    }
}
