//! Simulated Lexington microcontroller for host-side testing.
//!
//! Provides a software [`Machine`] implementing the register primitive layer
//! of `lex_core`, so the unmodified drivers, trap controller and timer can be
//! run and checked on the host. Interrupts are delivered at access
//! boundaries, which makes every preemption point of the real hart
//! reachable from a test.

use std::rc::Rc;

use lex_core::trap::{Dispatch, TrapController, TrapCause, TrapDispatcher, handle_trap};
use lex_core::timer::{TickCounter, Timer};

/// GPIO and UART peripheral models.
pub mod devices;

/// The simulated hart, its CSRs, the machine timer and the bus decoder.
pub mod machine;

pub use devices::GpioPort;
pub use machine::Machine;

/// Installs the firmware's trap path on `machine`: every trap goes through
/// [`handle_trap`] with a dispatcher whose timer slot drives `ticks`.
///
/// An unhandled interrupt has its source masked so that it is not taken
/// again; an unhandled exception is logged.
pub fn bind_timer(machine: &Machine, ticks: Rc<TickCounter>) {
    let map = machine.map();
    machine.set_trap_handler(move |m| {
        let timer = Timer::new(m, map, &ticks);
        let mut dispatcher = TrapDispatcher::new();
        dispatcher.bind_timer(&timer);
        match handle_trap(m, &dispatcher) {
            Dispatch::Handled => {}
            Dispatch::Unhandled(cause @ TrapCause::Interrupt(_)) => {
                log::warn!("sim: masking unhandled {cause}");
                TrapController::new(m).disable_source(cause.code());
            }
            Dispatch::Unhandled(cause) => log::error!("sim: unhandled {cause}"),
        }
    });
}
