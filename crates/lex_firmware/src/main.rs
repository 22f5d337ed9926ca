#![no_std]
#![no_main]

use core::arch::global_asm;
use core::cell::UnsafeCell;

use lex_common::mmio::MemoryMap;
#[cfg(feature = "blink")]
use lex_core::app::Blink;
#[cfg(not(feature = "blink"))]
use lex_core::app::{MIRROR_PINS, Mirror};
use lex_core::counters::HartInfo;
use lex_core::hart::Hart;
use lex_core::timer::{TickCounter, Timer};
use lex_core::trap::{TrapController, TrapDispatcher};
use panic_halt as _;

mod console;
mod trap;

global_asm!(include_str!("entry.S"));

/// Blink period of the LED on GPIOA pin 0.
#[cfg(feature = "blink")]
const BLINK_PERIOD_MS: u32 = 1_000;

pub static HART: Hart = unsafe { Hart::new() };
pub static TICKS: TickCounter = TickCounter::new();
pub static TIMER: Timer<'static, Hart> = Timer::new(&HART, MemoryMap::LEXINGTON, &TICKS);

struct GlobalCell<T>(UnsafeCell<T>);
unsafe impl<T> Sync for GlobalCell<T> {}

impl<T> GlobalCell<T> {
    const fn new(val: T) -> Self {
        Self(UnsafeCell::new(val))
    }

    #[allow(clippy::mut_from_ref)]
    unsafe fn get_mut(&self) -> &mut T {
        unsafe { &mut *self.0.get() }
    }

    unsafe fn get(&self) -> &T {
        unsafe { &*self.0.get() }
    }
}

/// Written once in `kmain` before interrupts are enabled, read only by the
/// trap handler afterwards.
static DISPATCHER: GlobalCell<TrapDispatcher<'static>> = GlobalCell::new(TrapDispatcher::new());

unsafe extern "C" {
    #[cfg(not(feature = "vectored"))]
    fn _trap_vector();
    #[cfg(feature = "vectored")]
    fn _vector_table();
}

#[unsafe(no_mangle)]
pub extern "C" fn kmain() -> ! {
    let info = HartInfo::read(&HART);
    if info.hart_id != 0 {
        loop {
            unsafe { riscv::asm::wfi() };
        }
    }

    console::init();
    console::println!(
        "[BOOT] hart {} vendor {:#x} arch {:#x} impl {:#x}",
        info.hart_id,
        info.vendor_id,
        info.arch_id,
        info.impl_id
    );

    let traps = TrapController::new(&HART);
    #[cfg(feature = "vectored")]
    traps.set_vectored(_vector_table as usize as u32);
    #[cfg(not(feature = "vectored"))]
    traps.set_direct_base(_trap_vector as usize as u32);

    unsafe { DISPATCHER.get_mut().bind_timer(&TIMER) };
    TIMER.start();
    log::info!("timer running, mode {:?}", traps.mode());

    run()
}

#[cfg(feature = "blink")]
fn run() -> ! {
    let blink = Blink::new(&HART, &MemoryMap::LEXINGTON, &TIMER, 0, BLINK_PERIOD_MS);
    blink.setup();
    loop {
        blink.step();
    }
}

#[cfg(not(feature = "blink"))]
fn run() -> ! {
    let mirror = Mirror::new(&HART, &MemoryMap::LEXINGTON, MIRROR_PINS);
    mirror.setup();
    loop {
        mirror.step();
    }
}
