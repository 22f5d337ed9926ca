//! Runs the firmware demonstrations and the tick scenario on the simulator.

use std::rc::Rc;

use anyhow::{Result, ensure};
use lex_common::cause;
use lex_common::mmio::MemoryMap;
use lex_core::app::{Blink, Mirror, pin_mask};
use lex_core::timer::{TickCounter, Timer};
use lex_core::trap::TrapController;
use lex_io::loader;
use lex_sim::{GpioPort, Machine, bind_timer};

use crate::stats::SampleStats;

/// Replays a stimulus file through the mirror demo.
///
/// Every frame drives GPIOB for one pass of the demo loop; the resulting
/// GPIOA outputs are printed and compared against the masked inputs.
pub fn run_mirror(stimulus: &str, pins: usize, map: MemoryMap) -> Result<()> {
    let raw_bits = loader::load_b8_file(stimulus)?;
    let frames = loader::slice_frames(&raw_bits, pins)?;
    println!("Loaded {} frames of {} pins from {}", frames.len(), pins, stimulus);

    let machine = Machine::with_map(map);
    let mirror = Mirror::new(&machine, &map, pins as u32);
    mirror.setup();

    let mask = pin_mask(pins as u32);
    let mut mismatches = 0usize;
    for (i, &inputs) in frames.iter().enumerate() {
        machine.gpio(GpioPort::B).drive(inputs);
        mirror.step();
        let outputs = machine.gpio(GpioPort::A).outputs();
        if outputs != inputs & mask {
            mismatches += 1;
            log::warn!("frame {i}: expected {:#010x}, got {outputs:#010x}", inputs & mask);
        }
        println!("{i:6}: GPIOB {inputs:#010x} -> GPIOA {outputs:#010x}");
    }

    println!("Bus accesses: {}", machine.accesses());
    println!("Mismatches: {mismatches}/{}", frames.len());
    ensure!(mismatches == 0, "{mismatches} frames were not mirrored");
    Ok(())
}

/// Runs the blink demo for `toggles` half periods, printing the pin level
/// against the tick counter.
pub fn run_blink(period_ms: u32, toggles: u32, latency: u64, map: MemoryMap) -> Result<()> {
    ensure!(latency > 0, "a frozen counter never ends a delay");
    let machine = Machine::with_map(map);
    let ticks = Rc::new(TickCounter::new());
    bind_timer(&machine, ticks.clone());
    machine.set_ticks_per_access(latency);

    let timer = Timer::new(&machine, map, &ticks);
    timer.start();
    let blink = Blink::new(&machine, &map, &timer, 0, period_ms);
    blink.setup();

    for _ in 0..toggles {
        let level = blink.step();
        println!("tick {:8}: pin 0 {:?}", ticks.get(), level);
    }
    timer.stop();
    Ok(())
}

/// Outcome of the tick scenario.
pub struct TickReport {
    pub ticks: u32,
    pub elapsed: u64,
    pub drift: i64,
    pub overshoot: SampleStats,
}

/// Starts the timer and performs `ms` one-millisecond delays.
///
/// `latency` must be non-zero or the first delay never returns.
///
/// Returns the tick count, the counter ticks elapsed since `start`, how far
/// the compare register strayed from `first + ticks * 1000`, and the
/// overshoot of every delay.
pub fn tick_scenario(ms: u32, latency: u64, entry_latency: u64, map: MemoryMap) -> TickReport {
    let machine = Machine::with_map(map);
    let ticks = Rc::new(TickCounter::new());
    bind_timer(&machine, ticks.clone());

    let timer = Timer::new(&machine, map, &ticks);
    timer.start();
    let first = timer.compare();
    let origin = first - 1_000;
    machine.set_ticks_per_access(latency);
    machine.set_entry_latency(entry_latency);

    let mut overshoot = SampleStats::new(10);
    for _ in 0..ms {
        let before = machine.time();
        timer.delay(1);
        overshoot.update((machine.time() - before).saturating_sub(1_000));
    }

    // Take any match still pending with time frozen.
    machine.set_ticks_per_access(0);
    machine.set_entry_latency(0);
    let traps = TrapController::new(&machine);
    while traps.is_pending(cause::MTI) {}

    let ticks_now = ticks.get();
    let expected = first + u64::from(ticks_now) * 1_000;
    TickReport {
        ticks: ticks_now,
        elapsed: machine.time() - origin,
        drift: timer.compare() as i64 - expected as i64,
        overshoot,
    }
}

pub fn run_ticks(ms: u32, latency: u64, entry_latency: u64, map: MemoryMap) -> Result<()> {
    ensure!(latency > 0, "a frozen counter never ends a delay");
    println!(
        "Tick scenario: {ms} x delay(1), {latency} ticks/access, {entry_latency} ticks entry latency"
    );
    let report = tick_scenario(ms, latency, entry_latency, map);

    println!("Ticks:   {}", report.ticks);
    println!("Elapsed: {} us", report.elapsed);
    println!("Drift:   {} us", report.drift);
    report.overshoot.print_report("Delay overshoot", "us");

    ensure!(report.drift == 0, "compare register drifted by {}", report.drift);
    ensure!(
        u64::from(report.ticks) == report.elapsed / 1_000,
        "{} ticks counted over {} us",
        report.ticks,
        report.elapsed
    );
    Ok(())
}
