use std::rc::Rc;

use lex_common::cause;
use lex_core::reg::{Csr, CsrBus};
use lex_core::split::{CsrPair, read_split_counted};
use lex_core::timer::{TickCounter, Timer};
use lex_core::trap::TrapController;
use lex_sim::{Machine, bind_timer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn running(ticks_per_access: u64) -> (Machine, Rc<TickCounter>) {
    let m = Machine::new();
    let ticks = Rc::new(TickCounter::new());
    bind_timer(&m, ticks.clone());
    m.set_ticks_per_access(ticks_per_access);
    (m, ticks)
}

#[test]
fn composite_reads_never_decrease_across_rollover() {
    let mut rng = StdRng::seed_from_u64(0x1E8);
    for _ in 0..32 {
        let (m, ticks) = running(0);
        let timer = Timer::new(&m, m.map(), &ticks);
        timer.set_time(0xFFFF_F000 - rng.gen_range(0..0x800));
        m.set_ticks_per_access(rng.gen_range(1..64));

        let mut last = timer.now();
        while last < 0x1_0000_1000 {
            let now = timer.now();
            assert!(now >= last, "{now:#x} went back from {last:#x}");
            last = now;
        }
    }
}

#[test]
fn torn_bracket_is_retried() {
    let m = Machine::new();
    let timer_ticks = TickCounter::new();
    let timer = Timer::new(&m, m.map(), &timer_ticks);
    // The first low read lands exactly on the carry.
    timer.set_time(0xFFFF_FFFF - 1);
    m.set_ticks_per_access(1);
    let (value, retries) = read_split_counted(&CsrPair::new(&m, Csr::Time, Csr::Timeh));
    assert_eq!(retries, 1);
    assert_eq!(value, 0x1_0000_0003);
}

#[test]
fn composite_write_never_exposes_more_than_the_new_value() {
    let mut rng = StdRng::seed_from_u64(7);
    let m = Machine::new();
    let ticks = TickCounter::new();
    let timer = Timer::new(&m, m.map(), &ticks);
    for _ in 0..500 {
        let old: u64 = rng.r#gen();
        let new = old.saturating_add(rng.gen_range(0..1 << 40));
        timer.set_compare(old);
        m.clear_compare_trace();

        timer.set_compare(new);

        let trace = m.compare_trace();
        assert_eq!(trace.len(), 3);
        assert!(trace.iter().all(|&seen| seen <= new), "{trace:x?} > {new:#x}");
        assert_eq!(trace.last().copied(), Some(new));
        assert_eq!(timer.compare(), new);
    }
}

#[test]
fn frozen_counter_reads_back_exactly() {
    let m = Machine::new();
    let ticks = TickCounter::new();
    let timer = Timer::new(&m, m.map(), &ticks);
    timer.set_time(0xFFFF_FFFF_0000_0001);
    assert_eq!(timer.now(), 0xFFFF_FFFF_0000_0001);
    assert_eq!(m.time(), 0xFFFF_FFFF_0000_0001);
}

#[test]
fn five_milliseconds_give_five_ticks() {
    let (m, ticks) = running(0);
    let timer = Timer::new(&m, m.map(), &ticks);
    timer.set_time(12_345);
    timer.start();
    let first = timer.compare();
    assert_eq!(first, 12_345 + 1_000);

    m.advance(5_000);

    assert_eq!(ticks.get(), 5);
    assert_eq!(timer.compare(), first + 5_000);
    assert_eq!(m.traps_taken(), 5);
}

#[test]
fn ticks_freeze_while_interrupts_are_disabled() {
    let (m, ticks) = running(0);
    let timer = Timer::new(&m, m.map(), &ticks);
    let traps = TrapController::new(&m);
    timer.start();
    traps.disable();

    m.advance(5_000);
    assert_eq!(ticks.get(), 0);
    assert!(traps.is_pending(cause::MTI));

    traps.enable();
    // One match per access boundary until the schedule catches up.
    for _ in 0..10 {
        m.csr_read(Csr::Mscratch);
    }
    assert_eq!(ticks.get(), 5);
    assert_eq!(timer.compare(), 6_000);
    assert!(!traps.is_pending(cause::MTI));
}

#[test]
fn critical_section_defers_the_tick() {
    let (m, ticks) = running(0);
    let timer = Timer::new(&m, m.map(), &ticks);
    let traps = TrapController::new(&m);
    timer.start();
    let inside = traps.free(|| {
        m.advance(1_500);
        ticks.get()
    });
    assert_eq!(inside, 0);
    m.csr_read(Csr::Mscratch);
    assert_eq!(ticks.get(), 1);
}

#[test]
fn delays_last_at_least_the_requested_time() {
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..16 {
        let (m, ticks) = running(0);
        let timer = Timer::new(&m, m.map(), &ticks);
        timer.start();
        m.set_ticks_per_access(rng.gen_range(1..40));
        m.set_entry_latency(rng.gen_range(0..200));

        let ms = rng.gen_range(0..5);
        let before = m.time();
        timer.delay(ms);
        assert!(m.time() - before >= u64::from(ms) * 1_000);

        let us = rng.gen_range(0..2_000);
        let before = m.time();
        timer.delay_micro(us);
        assert!(m.time() - before >= u64::from(us));
    }
}

#[test]
fn delay_spanning_the_low_word_rollover() {
    let (m, ticks) = running(0);
    let timer = Timer::new(&m, m.map(), &ticks);
    timer.set_time(0xFFFF_FFFF - 500);
    m.set_ticks_per_access(3);
    timer.delay(2);
    assert!(m.time() >= 0xFFFF_FFFF - 500 + 2_000);
}

#[test]
fn handler_latency_does_not_drift_the_schedule() {
    let (m, ticks) = running(2);
    m.set_entry_latency(300);
    let timer = Timer::new(&m, m.map(), &ticks);
    timer.start();
    let first = timer.compare();

    m.advance(50_000);
    m.set_ticks_per_access(0);

    let n = u64::from(ticks.get());
    assert!(n >= 50);
    assert_eq!(timer.compare(), first + n * 1_000);
    assert!(timer.compare() > m.time());
    assert!(timer.compare() - 1_000 <= m.time());
}

#[test]
fn stop_halts_the_tick() {
    let (m, ticks) = running(0);
    let timer = Timer::new(&m, m.map(), &ticks);
    timer.start();
    m.advance(2_000);
    timer.stop();
    m.advance(10_000);
    assert_eq!(ticks.get(), 2);
    assert_eq!(m.compare(), u64::MAX);
    assert_eq!(timer.uptime_millis(), 12);
}

#[test]
fn counters_count_accesses() {
    let m = Machine::new();
    let before = lex_core::counters::instructions_retired(&m);
    m.csr_read(Csr::Mscratch);
    let after = lex_core::counters::instructions_retired(&m);
    // The Mscratch read plus the reads between the two samples.
    assert_eq!(after - before, 4);
    assert!(lex_core::counters::cycles(&m) >= after);
}
