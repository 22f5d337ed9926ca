//! Randomized torn-access checks run in parallel over seeds.
//!
//! Each seed builds its own simulated machine with a random access latency
//! and checks the composite read and write protocols and the tick schedule
//! against their invariants. A violation is any observation the protocols
//! are meant to rule out; a healthy build reports none.

use std::rc::Rc;
use std::time::Instant;

use anyhow::{Result, ensure};
use lex_common::cause;
use lex_core::reg::Csr;
use lex_core::split::{CsrPair, read_split_counted};
use lex_core::timer::{TickCounter, Timer};
use lex_core::trap::TrapController;
use lex_sim::{Machine, bind_timer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::stats::SampleStats;

/// Composite reads taken per seed.
const READS: usize = 2_000;

/// Composite writes taken per seed.
const WRITES: usize = 200;

pub struct SeedOutcome {
    pub violations: u64,
    pub retries: SampleStats,
}

impl SeedOutcome {
    fn empty() -> Self {
        Self {
            violations: 0,
            retries: SampleStats::new(1),
        }
    }

    fn merge(self, other: SeedOutcome) -> SeedOutcome {
        SeedOutcome {
            violations: self.violations + other.violations,
            retries: self.retries.merge(other.retries),
        }
    }
}

fn check_reads(rng: &mut StdRng, latency: u64, outcome: &mut SeedOutcome) {
    let machine = Machine::new();
    let ticks = TickCounter::new();
    let timer = Timer::new(&machine, machine.map(), &ticks);
    timer.set_time(rng.gen_range(0..u64::from(u32::MAX)) | 0xFFFF_0000);
    machine.set_ticks_per_access(latency);

    let pair = CsrPair::new(&machine, Csr::Time, Csr::Timeh);
    let mut last = 0;
    for _ in 0..READS {
        let (now, retries) = read_split_counted(&pair);
        outcome.retries.update(u64::from(retries));
        if now < last {
            log::warn!("read went back from {last:#x} to {now:#x}");
            outcome.violations += 1;
        }
        last = now;
    }
}

fn check_writes(rng: &mut StdRng, outcome: &mut SeedOutcome) {
    let machine = Machine::new();
    let ticks = TickCounter::new();
    let timer = Timer::new(&machine, machine.map(), &ticks);
    for _ in 0..WRITES {
        let old: u64 = rng.r#gen();
        let new = old.saturating_add(rng.gen_range(0..u64::from(u32::MAX) * 4));
        timer.set_compare(old);
        machine.clear_compare_trace();
        timer.set_compare(new);
        if let Some(seen) = machine.compare_trace().into_iter().find(|&seen| seen > new) {
            log::warn!("compare exposed {seen:#x} while moving {old:#x} -> {new:#x}");
            outcome.violations += 1;
        }
    }
}

fn check_schedule(rng: &mut StdRng, latency: u64, outcome: &mut SeedOutcome) {
    let machine = Machine::new();
    let ticks = Rc::new(TickCounter::new());
    bind_timer(&machine, ticks.clone());
    let timer = Timer::new(&machine, machine.map(), &ticks);
    timer.set_time(rng.gen_range(0..u64::from(u32::MAX)));
    timer.start();
    let first = timer.compare();

    machine.set_ticks_per_access(latency);
    machine.set_entry_latency(rng.gen_range(0..400));
    machine.advance(rng.gen_range(0..20_000));
    timer.delay(rng.gen_range(0..5));

    machine.set_ticks_per_access(0);
    machine.set_entry_latency(0);
    let traps = TrapController::new(&machine);
    while traps.is_pending(cause::MTI) {}

    let expected_ticks = (machine.time() - (first - 1_000)) / 1_000;
    if u64::from(ticks.get()) != expected_ticks {
        log::warn!("{} ticks counted, {expected_ticks} expected", ticks.get());
        outcome.violations += 1;
    }
    if timer.compare() != first + expected_ticks * 1_000 {
        log::warn!("compare drifted to {:#x}", timer.compare());
        outcome.violations += 1;
    }
}

/// Runs every check for one seed.
pub fn run_seed(seed: u64, latency_max: u64) -> SeedOutcome {
    let mut rng = StdRng::seed_from_u64(seed);
    let latency = rng.gen_range(1..=latency_max.max(1));
    let mut outcome = SeedOutcome::empty();
    check_reads(&mut rng, latency, &mut outcome);
    check_writes(&mut rng, &mut outcome);
    check_schedule(&mut rng, latency, &mut outcome);
    log::debug!("seed {seed}: latency {latency}, {} violations", outcome.violations);
    outcome
}

pub fn run_stress(seeds: u64, latency_max: u64) -> Result<()> {
    println!("Stress: {seeds} seeds, up to {latency_max} ticks/access (Parallel - Rayon)");
    let start = Instant::now();

    let outcome = (0..seeds)
        .into_par_iter()
        .map(|seed| run_seed(seed, latency_max))
        .reduce(SeedOutcome::empty, SeedOutcome::merge);

    println!("Time: {:.4} s", start.elapsed().as_secs_f64());
    println!("Violations: {}", outcome.violations);
    outcome.retries.print_report("Composite read retries", "retries");

    ensure!(outcome.violations == 0, "{} invariant violations", outcome.violations);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_few_seeds_are_clean() {
        for seed in 0..4 {
            let outcome = run_seed(seed, 50);
            assert_eq!(outcome.violations, 0, "seed {seed}");
            assert_eq!(outcome.retries.count, READS as u64);
        }
    }
}
