//! Machine timer: composite counter access, millisecond tick, delays.
//!
//! The tick is driven entirely by compare-match interrupts. Each match
//! re-arms `mtimecmp` relative to its *previous* value, not to the current
//! counter, so handler latency never accumulates into the schedule: the
//! n-th match always fires at `first + (n - 1) * 1000`.
//!
//! Shared state between mainline code and the handler is exactly the tick
//! counter and the compare register. The handler is the only writer of the
//! tick counter, and mainline code only writes the compare register before
//! the timer source is enabled (`start`) or after it is disabled (`stop`).

use core::hint::spin_loop;
use core::sync::atomic::{AtomicU32, Ordering};

use lex_common::cause;
use lex_common::mmio::MemoryMap;
use lex_common::timebase::{TICKS_PER_MICRO, TICKS_PER_MILLI};

use crate::reg::{Bus, Csr};
use crate::split::{CsrPair, MmioPair};
use crate::trap::{InterruptHandler, TrapController};

/// Milliseconds elapsed since the timer was started, wrapping at 2^32.
///
/// Written only by the compare-match handler, with a plain load and store.
/// Mainline code reads it; the hart cannot be interrupted by itself, so no
/// read-modify-write instruction is needed.
pub struct TickCounter(AtomicU32);

impl TickCounter {
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    #[inline]
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    /// Sets the counter back to zero. Only valid while the timer source is
    /// disabled.
    #[inline]
    pub fn reset(&self) {
        self.0.store(0, Ordering::Release);
    }

    /// Adds one tick. Only the compare-match handler calls this.
    #[inline]
    pub fn advance(&self) {
        let n = self.0.load(Ordering::Relaxed);
        self.0.store(n.wrapping_add(1), Ordering::Release);
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// The machine timer of one memory map.
///
/// Pairs the `mtime`/`mtimecmp` words of a [`MemoryMap`] with the tick
/// counter the compare-match handler advances. The same timer is bound to
/// the [`TrapDispatcher`](crate::trap::TrapDispatcher) and used from
/// mainline code for delays.
pub struct Timer<'a, B: Bus + ?Sized> {
    bus: &'a B,
    map: MemoryMap,
    ticks: &'a TickCounter,
}

impl<'a, B: Bus + ?Sized> Timer<'a, B> {
    /// Creates a timer handle. Touches no register.
    ///
    /// # Arguments
    ///
    /// * `bus` - Register backend, the hart or a simulated machine
    /// * `map` - Supplies the addresses of the counter and compare words
    /// * `ticks` - Millisecond counter written by [`Self::on_compare_match`]
    pub const fn new(bus: &'a B, map: MemoryMap, ticks: &'a TickCounter) -> Self {
        Self { bus, map, ticks }
    }

    fn counter(&self) -> MmioPair<'a, B> {
        MmioPair::new(self.bus, self.map.mtime_lo(), self.map.mtime_hi())
    }

    fn comparator(&self) -> MmioPair<'a, B> {
        MmioPair::new(self.bus, self.map.mtimecmp_lo(), self.map.mtimecmp_hi())
    }

    /// Current value of the free-running counter, read through `time`/`timeh`.
    ///
    /// Uses the retry protocol of [`read_split`](crate::split::read_split),
    /// so successive calls never go backwards while the counter runs.
    #[inline]
    pub fn now(&self) -> u64 {
        CsrPair::new(self.bus, Csr::Time, Csr::Timeh).get()
    }

    /// Overwrites the free-running counter.
    pub fn set_time(&self, value: u64) {
        self.counter().set(value);
    }

    /// Current compare value.
    #[inline]
    pub fn compare(&self) -> u64 {
        self.comparator().get()
    }

    /// Programs the compare register.
    ///
    /// While the low half is cleared the register transiently holds a value
    /// lower than both the old and the new one, so a racing match can only
    /// come early.
    #[inline]
    pub fn set_compare(&self, value: u64) {
        self.comparator().set(value);
    }

    /// Milliseconds counted by the interrupt handler since `start`.
    #[inline]
    pub fn millis(&self) -> u32 {
        self.ticks.get()
    }

    /// Low half of the counter: microseconds, wrapping every ~71 minutes.
    #[inline]
    pub fn microseconds(&self) -> u32 {
        self.bus.csr_read(Csr::Time)
    }

    /// Milliseconds since the counter was last zeroed, derived from the
    /// counter itself. Works with interrupts disabled.
    pub fn uptime_millis(&self) -> u64 {
        self.now() / TICKS_PER_MILLI
    }

    /// Spins for at least `ms` milliseconds.
    ///
    /// The target is computed once as a 64-bit counter value and compared
    /// against full composite reads, so the wait is correct across a
    /// rollover of the low half. Interrupts stay as they are; the tick keeps
    /// counting while this spins.
    ///
    /// # Arguments
    ///
    /// * `ms` - Minimum duration; 0 returns after one read
    pub fn delay(&self, ms: u32) {
        self.wait_ticks(u64::from(ms) * TICKS_PER_MILLI);
    }

    /// Spins for at least `us` microseconds.
    pub fn delay_micro(&self, us: u32) {
        self.wait_ticks(u64::from(us) * TICKS_PER_MICRO);
    }

    fn wait_ticks(&self, ticks: u64) {
        let target = self.now().saturating_add(ticks);
        while self.now() < target {
            spin_loop();
        }
    }

    /// Starts the millisecond tick.
    ///
    /// Resets the tick counter, arms the first match one millisecond from
    /// now, then enables the timer source and finally global interrupts. The
    /// handler must already be bound.
    pub fn start(&self) {
        let traps = TrapController::new(self.bus);
        self.ticks.reset();
        let first = self.now().wrapping_add(TICKS_PER_MILLI);
        self.set_compare(first);
        traps.enable_source(cause::MTI);
        traps.enable();
        log::debug!("timer: started, first match at {first}");
    }

    /// Stops the tick: masks the timer source and parks the compare register
    /// where it can never match. Global interrupts are left as they are.
    pub fn stop(&self) {
        TrapController::new(self.bus).disable_source(cause::MTI);
        self.set_compare(u64::MAX);
        log::debug!("timer: stopped at tick {}", self.ticks.get());
    }

    /// Compare-match work: re-arm one millisecond after the previous match,
    /// then count the tick.
    #[inline]
    pub fn on_compare_match(&self) {
        let next = self.compare().wrapping_add(TICKS_PER_MILLI);
        self.set_compare(next);
        self.ticks.advance();
    }
}

impl<B: Bus + ?Sized> InterruptHandler for Timer<'_, B> {
    fn handle(&self) {
        self.on_compare_match();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeBus;
    use crate::reg::{CsrBus, MmioBus};
    use crate::trap::{Dispatch, TrapDispatcher, handle_trap};
    use core::cell::RefCell;
    use lex_common::flags::{Interrupts, Mstatus};
    use std::vec::Vec;

    const MAP: MemoryMap = MemoryMap::LEXINGTON;

    /// Forwards to a [`FakeBus`], noting the tick count at every store to
    /// the compare register.
    struct TickWatch<'a> {
        bus: &'a FakeBus,
        ticks: &'a TickCounter,
        seen: RefCell<Vec<(usize, u32)>>,
    }

    impl CsrBus for TickWatch<'_> {
        fn csr_read(&self, csr: Csr) -> u32 {
            self.bus.csr_read(csr)
        }

        fn csr_write(&self, csr: Csr, value: u32) {
            self.bus.csr_write(csr, value)
        }

        fn csr_set(&self, csr: Csr, mask: u32) {
            self.bus.csr_set(csr, mask)
        }

        fn csr_clear(&self, csr: Csr, mask: u32) {
            self.bus.csr_clear(csr, mask)
        }

        fn csr_swap(&self, csr: Csr, value: u32) -> u32 {
            self.bus.csr_swap(csr, value)
        }
    }

    impl MmioBus for TickWatch<'_> {
        fn load(&self, addr: usize) -> u32 {
            self.bus.load(addr)
        }

        fn store(&self, addr: usize, value: u32) {
            if addr == MAP.mtimecmp_lo() || addr == MAP.mtimecmp_hi() {
                self.seen.borrow_mut().push((addr, self.ticks.get()));
            }
            self.bus.store(addr, value)
        }
    }

    fn at(bus: &FakeBus, time: u64) {
        bus.csr_write(Csr::Time, time as u32);
        bus.csr_write(Csr::Timeh, (time >> 32) as u32);
    }

    #[test]
    fn tick_counter_wraps() {
        let ticks = TickCounter::new();
        ticks.0.store(u32::MAX, Ordering::Relaxed);
        ticks.advance();
        assert_eq!(ticks.get(), 0);
        ticks.advance();
        ticks.reset();
        assert_eq!(ticks.get(), 0);
    }

    #[test]
    fn start_arms_one_millisecond_ahead_then_enables() {
        let bus = FakeBus::new();
        let ticks = TickCounter::new();
        ticks.advance();
        at(&bus, 0x1_0000_0500);

        let timer = Timer::new(&bus, MAP, &ticks);
        timer.start();

        assert_eq!(timer.millis(), 0);
        assert_eq!(timer.compare(), 0x1_0000_0500 + 1000);
        assert_eq!(bus.csr_read(Csr::Mie), Interrupts::MTI.bits());
        assert_eq!(bus.csr_read(Csr::Mstatus), Mstatus::MIE.bits());
    }

    #[test]
    fn compare_match_rearms_from_previous_compare() {
        let bus = FakeBus::new();
        let ticks = TickCounter::new();
        let timer = Timer::new(&bus, MAP, &ticks);
        timer.set_compare(1_000);

        // Handler entered late: the counter is well past the match.
        at(&bus, 1_750);
        timer.on_compare_match();
        assert_eq!(timer.compare(), 2_000);
        timer.on_compare_match();
        assert_eq!(timer.compare(), 3_000);
        assert_eq!(timer.millis(), 2);
    }

    #[test]
    fn rearm_is_written_before_the_tick_is_counted() {
        let bus = FakeBus::new();
        let ticks = TickCounter::new();
        let timer = Timer::new(&bus, MAP, &ticks);
        timer.set_compare(0xFFFF_FC18);
        let before = bus.stores().len();

        timer.on_compare_match();

        let stores = bus.stores();
        assert_eq!(
            &stores[before..],
            [
                (MAP.mtimecmp_lo(), 0),
                (MAP.mtimecmp_hi(), 1),
                (MAP.mtimecmp_lo(), 0),
            ]
        );
        assert_eq!(timer.compare(), 0x1_0000_0000);
        assert_eq!(timer.millis(), 1);
    }

    #[test]
    fn tick_is_counted_only_after_the_last_compare_store() {
        let bus = FakeBus::new();
        let ticks = TickCounter::new();
        let watch = TickWatch {
            bus: &bus,
            ticks: &ticks,
            seen: RefCell::new(Vec::new()),
        };
        let timer = Timer::new(&watch, MAP, &ticks);
        timer.set_compare(4_000);
        timer.on_compare_match();
        watch.seen.borrow_mut().clear();

        timer.on_compare_match();

        assert_eq!(
            *watch.seen.borrow(),
            [
                (MAP.mtimecmp_lo(), 1),
                (MAP.mtimecmp_hi(), 1),
                (MAP.mtimecmp_lo(), 1),
            ]
        );
        assert_eq!(ticks.get(), 2);
        assert_eq!(timer.compare(), 6_000);
    }

    #[test]
    fn stop_masks_source_and_parks_compare() {
        let bus = FakeBus::new();
        let ticks = TickCounter::new();
        let timer = Timer::new(&bus, MAP, &ticks);
        timer.start();
        timer.stop();
        assert_eq!(bus.csr_read(Csr::Mie), 0);
        assert_eq!(timer.compare(), u64::MAX);
        assert_eq!(bus.csr_read(Csr::Mstatus), Mstatus::MIE.bits());
    }

    #[test]
    fn derived_time_units() {
        let bus = FakeBus::new();
        let ticks = TickCounter::new();
        let timer = Timer::new(&bus, MAP, &ticks);
        at(&bus, 0x2_0000_1388);
        assert_eq!(timer.microseconds(), 0x1388);
        assert_eq!(timer.uptime_millis(), 0x2_0000_1388 / 1000);
    }

    #[test]
    fn delay_of_zero_returns_immediately() {
        let bus = FakeBus::new();
        let ticks = TickCounter::new();
        let timer = Timer::new(&bus, MAP, &ticks);
        at(&bus, 42);
        timer.delay(0);
        timer.delay_micro(0);
    }

    #[test]
    fn bound_timer_handles_its_interrupt() {
        let bus = FakeBus::new();
        let ticks = TickCounter::new();
        let timer = Timer::new(&bus, MAP, &ticks);
        timer.set_compare(5_000);

        let mut dispatcher = TrapDispatcher::new();
        dispatcher.bind_timer(&timer);
        bus.csr_write(Csr::Mcause, 0x8000_0007);

        assert_eq!(handle_trap(&bus, &dispatcher), Dispatch::Handled);
        assert_eq!(timer.compare(), 6_000);
        assert_eq!(ticks.get(), 1);
    }
}
