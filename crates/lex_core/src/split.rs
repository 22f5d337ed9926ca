//! 64-bit values held in two 32-bit registers.
//!
//! The free-running counter, the compare register and the `cycle`/`instret`
//! counters are all exposed as an independent low and high word. Neither
//! half changes atomically with the other, so reading or writing the pair
//! needs a defined protocol:
//!
//! * **read**: high, low, high again; if the two high reads differ the low
//!   word rolled over in between and the whole bracket is repeated.
//! * **write**: low ← 0, high ← new high, low ← new low. A racing observer
//!   can only ever see a value *smaller* than the old or the new one, never a
//!   larger one. For a compare register that means at worst an early match,
//!   never a missed one.
//!
//! Halves are always derived by shift and mask, never by reinterpreting
//! storage.

use crate::reg::{Csr, CsrBus, MmioBus};

/// Read access to both halves of a composite value.
///
/// Each method must be a single access; the protocol in [`read_split`]
/// depends on the halves being sampled at distinct instants.
pub trait SplitRead {
    /// Bits 31..0.
    fn read_low(&self) -> u32;
    /// Bits 63..32.
    fn read_high(&self) -> u32;
}

/// Write access to both halves of a composite value.
pub trait SplitWrite {
    fn write_low(&self, value: u32);
    fn write_high(&self, value: u32);
}

/// A composite register supporting both protocols.
pub trait SplitRegister: SplitRead + SplitWrite {}

impl<T: SplitRead + SplitWrite + ?Sized> SplitRegister for T {}

/// Joins two halves into the logical 64-bit value.
#[inline(always)]
pub const fn join(high: u32, low: u32) -> u64 {
    ((high as u64) << 32) | low as u64
}

/// Splits a 64-bit value into `(high, low)`.
#[inline(always)]
pub const fn halves(value: u64) -> (u32, u32) {
    ((value >> 32) as u32, value as u32)
}

/// Reads a composite value, retrying until the high half is stable.
///
/// There is no bound on the number of attempts: for a monotonically
/// increasing counter the loop ends as soon as the rollover has passed, which
/// in practice costs at most one extra bracket.
#[inline]
pub fn read_split<R: SplitRead + ?Sized>(reg: &R) -> u64 {
    read_split_counted(reg).0
}

/// Like [`read_split`], also returning how many brackets were discarded.
///
/// # Returns
///
/// A tuple of:
/// * The composite value
/// * The number of high/low/high brackets thrown away because the high
///   half changed underneath them
pub fn read_split_counted<R: SplitRead + ?Sized>(reg: &R) -> (u64, u32) {
    let mut retries = 0;
    loop {
        let high = reg.read_high();
        let low = reg.read_low();
        if reg.read_high() == high {
            return (join(high, low), retries);
        }
        retries += 1;
    }
}

/// Writes a composite value, clearing the low half first.
///
/// Three stores: low ← 0, high, low. Between them the register holds a
/// value no greater than `value` as long as `value` is not below the old
/// content, which is the case for every compare re-arm.
///
/// # Arguments
///
/// * `reg` - The destination pair
/// * `value` - Full 64-bit value to store
#[inline]
pub fn write_split<R: SplitWrite + ?Sized>(reg: &R, value: u64) {
    let (high, low) = halves(value);
    reg.write_low(0);
    reg.write_high(high);
    reg.write_low(low);
}

/// A composite value held in a low/high pair of CSRs.
pub struct CsrPair<'a, B: CsrBus + ?Sized> {
    bus: &'a B,
    low: Csr,
    high: Csr,
}

impl<'a, B: CsrBus + ?Sized> CsrPair<'a, B> {
    /// Pairs two CSRs, e.g. `Csr::Cycle` with `Csr::Cycleh`.
    pub const fn new(bus: &'a B, low: Csr, high: Csr) -> Self {
        Self { bus, low, high }
    }

    /// Reads the pair with the retry protocol.
    #[inline]
    pub fn get(&self) -> u64 {
        read_split(self)
    }
}

impl<B: CsrBus + ?Sized> SplitRead for CsrPair<'_, B> {
    #[inline(always)]
    fn read_low(&self) -> u32 {
        self.bus.csr_read(self.low)
    }

    #[inline(always)]
    fn read_high(&self) -> u32 {
        self.bus.csr_read(self.high)
    }
}

impl<B: CsrBus + ?Sized> SplitWrite for CsrPair<'_, B> {
    #[inline(always)]
    fn write_low(&self, value: u32) {
        self.bus.csr_write(self.low, value)
    }

    #[inline(always)]
    fn write_high(&self, value: u32) {
        self.bus.csr_write(self.high, value)
    }
}

/// A composite value held in two memory-mapped words.
pub struct MmioPair<'a, B: MmioBus + ?Sized> {
    bus: &'a B,
    low: usize,
    high: usize,
}

impl<'a, B: MmioBus + ?Sized> MmioPair<'a, B> {
    pub const fn new(bus: &'a B, low: usize, high: usize) -> Self {
        Self { bus, low, high }
    }

    /// Reads the pair with the retry protocol.
    #[inline]
    pub fn get(&self) -> u64 {
        read_split(self)
    }

    /// Writes the pair with the low-first protocol.
    #[inline]
    pub fn set(&self, value: u64) {
        write_split(self, value)
    }
}

impl<B: MmioBus + ?Sized> SplitRead for MmioPair<'_, B> {
    #[inline(always)]
    fn read_low(&self) -> u32 {
        self.bus.load(self.low)
    }

    #[inline(always)]
    fn read_high(&self) -> u32 {
        self.bus.load(self.high)
    }
}

impl<B: MmioBus + ?Sized> SplitWrite for MmioPair<'_, B> {
    #[inline(always)]
    fn write_low(&self, value: u32) {
        self.bus.store(self.low, value)
    }

    #[inline(always)]
    fn write_high(&self, value: u32) {
        self.bus.store(self.high, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeBus;
    use core::cell::Cell;
    use std::vec::Vec;

    /// A counter that advances by `step` after every half is sampled.
    struct Running {
        value: Cell<u64>,
        step: u64,
    }

    impl Running {
        fn sample(&self) -> u64 {
            let v = self.value.get();
            self.value.set(v.wrapping_add(self.step));
            v
        }
    }

    impl SplitRead for Running {
        fn read_low(&self) -> u32 {
            self.sample() as u32
        }

        fn read_high(&self) -> u32 {
            (self.sample() >> 32) as u32
        }
    }

    #[test]
    fn join_and_halves_are_inverse() {
        let v = 0x0123_4567_89AB_CDEF;
        let (high, low) = halves(v);
        assert_eq!(high, 0x0123_4567);
        assert_eq!(low, 0x89AB_CDEF);
        assert_eq!(join(high, low), v);
    }

    #[test]
    fn read_retries_across_low_rollover() {
        // high sampled at ..FE, low at ..FF, second high after the carry.
        let counter = Running {
            value: Cell::new(0x0000_0001_FFFF_FFFE),
            step: 1,
        };
        let (value, retries) = read_split_counted(&counter);
        assert_eq!(retries, 1);
        // Second bracket: high = 2 (sampled at 0x2_0000_0001), low = 2.
        assert_eq!(value, 0x0000_0002_0000_0002);
    }

    #[test]
    fn successive_reads_never_decrease() {
        let counter = Running {
            value: Cell::new(0x0000_0000_FFFF_FF00),
            step: 7,
        };
        let mut last = 0;
        for _ in 0..200 {
            let now = read_split(&counter);
            assert!(now >= last, "{now:#x} < {last:#x}");
            last = now;
        }
        assert!(last > 0x1_0000_0000);
    }

    #[test]
    fn write_clears_low_before_high() {
        let bus = FakeBus::new();
        let pair = MmioPair::new(&bus, 0x8, 0xC);
        pair.set(0xFFFF_FFFF_0000_0001);
        let stores: Vec<(usize, u32)> = bus.stores();
        assert_eq!(stores, [(0x8, 0), (0xC, 0xFFFF_FFFF), (0x8, 1)]);
        assert_eq!(pair.get(), 0xFFFF_FFFF_0000_0001);
    }

    #[test]
    fn csr_pair_reads_both_halves() {
        let bus = FakeBus::new();
        bus.csr_write(Csr::Cycle, 0x10);
        bus.csr_write(Csr::Cycleh, 0x2);
        assert_eq!(CsrPair::new(&bus, Csr::Cycle, Csr::Cycleh).get(), 0x2_0000_0010);
    }
}
