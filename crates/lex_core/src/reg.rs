//! Register primitive layer.
//!
//! Everything above this module talks to the hardware through two traits:
//! [`CsrBus`] for control and status registers and [`MmioBus`] for
//! memory-mapped device registers. Each trait method is one indivisible
//! hardware operation; there is deliberately no method that touches two
//! registers or performs a software read-modify-write on a CSR. Backends are
//! the RV32 [`Hart`](crate::hart::Hart) on real silicon and the simulated
//! machine on the host.

use lex_common::csr;

/// A control and status register implemented by the Lexington core.
///
/// The set is closed, so an out-of-range CSR number cannot be expressed.
/// Writing a read-only register (`mvendorid`, `time`, ...) raises an illegal
/// instruction trap on hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Csr {
    Mvendorid = csr::MVENDORID,
    Marchid = csr::MARCHID,
    Mimpid = csr::MIMPID,
    Mhartid = csr::MHARTID,
    Mconfigptr = csr::MCONFIGPTR,
    Mstatus = csr::MSTATUS,
    Mstatush = csr::MSTATUSH,
    Mie = csr::MIE,
    Mtvec = csr::MTVEC,
    Mcountinhibit = csr::MCOUNTINHIBIT,
    Mscratch = csr::MSCRATCH,
    Mepc = csr::MEPC,
    Mcause = csr::MCAUSE,
    Mtval = csr::MTVAL,
    Mip = csr::MIP,
    Mcycle = csr::MCYCLE,
    Minstret = csr::MINSTRET,
    Mcycleh = csr::MCYCLEH,
    Minstreth = csr::MINSTRETH,
    Cycle = csr::CYCLE,
    Time = csr::TIME,
    Instret = csr::INSTRET,
    Cycleh = csr::CYCLEH,
    Timeh = csr::TIMEH,
    Instreth = csr::INSTRETH,
}

impl Csr {
    /// Number of registers in the set.
    pub const COUNT: usize = 25;

    /// Every register in the set, in declaration order.
    pub const ALL: [Csr; Csr::COUNT] = [
        Csr::Mvendorid,
        Csr::Marchid,
        Csr::Mimpid,
        Csr::Mhartid,
        Csr::Mconfigptr,
        Csr::Mstatus,
        Csr::Mstatush,
        Csr::Mie,
        Csr::Mtvec,
        Csr::Mcountinhibit,
        Csr::Mscratch,
        Csr::Mepc,
        Csr::Mcause,
        Csr::Mtval,
        Csr::Mip,
        Csr::Mcycle,
        Csr::Minstret,
        Csr::Mcycleh,
        Csr::Minstreth,
        Csr::Cycle,
        Csr::Time,
        Csr::Instret,
        Csr::Cycleh,
        Csr::Timeh,
        Csr::Instreth,
    ];

    /// The 12-bit CSR address encoded in the instruction.
    #[inline(always)]
    pub const fn number(self) -> u16 {
        self as u16
    }

    /// Position of this register in [`Csr::ALL`].
    ///
    /// Lets software backends keep register state in a flat array.
    pub fn index(self) -> usize {
        Csr::ALL
            .iter()
            .position(|&c| c == self)
            .unwrap_or_default()
    }

    /// Look a register up by its CSR address.
    pub fn from_number(number: u16) -> Option<Csr> {
        Csr::ALL.iter().copied().find(|c| c.number() == number)
    }

    /// Whether the register is read-only (address bits [11:10] = 0b11).
    pub const fn is_read_only(self) -> bool {
        (self.number() >> 10) & 0b11 == 0b11
    }
}

/// Atomic access to control and status registers.
///
/// Every method compiles to exactly one `csr*` instruction on hardware and
/// is therefore indivisible with respect to interrupts on the same hart.
pub trait CsrBus {
    /// `csrr`: read the register.
    fn csr_read(&self, csr: Csr) -> u32;

    /// `csrw`: overwrite the register.
    fn csr_write(&self, csr: Csr, value: u32);

    /// `csrs`: set the bits of `mask`, leaving the others untouched.
    fn csr_set(&self, csr: Csr, mask: u32);

    /// `csrc`: clear the bits of `mask`, leaving the others untouched.
    fn csr_clear(&self, csr: Csr, mask: u32);

    /// `csrrw`: write `value` and return the previous content.
    fn csr_swap(&self, csr: Csr, value: u32) -> u32;
}

/// Single 32-bit loads and stores to memory-mapped device registers.
pub trait MmioBus {
    /// One volatile 32-bit load.
    fn load(&self, addr: usize) -> u32;

    /// One volatile 32-bit store.
    fn store(&self, addr: usize, value: u32);
}

/// A backend providing both register spaces.
pub trait Bus: CsrBus + MmioBus {}

impl<T: CsrBus + MmioBus + ?Sized> Bus for T {}

/// Handle on one 32-bit memory-mapped register.
///
/// `set_bits` and `clear_bits` are a load followed by a store. They are only
/// used on peripheral registers that the interrupt handler never touches.
pub struct Reg<'a, B: MmioBus + ?Sized> {
    bus: &'a B,
    addr: usize,
}

impl<'a, B: MmioBus + ?Sized> Reg<'a, B> {
    #[inline(always)]
    pub const fn new(bus: &'a B, addr: usize) -> Self {
        Self { bus, addr }
    }

    #[inline(always)]
    pub fn addr(&self) -> usize {
        self.addr
    }

    /// One volatile load of the register.
    #[inline(always)]
    pub fn load(&self) -> u32 {
        self.bus.load(self.addr)
    }

    /// One volatile store to the register.
    #[inline(always)]
    pub fn store(&self, value: u32) {
        self.bus.store(self.addr, value)
    }

    #[inline(always)]
    pub fn set_bits(&self, mask: u32) {
        self.store(self.load() | mask)
    }

    #[inline(always)]
    pub fn clear_bits(&self, mask: u32) {
        self.store(self.load() & !mask)
    }

    #[inline(always)]
    pub fn test_bit(&self, bit: u32) -> bool {
        (self.load() >> bit) & 1 == 1
    }
}

/// Mask with only bit `index` set.
///
/// Indices wrap at 32, matching the shift the hardware applies to a register
/// operand.
#[inline(always)]
pub const fn bit(index: u32) -> u32 {
    1u32 << (index & 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeBus;

    #[test]
    fn csr_numbers_round_trip_through_lookup() {
        for csr in Csr::ALL {
            assert_eq!(Csr::from_number(csr.number()), Some(csr));
            assert_eq!(Csr::ALL[csr.index()], csr);
        }
        assert_eq!(Csr::from_number(0x7C0), None);
    }

    #[test]
    fn read_only_classification_follows_address_bits() {
        assert!(Csr::Time.is_read_only());
        assert!(Csr::Timeh.is_read_only());
        assert!(Csr::Mhartid.is_read_only());
        assert!(!Csr::Mstatus.is_read_only());
        assert!(!Csr::Mcycle.is_read_only());
    }

    #[test]
    fn reg_bit_helpers_touch_only_their_mask() {
        let bus = FakeBus::new();
        let reg = Reg::new(&bus, 0x1000);
        reg.store(0b1010);
        reg.set_bits(0b0100);
        assert_eq!(reg.load(), 0b1110);
        reg.clear_bits(0b1000);
        assert_eq!(reg.load(), 0b0110);
        assert!(reg.test_bit(1));
        assert!(!reg.test_bit(3));
    }

    #[test]
    fn swap_returns_previous_and_stores_new() {
        let bus = FakeBus::new();
        bus.csr_write(Csr::Mscratch, 0x1234);
        assert_eq!(bus.csr_swap(Csr::Mscratch, 0xABCD), 0x1234);
        assert_eq!(bus.csr_read(Csr::Mscratch), 0xABCD);
        assert_eq!(bus.csr_swap(Csr::Mscratch, 0), 0xABCD);
        assert_eq!(bus.csr_read(Csr::Mscratch), 0);
    }

    #[test]
    fn bit_masks_wrap_like_the_hardware_shift() {
        assert_eq!(bit(0), 1);
        assert_eq!(bit(7), 0x80);
        assert_eq!(bit(31), 0x8000_0000);
        assert_eq!(bit(32), 1);
    }
}
