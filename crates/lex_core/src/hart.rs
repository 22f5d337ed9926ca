//! RV32 hardware backend.
//!
//! Implements the register primitive layer with inline `csr*` instructions
//! and volatile word accesses. The CSR number is an immediate in every
//! instruction, so each [`Csr`] variant is lowered to its own monomorphized
//! instruction; after inlining, a call with a constant register compiles to
//! exactly one `csrr`, `csrw`, `csrs`, `csrc` or `csrrw`.

use core::arch::asm;

use lex_common::csr;

use crate::reg::{Csr, CsrBus, MmioBus};

/// The hart executing this code.
#[derive(Debug, Clone, Copy)]
pub struct Hart {
    _private: (),
}

impl Hart {
    /// Returns a handle on the running hart.
    ///
    /// # Safety
    ///
    /// The caller must be running in machine mode on a Lexington-compatible
    /// core whose memory map makes every address later passed to
    /// [`MmioBus::load`] and [`MmioBus::store`] a valid device register.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }

    /// Orders all prior memory accesses before all later ones.
    #[inline(always)]
    pub fn fence(&self) {
        unsafe { asm!("fence", options(nostack)) }
    }

    /// Synchronizes the instruction stream with prior stores.
    #[inline(always)]
    pub fn fence_i(&self) {
        unsafe { asm!("fence.i", options(nostack)) }
    }

    /// Raises an environment call exception.
    #[inline(always)]
    pub fn ecall(&self) {
        unsafe { asm!("ecall", options(nostack)) }
    }

    /// Raises a breakpoint exception.
    #[inline(always)]
    pub fn ebreak(&self) {
        unsafe { asm!("ebreak", options(nostack)) }
    }
}

#[inline(always)]
fn csrr<const CSR: u16>() -> u32 {
    let value: u32;
    unsafe { asm!("csrr {0}, {csr}", out(reg) value, csr = const CSR, options(nostack)) }
    value
}

#[inline(always)]
fn csrw<const CSR: u16>(value: u32) {
    unsafe { asm!("csrw {csr}, {0}", in(reg) value, csr = const CSR, options(nostack)) }
}

#[inline(always)]
fn csrs<const CSR: u16>(mask: u32) {
    unsafe { asm!("csrs {csr}, {0}", in(reg) mask, csr = const CSR, options(nostack)) }
}

#[inline(always)]
fn csrc<const CSR: u16>(mask: u32) {
    unsafe { asm!("csrc {csr}, {0}", in(reg) mask, csr = const CSR, options(nostack)) }
}

#[inline(always)]
fn csrrw<const CSR: u16>(value: u32) -> u32 {
    let previous: u32;
    unsafe {
        asm!(
            "csrrw {0}, {csr}, {1}",
            out(reg) previous,
            in(reg) value,
            csr = const CSR,
            options(nostack),
        )
    }
    previous
}

/// Expands to a `match` lowering a runtime [`Csr`] onto the const-generic
/// instruction wrapper `$op`.
macro_rules! on_csr {
    ($csr:expr, $op:ident $(, $arg:expr)*) => {
        match $csr {
            Csr::Mvendorid => $op::<{ csr::MVENDORID }>($($arg),*),
            Csr::Marchid => $op::<{ csr::MARCHID }>($($arg),*),
            Csr::Mimpid => $op::<{ csr::MIMPID }>($($arg),*),
            Csr::Mhartid => $op::<{ csr::MHARTID }>($($arg),*),
            Csr::Mconfigptr => $op::<{ csr::MCONFIGPTR }>($($arg),*),
            Csr::Mstatus => $op::<{ csr::MSTATUS }>($($arg),*),
            Csr::Mstatush => $op::<{ csr::MSTATUSH }>($($arg),*),
            Csr::Mie => $op::<{ csr::MIE }>($($arg),*),
            Csr::Mtvec => $op::<{ csr::MTVEC }>($($arg),*),
            Csr::Mcountinhibit => $op::<{ csr::MCOUNTINHIBIT }>($($arg),*),
            Csr::Mscratch => $op::<{ csr::MSCRATCH }>($($arg),*),
            Csr::Mepc => $op::<{ csr::MEPC }>($($arg),*),
            Csr::Mcause => $op::<{ csr::MCAUSE }>($($arg),*),
            Csr::Mtval => $op::<{ csr::MTVAL }>($($arg),*),
            Csr::Mip => $op::<{ csr::MIP }>($($arg),*),
            Csr::Mcycle => $op::<{ csr::MCYCLE }>($($arg),*),
            Csr::Minstret => $op::<{ csr::MINSTRET }>($($arg),*),
            Csr::Mcycleh => $op::<{ csr::MCYCLEH }>($($arg),*),
            Csr::Minstreth => $op::<{ csr::MINSTRETH }>($($arg),*),
            Csr::Cycle => $op::<{ csr::CYCLE }>($($arg),*),
            Csr::Time => $op::<{ csr::TIME }>($($arg),*),
            Csr::Instret => $op::<{ csr::INSTRET }>($($arg),*),
            Csr::Cycleh => $op::<{ csr::CYCLEH }>($($arg),*),
            Csr::Timeh => $op::<{ csr::TIMEH }>($($arg),*),
            Csr::Instreth => $op::<{ csr::INSTRETH }>($($arg),*),
        }
    };
}

impl CsrBus for Hart {
    #[inline(always)]
    fn csr_read(&self, csr: Csr) -> u32 {
        on_csr!(csr, csrr)
    }

    #[inline(always)]
    fn csr_write(&self, csr: Csr, value: u32) {
        on_csr!(csr, csrw, value)
    }

    #[inline(always)]
    fn csr_set(&self, csr: Csr, mask: u32) {
        on_csr!(csr, csrs, mask)
    }

    #[inline(always)]
    fn csr_clear(&self, csr: Csr, mask: u32) {
        on_csr!(csr, csrc, mask)
    }

    #[inline(always)]
    fn csr_swap(&self, csr: Csr, value: u32) -> u32 {
        on_csr!(csr, csrrw, value)
    }
}

impl MmioBus for Hart {
    #[inline(always)]
    fn load(&self, addr: usize) -> u32 {
        // SAFETY: `Hart::new` requires every device address to be valid.
        unsafe { (addr as *const u32).read_volatile() }
    }

    #[inline(always)]
    fn store(&self, addr: usize, value: u32) {
        // SAFETY: `Hart::new` requires every device address to be valid.
        unsafe { (addr as *mut u32).write_volatile(value) }
    }
}
