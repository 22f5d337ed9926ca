//! Common definitions shared across the Lexington HAL workspace.
//!
//! This crate holds the bit-exact hardware facts of the Lexington
//! microcontroller: the memory map of its peripherals, the numbers of the
//! control and status registers, the trap cause codes and the bit layout of
//! the registers the HAL touches. Firmware, the simulator and host tools all
//! take these values from here so that they can never disagree.

#![no_std]

// Memory-mapped I/O address space of the Lexington system-on-chip.
//
// Every peripheral is a small bank of consecutive 32-bit words. The bases are
// fixed in silicon, but they are carried in a `MemoryMap` value so that the
// drivers can be retargeted to a board with a different layout.
pub mod mmio {
    /// Base address of the machine timer bank.
    ///
    /// Four consecutive words: `mtime` low, `mtime` high, `mtimecmp` low,
    /// `mtimecmp` high.
    pub const TIMER_BASE: usize = 0xC000_0000;

    /// Base address of the UART0 bank (`DATA`, `CONF`).
    pub const UART0_BASE: usize = 0xFFFF_FF80;

    /// Base address of GPIO bank A.
    pub const GPIOA_BASE: usize = 0xFFFF_FFA0;

    /// Base address of GPIO bank B.
    pub const GPIOB_BASE: usize = 0xFFFF_FFB0;

    /// Base address of GPIO bank C.
    pub const GPIOC_BASE: usize = 0xFFFF_FFC0;

    /// Offset of the low half of the free-running counter.
    pub const MTIME_LO: usize = 0x0;
    /// Offset of the high half of the free-running counter.
    pub const MTIME_HI: usize = 0x4;
    /// Offset of the low half of the compare register.
    pub const MTIMECMP_LO: usize = 0x8;
    /// Offset of the high half of the compare register.
    pub const MTIMECMP_HI: usize = 0xC;

    /// Offset of the GPIO direction register (1 = output).
    pub const GPIO_MODE: usize = 0x0;
    /// Offset of the GPIO input data register.
    pub const GPIO_IDATA: usize = 0x4;
    /// Offset of the GPIO output data register.
    pub const GPIO_ODATA: usize = 0x8;
    /// Offset of the GPIO interrupt configuration register.
    pub const GPIO_INT_CONF: usize = 0xC;

    /// Offset of the UART data register.
    pub const UART_DATA: usize = 0x0;
    /// Offset of the UART configuration / status register.
    pub const UART_CONF: usize = 0x4;

    /// Physical placement of every peripheral bank.
    ///
    /// The field offsets inside a bank are fixed; only the bank bases move
    /// when the HAL is retargeted. `MemoryMap::LEXINGTON` is the layout of the
    /// reference chip and is what the firmware uses unless told otherwise.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MemoryMap {
        /// Base of the machine timer bank.
        pub timer: usize,
        /// Base of the UART0 bank.
        pub uart0: usize,
        /// Base of GPIO bank A.
        pub gpioa: usize,
        /// Base of GPIO bank B.
        pub gpiob: usize,
        /// Base of GPIO bank C.
        pub gpioc: usize,
    }

    impl MemoryMap {
        /// The memory map of the Lexington reference chip.
        pub const LEXINGTON: MemoryMap = MemoryMap {
            timer: TIMER_BASE,
            uart0: UART0_BASE,
            gpioa: GPIOA_BASE,
            gpiob: GPIOB_BASE,
            gpioc: GPIOC_BASE,
        };

        /// Address of the low half of `mtime`.
        pub const fn mtime_lo(&self) -> usize {
            self.timer + MTIME_LO
        }

        /// Address of the high half of `mtime`.
        pub const fn mtime_hi(&self) -> usize {
            self.timer + MTIME_HI
        }

        /// Address of the low half of `mtimecmp`.
        pub const fn mtimecmp_lo(&self) -> usize {
            self.timer + MTIMECMP_LO
        }

        /// Address of the high half of `mtimecmp`.
        pub const fn mtimecmp_hi(&self) -> usize {
            self.timer + MTIMECMP_HI
        }
    }

    impl Default for MemoryMap {
        fn default() -> Self {
            Self::LEXINGTON
        }
    }
}

/// Control and status register numbers.
///
/// These are the 12-bit CSR addresses encoded directly into `csr*`
/// instructions. Only the registers the Lexington core implements are listed.
pub mod csr {
    pub const MVENDORID: u16 = 0xF11;
    pub const MARCHID: u16 = 0xF12;
    pub const MIMPID: u16 = 0xF13;
    pub const MHARTID: u16 = 0xF14;
    pub const MCONFIGPTR: u16 = 0xF15;

    pub const MSTATUS: u16 = 0x300;
    pub const MSTATUSH: u16 = 0x310;
    pub const MIE: u16 = 0x304;
    pub const MTVEC: u16 = 0x305;
    pub const MCOUNTINHIBIT: u16 = 0x320;

    pub const MSCRATCH: u16 = 0x340;
    pub const MEPC: u16 = 0x341;
    pub const MCAUSE: u16 = 0x342;
    pub const MTVAL: u16 = 0x343;
    pub const MIP: u16 = 0x344;

    pub const MCYCLE: u16 = 0xB00;
    pub const MINSTRET: u16 = 0xB02;
    pub const MCYCLEH: u16 = 0xB80;
    pub const MINSTRETH: u16 = 0xB82;

    pub const CYCLE: u16 = 0xC00;
    pub const TIME: u16 = 0xC01;
    pub const INSTRET: u16 = 0xC02;
    pub const CYCLEH: u16 = 0xC80;
    pub const TIMEH: u16 = 0xC81;
    pub const INSTRETH: u16 = 0xC82;
}

/// Trap cause codes as reported in the low bits of `mcause`.
pub mod cause {
    /// Set in `mcause` when the trap was caused by an interrupt.
    pub const INTERRUPT_FLAG: u32 = 1 << 31;

    /// Mask selecting the cause code bits of `mcause`.
    pub const CODE_MASK: u32 = !INTERRUPT_FLAG;

    // Standard interrupt causes.
    pub const NMI: u32 = 0;
    pub const SSI: u32 = 1;
    pub const MSI: u32 = 3;
    pub const STI: u32 = 5;
    pub const MTI: u32 = 7;
    pub const SEI: u32 = 9;
    pub const MEI: u32 = 11;

    // Platform interrupt causes.
    pub const UART0_RX: u32 = 16;
    pub const UART0_TX: u32 = 17;
    pub const TIM0: u32 = 18;
    pub const TIM1: u32 = 19;
    pub const GPIOA0: u32 = 20;
    pub const GPIOA1: u32 = 21;
    pub const GPIOB0: u32 = 22;
    pub const GPIOB1: u32 = 23;
    pub const GPIOC0: u32 = 24;
    pub const GPIOC1: u32 = 25;

    // Synchronous exception causes.
    pub const INST_MISALIGNED: u32 = 0;
    pub const INST_ACCESS_FAULT: u32 = 1;
    pub const ILLEGAL_INST: u32 = 2;
    pub const BREAKPOINT: u32 = 3;
    pub const LOAD_MISALIGNED: u32 = 4;
    pub const LOAD_ACCESS_FAULT: u32 = 5;
    pub const STORE_MISALIGNED: u32 = 6;
    pub const STORE_ACCESS_FAULT: u32 = 7;
    pub const ECALL_UMODE: u32 = 8;
    pub const ECALL_SMODE: u32 = 9;
    pub const ECALL_MMODE: u32 = 10;
    pub const INST_PAGE_FAULT: u32 = 11;
    pub const LOAD_PAGE_FAULT: u32 = 12;
    pub const STORE_PAGE_FAULT: u32 = 13;
}

/// Layout of the `mtvec` register.
pub mod mtvec {
    /// Mode field of `mtvec`.
    pub const MODE_MASK: u32 = 0b11;
    /// Base field of `mtvec`; the hardware forces the low two bits to zero.
    pub const BASE_MASK: u32 = 0xFFFF_FFFC;
    /// All traps jump to `base`.
    pub const MODE_DIRECT: u32 = 0b00;
    /// Interrupts jump to `base + 4 * cause`.
    pub const MODE_VECTORED: u32 = 0b01;
}

/// Fixed rate of the machine timer.
///
/// The counter is clocked at 1 MHz, so one tick is one microsecond.
pub mod timebase {
    /// Counter ticks in one microsecond.
    pub const TICKS_PER_MICRO: u64 = 1;
    /// Counter ticks in one millisecond.
    pub const TICKS_PER_MILLI: u64 = 1_000;
}

/// Bit flags of the registers the HAL manipulates.
pub mod flags {
    bitflags::bitflags! {
        /// Bits of `mstatus` used in machine mode.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct Mstatus: u32 {
            /// Machine Interrupt Enable (global interrupt enable).
            const MIE  = 1 << 3;
            /// Previous value of MIE, saved by the hardware on trap entry.
            const MPIE = 1 << 7;
        }
    }

    bitflags::bitflags! {
        /// Bits of `mstatush`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct Mstatush: u32 {
            /// Machine Big-Endian: data accesses in machine mode are big-endian.
            const MBE = 1 << 5;
        }
    }

    bitflags::bitflags! {
        /// Standard interrupt bits shared by `mie` and `mip`.
        ///
        /// Platform sources (16 and up) have no names here; they are addressed
        /// by index through the trap controller.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct Interrupts: u32 {
            /// Machine software interrupt.
            const MSI = 1 << 3;
            /// Machine timer interrupt.
            const MTI = 1 << 7;
            /// Machine external interrupt.
            const MEI = 1 << 11;
        }
    }

    bitflags::bitflags! {
        /// UART `CONF` register: status bits, interrupt configuration and control.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct UartConf: u32 {
            const RX_BUSY      = 0x0000_0001;
            const TX_BUSY      = 0x0000_0002;
            const RX_EMPTY     = 0x0000_0004;
            const RX_FULL      = 0x0000_0008;
            const TX_EMPTY     = 0x0000_0010;
            const TX_FULL      = 0x0000_0020;
            const RX_INT_DONE  = 0x0000_0040;
            const RX_INT_FULL  = 0x0000_0080;
            const RX_INT_ERR   = 0x0000_0100;
            const TX_INT_DONE  = 0x0000_0200;
            const TX_INT_EMPTY = 0x0000_0400;
            const DBG          = 0x2000_0000;
            const RST          = 0x4000_0000;
            const RX_ERR       = 0x8000_0000;

            const RX_INT = Self::RX_INT_DONE.bits()
                | Self::RX_INT_FULL.bits()
                | Self::RX_INT_ERR.bits();
            const TX_INT = Self::TX_INT_DONE.bits() | Self::TX_INT_EMPTY.bits();
        }
    }
}
