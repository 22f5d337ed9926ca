//! Machine-mode trap and interrupt controller.
//!
//! A set of orthogonal switches over `mstatus`, `mtvec`, `mie` and `mip`,
//! plus decoding of `mcause`. Every per-source operation is a single
//! `csrs`/`csrc`, so toggling a source from mainline code can never race a
//! toggle made by the interrupt handler.
//!
//! Handlers are bound at initialization time to a [`TrapDispatcher`]; the
//! trap vector (or the simulator) calls [`handle_trap`] which decodes the
//! cause and runs the bound handler to completion.

use core::fmt;

use lex_common::cause;
use lex_common::flags::{Mstatus, Mstatush};
use lex_common::mtvec;

use crate::reg::{Csr, CsrBus, bit};

/// Where the hardware jumps on a trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapMode {
    /// Every trap enters at `base`.
    Direct,
    /// Interrupts enter at `base + 4 * cause`, exceptions at `base`.
    Vectored,
}

impl TrapMode {
    /// Decodes the mode field of an `mtvec` value.
    ///
    /// The reserved encodings read back as `Direct`.
    pub const fn from_mtvec(value: u32) -> Self {
        match value & mtvec::MODE_MASK {
            mtvec::MODE_VECTORED => TrapMode::Vectored,
            _ => TrapMode::Direct,
        }
    }

    const fn bits(self) -> u32 {
        match self {
            TrapMode::Direct => mtvec::MODE_DIRECT,
            TrapMode::Vectored => mtvec::MODE_VECTORED,
        }
    }
}

/// Data byte order of machine-mode accesses (`mstatush.MBE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

/// Asynchronous trap sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    NonMaskable,
    SupervisorSoft,
    MachineSoft,
    SupervisorTimer,
    MachineTimer,
    SupervisorExternal,
    MachineExternal,
    Uart0Rx,
    Uart0Tx,
    Timer0,
    Timer1,
    GpioA0,
    GpioA1,
    GpioB0,
    GpioB1,
    GpioC0,
    GpioC1,
    Unknown(u32),
}

impl Interrupt {
    /// Names an interrupt source from the code field of `mcause`.
    ///
    /// Covers the standard machine and supervisor sources and the Lexington
    /// platform sources from 16 upwards. Codes without a name are kept as
    /// [`Interrupt::Unknown`] so they can still be reported and masked.
    ///
    /// # Arguments
    ///
    /// * `code` - The cause code with the interrupt flag already removed
    pub const fn from_code(code: u32) -> Self {
        match code {
            cause::NMI => Interrupt::NonMaskable,
            cause::SSI => Interrupt::SupervisorSoft,
            cause::MSI => Interrupt::MachineSoft,
            cause::STI => Interrupt::SupervisorTimer,
            cause::MTI => Interrupt::MachineTimer,
            cause::SEI => Interrupt::SupervisorExternal,
            cause::MEI => Interrupt::MachineExternal,
            cause::UART0_RX => Interrupt::Uart0Rx,
            cause::UART0_TX => Interrupt::Uart0Tx,
            cause::TIM0 => Interrupt::Timer0,
            cause::TIM1 => Interrupt::Timer1,
            cause::GPIOA0 => Interrupt::GpioA0,
            cause::GPIOA1 => Interrupt::GpioA1,
            cause::GPIOB0 => Interrupt::GpioB0,
            cause::GPIOB1 => Interrupt::GpioB1,
            cause::GPIOC0 => Interrupt::GpioC0,
            cause::GPIOC1 => Interrupt::GpioC1,
            other => Interrupt::Unknown(other),
        }
    }

    /// The source index, which is also its bit in `mie`/`mip`.
    pub const fn code(self) -> u32 {
        match self {
            Interrupt::NonMaskable => cause::NMI,
            Interrupt::SupervisorSoft => cause::SSI,
            Interrupt::MachineSoft => cause::MSI,
            Interrupt::SupervisorTimer => cause::STI,
            Interrupt::MachineTimer => cause::MTI,
            Interrupt::SupervisorExternal => cause::SEI,
            Interrupt::MachineExternal => cause::MEI,
            Interrupt::Uart0Rx => cause::UART0_RX,
            Interrupt::Uart0Tx => cause::UART0_TX,
            Interrupt::Timer0 => cause::TIM0,
            Interrupt::Timer1 => cause::TIM1,
            Interrupt::GpioA0 => cause::GPIOA0,
            Interrupt::GpioA1 => cause::GPIOA1,
            Interrupt::GpioB0 => cause::GPIOB0,
            Interrupt::GpioB1 => cause::GPIOB1,
            Interrupt::GpioC0 => cause::GPIOC0,
            Interrupt::GpioC1 => cause::GPIOC1,
            Interrupt::Unknown(code) => code,
        }
    }
}

/// Synchronous trap causes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exception {
    InstructionMisaligned,
    InstructionAccessFault,
    IllegalInstruction,
    Breakpoint,
    LoadMisaligned,
    LoadAccessFault,
    StoreMisaligned,
    StoreAccessFault,
    UserEnvCall,
    SupervisorEnvCall,
    MachineEnvCall,
    InstructionPageFault,
    LoadPageFault,
    StorePageFault,
    Unknown(u32),
}

impl Exception {
    /// Names a synchronous cause from the code field of `mcause`.
    pub const fn from_code(code: u32) -> Self {
        match code {
            cause::INST_MISALIGNED => Exception::InstructionMisaligned,
            cause::INST_ACCESS_FAULT => Exception::InstructionAccessFault,
            cause::ILLEGAL_INST => Exception::IllegalInstruction,
            cause::BREAKPOINT => Exception::Breakpoint,
            cause::LOAD_MISALIGNED => Exception::LoadMisaligned,
            cause::LOAD_ACCESS_FAULT => Exception::LoadAccessFault,
            cause::STORE_MISALIGNED => Exception::StoreMisaligned,
            cause::STORE_ACCESS_FAULT => Exception::StoreAccessFault,
            cause::ECALL_UMODE => Exception::UserEnvCall,
            cause::ECALL_SMODE => Exception::SupervisorEnvCall,
            cause::ECALL_MMODE => Exception::MachineEnvCall,
            cause::INST_PAGE_FAULT => Exception::InstructionPageFault,
            cause::LOAD_PAGE_FAULT => Exception::LoadPageFault,
            cause::STORE_PAGE_FAULT => Exception::StorePageFault,
            other => Exception::Unknown(other),
        }
    }

    pub const fn code(self) -> u32 {
        match self {
            Exception::InstructionMisaligned => cause::INST_MISALIGNED,
            Exception::InstructionAccessFault => cause::INST_ACCESS_FAULT,
            Exception::IllegalInstruction => cause::ILLEGAL_INST,
            Exception::Breakpoint => cause::BREAKPOINT,
            Exception::LoadMisaligned => cause::LOAD_MISALIGNED,
            Exception::LoadAccessFault => cause::LOAD_ACCESS_FAULT,
            Exception::StoreMisaligned => cause::STORE_MISALIGNED,
            Exception::StoreAccessFault => cause::STORE_ACCESS_FAULT,
            Exception::UserEnvCall => cause::ECALL_UMODE,
            Exception::SupervisorEnvCall => cause::ECALL_SMODE,
            Exception::MachineEnvCall => cause::ECALL_MMODE,
            Exception::InstructionPageFault => cause::INST_PAGE_FAULT,
            Exception::LoadPageFault => cause::LOAD_PAGE_FAULT,
            Exception::StorePageFault => cause::STORE_PAGE_FAULT,
            Exception::Unknown(code) => code,
        }
    }

    /// Human readable name, used by the firmware's fatal trap report.
    pub const fn description(self) -> &'static str {
        match self {
            Exception::InstructionMisaligned => "Instruction address misaligned",
            Exception::InstructionAccessFault => "Instruction access fault",
            Exception::IllegalInstruction => "Illegal instruction",
            Exception::Breakpoint => "Breakpoint",
            Exception::LoadMisaligned => "Load address misaligned",
            Exception::LoadAccessFault => "Load access fault",
            Exception::StoreMisaligned => "Store address misaligned",
            Exception::StoreAccessFault => "Store access fault",
            Exception::UserEnvCall => "Environment call from U-mode",
            Exception::SupervisorEnvCall => "Environment call from S-mode",
            Exception::MachineEnvCall => "Environment call from M-mode",
            Exception::InstructionPageFault => "Instruction page fault",
            Exception::LoadPageFault => "Load page fault",
            Exception::StorePageFault => "Store page fault",
            Exception::Unknown(_) => "Unknown exception",
        }
    }
}

/// Decoded content of `mcause`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapCause {
    Interrupt(Interrupt),
    Exception(Exception),
}

impl TrapCause {
    /// Decodes a raw `mcause` value.
    pub const fn from_bits(mcause: u32) -> Self {
        let code = mcause & cause::CODE_MASK;
        if mcause & cause::INTERRUPT_FLAG != 0 {
            TrapCause::Interrupt(Interrupt::from_code(code))
        } else {
            TrapCause::Exception(Exception::from_code(code))
        }
    }

    /// Re-encodes the cause as `mcause` would hold it.
    pub const fn bits(self) -> u32 {
        match self {
            TrapCause::Interrupt(i) => cause::INTERRUPT_FLAG | i.code(),
            TrapCause::Exception(e) => e.code(),
        }
    }

    pub const fn is_interrupt(self) -> bool {
        matches!(self, TrapCause::Interrupt(_))
    }

    /// The cause code without the interrupt flag. For an interrupt this is
    /// also the source index used by the per-source operations.
    pub const fn code(self) -> u32 {
        self.bits() & cause::CODE_MASK
    }
}

impl fmt::Display for TrapCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrapCause::Interrupt(Interrupt::Unknown(code)) => {
                write!(f, "interrupt #{code}")
            }
            TrapCause::Interrupt(i) => write!(f, "interrupt {i:?}"),
            TrapCause::Exception(e) => write!(f, "{} (#{})", e.description(), e.code()),
        }
    }
}

/// Switches of the machine-mode trap unit.
///
/// Holds only a reference to the bus, so a controller is free to build
/// wherever one is needed, including inside the trap handler. Every method
/// is one or two CSR accesses; none of them can fail.
///
/// Source indices are the interrupt codes of `lex_common::cause`, which are
/// also the bit positions in `mie` and `mip`. Indices of 32 or more wrap, as
/// the hardware shift would.
pub struct TrapController<'a, B: CsrBus + ?Sized> {
    bus: &'a B,
}

impl<'a, B: CsrBus + ?Sized> TrapController<'a, B> {
    pub const fn new(bus: &'a B) -> Self {
        Self { bus }
    }

    /// Sets `mstatus.MIE`.
    #[inline]
    pub fn enable(&self) {
        self.bus.csr_set(Csr::Mstatus, Mstatus::MIE.bits());
    }

    /// Clears `mstatus.MIE`.
    #[inline]
    pub fn disable(&self) {
        self.bus.csr_clear(Csr::Mstatus, Mstatus::MIE.bits());
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        Mstatus::from_bits_truncate(self.bus.csr_read(Csr::Mstatus)).contains(Mstatus::MIE)
    }

    /// Runs `f` with global interrupts disabled.
    ///
    /// The previous enable state is restored afterwards, so critical sections
    /// nest. Tick advancement stops for the duration.
    pub fn free<R>(&self, f: impl FnOnce() -> R) -> R {
        let was_enabled = self.is_enabled();
        self.disable();
        let result = f();
        if was_enabled {
            self.enable();
        }
        result
    }

    /// Reads back the vector mode from `mtvec`.
    pub fn mode(&self) -> TrapMode {
        TrapMode::from_mtvec(self.bus.csr_read(Csr::Mtvec))
    }

    /// Reads back the vector base from `mtvec`, without the mode bits.
    pub fn base(&self) -> u32 {
        self.bus.csr_read(Csr::Mtvec) & mtvec::BASE_MASK
    }

    /// Switches to direct mode, keeping the current base.
    pub fn set_direct(&self) {
        self.bus.csr_clear(Csr::Mtvec, mtvec::MODE_MASK);
        log::debug!("trap vector: direct @ {:#010x}", self.base());
    }

    /// Programs `base` in direct mode.
    ///
    /// The low two bits of `base` are dropped, as the hardware would.
    pub fn set_direct_base(&self, base: u32) {
        self.write_vector(base, TrapMode::Direct);
    }

    /// Programs `base` in vectored mode.
    ///
    /// The low two bits of `base` are dropped, as the hardware would.
    pub fn set_vectored(&self, base: u32) {
        self.write_vector(base, TrapMode::Vectored);
    }

    fn write_vector(&self, base: u32, mode: TrapMode) {
        self.bus
            .csr_write(Csr::Mtvec, (base & mtvec::BASE_MASK) | mode.bits());
        log::debug!("trap vector: {:?} @ {:#010x}", mode, base & mtvec::BASE_MASK);
    }

    /// Unmasks one interrupt source with a single `csrs` on `mie`.
    ///
    /// The pending bit of the source is not touched, so an interrupt that
    /// was already pending is taken as soon as global interrupts allow it.
    ///
    /// # Arguments
    ///
    /// * `index` - Source index, e.g. [`cause::MTI`]
    #[inline]
    pub fn enable_source(&self, index: u32) {
        self.bus.csr_set(Csr::Mie, bit(index));
    }

    /// Masks one interrupt source with a single `csrc` on `mie`.
    #[inline]
    pub fn disable_source(&self, index: u32) {
        self.bus.csr_clear(Csr::Mie, bit(index));
    }

    #[inline]
    pub fn is_source_enabled(&self, index: u32) -> bool {
        self.bus.csr_read(Csr::Mie) & bit(index) != 0
    }

    /// Whether `index` is pending in `mip`, enabled or not.
    #[inline]
    pub fn is_pending(&self, index: u32) -> bool {
        self.bus.csr_read(Csr::Mip) & bit(index) != 0
    }

    /// Raises a source from software, for testing handlers.
    ///
    /// Sources whose pending bit is driven by hardware (the machine timer)
    /// ignore this.
    #[inline]
    pub fn set_pending(&self, index: u32) {
        self.bus.csr_set(Csr::Mip, bit(index));
    }

    /// Acknowledges a software-clearable source.
    ///
    /// The machine timer is only cleared by moving `mtimecmp` past `mtime`.
    #[inline]
    pub fn clear_pending(&self, index: u32) {
        self.bus.csr_clear(Csr::Mip, bit(index));
    }

    /// Whether the trap being handled is an interrupt.
    #[inline]
    pub fn is_interrupt(&self) -> bool {
        self.bus.csr_read(Csr::Mcause) & cause::INTERRUPT_FLAG != 0
    }

    /// Decodes `mcause` of the trap being handled.
    ///
    /// # Returns
    ///
    /// The interrupt source or exception, with unnamed codes preserved in
    /// the `Unknown` variants.
    pub fn cause(&self) -> TrapCause {
        TrapCause::from_bits(self.bus.csr_read(Csr::Mcause))
    }

    /// Address of the instruction that trapped (`mepc`).
    pub fn epc(&self) -> u32 {
        self.bus.csr_read(Csr::Mepc)
    }

    /// Trap-specific value (`mtval`), e.g. the faulting address.
    pub fn tval(&self) -> u32 {
        self.bus.csr_read(Csr::Mtval)
    }

    /// Byte order of machine-mode data accesses, from `mstatush.MBE`.
    pub fn endianness(&self) -> Endianness {
        if Mstatush::from_bits_truncate(self.bus.csr_read(Csr::Mstatush)).contains(Mstatush::MBE)
        {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }

    pub fn set_big_endian(&self) {
        self.bus.csr_set(Csr::Mstatush, Mstatush::MBE.bits());
    }

    pub fn set_little_endian(&self) {
        self.bus.csr_clear(Csr::Mstatush, Mstatush::MBE.bits());
    }
}

/// Work run when a bound interrupt is taken.
///
/// Implementations run with global interrupts disabled and must return
/// without waiting on anything the interrupt itself would provide.
pub trait InterruptHandler {
    fn handle(&self);
}

/// Outcome of dispatching one trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A bound handler ran to completion.
    Handled,
    /// Nothing is bound for this cause; the caller decides what to do.
    Unhandled(TrapCause),
}

/// Binds handlers to the recognized trap source.
///
/// Only the machine timer interrupt is dispatched. Every other cause,
/// including all synchronous exceptions, is reported back as
/// [`Dispatch::Unhandled`].
pub struct TrapDispatcher<'a> {
    timer: Option<&'a dyn InterruptHandler>,
}

impl<'a> TrapDispatcher<'a> {
    pub const fn new() -> Self {
        Self { timer: None }
    }

    /// Binds the machine timer interrupt.
    ///
    /// Must happen before the timer source is enabled. A later call
    /// replaces the previous handler.
    ///
    /// # Arguments
    ///
    /// * `handler` - Run to completion, with interrupts disabled, on every
    ///   machine timer interrupt
    pub fn bind_timer(&mut self, handler: &'a dyn InterruptHandler) {
        self.timer = Some(handler);
    }

    pub fn unbind_timer(&mut self) {
        self.timer = None;
    }

    pub fn is_timer_bound(&self) -> bool {
        self.timer.is_some()
    }

    /// Runs the handler bound for `cause`, if any.
    ///
    /// # Returns
    ///
    /// [`Dispatch::Handled`] once the bound handler has returned, otherwise
    /// [`Dispatch::Unhandled`] carrying `cause` back to the caller.
    pub fn dispatch(&self, cause: TrapCause) -> Dispatch {
        match (cause, self.timer) {
            (TrapCause::Interrupt(Interrupt::MachineTimer), Some(handler)) => {
                handler.handle();
                Dispatch::Handled
            }
            _ => Dispatch::Unhandled(cause),
        }
    }
}

impl Default for TrapDispatcher<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Entry point of the trap path: reads `mcause` and dispatches it.
///
/// Called from the firmware's trap vector after the caller-saved registers
/// are stored, and from the simulator when it delivers an interrupt. The
/// pending condition is not acknowledged here; for the timer the bound
/// handler clears it by moving the compare register.
///
/// # Arguments
///
/// * `bus` - The hart whose `mcause` describes the trap
/// * `dispatcher` - Handler bindings made during initialization
pub fn handle_trap<B: CsrBus + ?Sized>(bus: &B, dispatcher: &TrapDispatcher<'_>) -> Dispatch {
    dispatcher.dispatch(TrapCause::from_bits(bus.csr_read(Csr::Mcause)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeBus;
    use core::cell::Cell;

    struct Counting(Cell<u32>);

    impl InterruptHandler for Counting {
        fn handle(&self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn global_enable_toggles_only_mie() {
        let bus = FakeBus::new();
        bus.csr_write(Csr::Mstatus, Mstatus::MPIE.bits());
        let traps = TrapController::new(&bus);
        assert!(!traps.is_enabled());
        traps.enable();
        assert!(traps.is_enabled());
        assert_eq!(bus.csr_read(Csr::Mstatus), (Mstatus::MIE | Mstatus::MPIE).bits());
        traps.disable();
        assert!(!traps.is_enabled());
        assert_eq!(bus.csr_read(Csr::Mstatus), Mstatus::MPIE.bits());
    }

    #[test]
    fn misaligned_vector_base_is_masked_not_rejected() {
        let bus = FakeBus::new();
        let traps = TrapController::new(&bus);
        traps.set_vectored(0x1000_0003);
        assert_eq!(traps.base(), 0x1000_0000);
        assert_eq!(traps.mode(), TrapMode::Vectored);
        assert_eq!(bus.csr_read(Csr::Mtvec), 0x1000_0001);
    }

    #[test]
    fn set_direct_keeps_the_base() {
        let bus = FakeBus::new();
        let traps = TrapController::new(&bus);
        traps.set_vectored(0x8000_0100);
        traps.set_direct();
        assert_eq!(traps.mode(), TrapMode::Direct);
        assert_eq!(traps.base(), 0x8000_0100);
        traps.set_direct_base(0x2000_0006);
        assert_eq!(bus.csr_read(Csr::Mtvec), 0x2000_0004);
    }

    #[test]
    fn source_mask_does_not_touch_pending() {
        let bus = FakeBus::new();
        let traps = TrapController::new(&bus);
        traps.set_pending(cause::UART0_RX);
        traps.enable_source(cause::UART0_RX);
        assert!(traps.is_source_enabled(cause::UART0_RX));
        traps.disable_source(cause::UART0_RX);
        assert!(!traps.is_source_enabled(cause::UART0_RX));
        assert!(traps.is_pending(cause::UART0_RX));
        traps.clear_pending(cause::UART0_RX);
        assert!(!traps.is_pending(cause::UART0_RX));
    }

    #[test]
    fn per_source_operations_leave_other_bits_alone() {
        let bus = FakeBus::new();
        let traps = TrapController::new(&bus);
        bus.csr_write(Csr::Mie, 0xFFFF_0000);
        traps.enable_source(cause::MTI);
        traps.disable_source(cause::GPIOC1);
        assert_eq!(bus.csr_read(Csr::Mie), 0xFDFF_0080);
    }

    #[test]
    fn cause_decoding_separates_interrupts_from_exceptions() {
        let bus = FakeBus::new();
        let traps = TrapController::new(&bus);

        bus.csr_write(Csr::Mcause, 0x8000_0007);
        assert!(traps.is_interrupt());
        assert_eq!(traps.cause(), TrapCause::Interrupt(Interrupt::MachineTimer));

        bus.csr_write(Csr::Mcause, 7);
        assert!(!traps.is_interrupt());
        assert_eq!(traps.cause(), TrapCause::Exception(Exception::StoreAccessFault));

        bus.csr_write(Csr::Mcause, 0x8000_0018);
        assert_eq!(traps.cause(), TrapCause::Interrupt(Interrupt::GpioC0));

        bus.csr_write(Csr::Mcause, 0x8000_001F);
        assert_eq!(traps.cause(), TrapCause::Interrupt(Interrupt::Unknown(31)));
    }

    #[test]
    fn every_code_survives_decode_and_encode() {
        for code in 0..32 {
            for raw in [code, cause::INTERRUPT_FLAG | code] {
                let decoded = TrapCause::from_bits(raw);
                assert_eq!(decoded.bits(), raw);
                assert_eq!(decoded.code(), code);
            }
        }
    }

    #[test]
    fn free_restores_previous_enable_state() {
        let bus = FakeBus::new();
        let traps = TrapController::new(&bus);
        traps.enable();
        let inside = traps.free(|| traps.is_enabled());
        assert!(!inside);
        assert!(traps.is_enabled());

        traps.disable();
        traps.free(|| ());
        assert!(!traps.is_enabled());
    }

    #[test]
    fn endianness_follows_mbe() {
        let bus = FakeBus::new();
        let traps = TrapController::new(&bus);
        assert_eq!(traps.endianness(), Endianness::Little);
        traps.set_big_endian();
        assert_eq!(bus.csr_read(Csr::Mstatush), 0x20);
        assert_eq!(traps.endianness(), Endianness::Big);
        traps.set_little_endian();
        assert_eq!(traps.endianness(), Endianness::Little);
    }

    #[test]
    fn dispatcher_runs_only_the_bound_timer_handler() {
        let bus = FakeBus::new();
        let counter = Counting(Cell::new(0));
        let mut dispatcher = TrapDispatcher::new();

        bus.csr_write(Csr::Mcause, 0x8000_0007);
        assert_eq!(
            handle_trap(&bus, &dispatcher),
            Dispatch::Unhandled(TrapCause::Interrupt(Interrupt::MachineTimer))
        );

        dispatcher.bind_timer(&counter);
        assert_eq!(handle_trap(&bus, &dispatcher), Dispatch::Handled);
        assert_eq!(counter.0.get(), 1);

        bus.csr_write(Csr::Mcause, cause::ILLEGAL_INST);
        assert_eq!(
            handle_trap(&bus, &dispatcher),
            Dispatch::Unhandled(TrapCause::Exception(Exception::IllegalInstruction))
        );
        assert_eq!(counter.0.get(), 1);
    }

    #[test]
    fn unbound_timer_is_reported_again() {
        let bus = FakeBus::new();
        let counter = Counting(Cell::new(0));
        let mut dispatcher = TrapDispatcher::default();
        assert!(!dispatcher.is_timer_bound());

        dispatcher.bind_timer(&counter);
        assert!(dispatcher.is_timer_bound());
        dispatcher.unbind_timer();
        assert!(!dispatcher.is_timer_bound());

        bus.csr_write(Csr::Mcause, 0x8000_0007);
        assert_eq!(
            handle_trap(&bus, &dispatcher),
            Dispatch::Unhandled(TrapCause::Interrupt(Interrupt::MachineTimer))
        );
        assert_eq!(counter.0.get(), 0);
    }
}
