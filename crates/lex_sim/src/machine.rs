//! Simulated Lexington machine.
//!
//! Every bus access is treated as one instruction. Before the access takes
//! effect the machine reaches an *access boundary*: the free-running counter
//! advances by `ticks_per_access`, the cycle and instruction counters step,
//! and if global interrupts are enabled and an enabled source is pending the
//! installed trap handler runs to completion. While the handler runs,
//! `mstatus.MIE` is cleared and `MPIE` holds its previous value; both are
//! restored on return, as `mret` would.
//!
//! This reproduces the only concurrency the real hart has: preemption of
//! mainline code between any two register accesses.

use std::cell::{Cell, RefCell};

use lex_common::cause;
use lex_common::flags::{Mstatus, Mstatush};
use lex_common::mmio::{
    GPIO_INT_CONF, MTIME_HI, MTIME_LO, MTIMECMP_HI, MTIMECMP_LO, MemoryMap, UART_CONF,
};
use lex_common::mtvec;
use lex_core::reg::{Csr, CsrBus, MmioBus, bit};
use lex_core::split::{halves, join};

use crate::devices::{GpioBank, GpioPort, UartDevice};

/// Code run when the simulated hart takes a trap.
pub type TrapHandler = Box<dyn FnMut(&Machine)>;

enum Target {
    Timer(usize),
    Uart(usize),
    Gpio(GpioPort, usize),
    Unmapped,
}

/// A single-hart Lexington core with its peripherals.
pub struct Machine {
    map: MemoryMap,
    csrs: RefCell<[u32; Csr::COUNT]>,
    mtime: Cell<u64>,
    mtimecmp: Cell<u64>,
    cycles: Cell<u64>,
    instret: Cell<u64>,
    ticks_per_access: Cell<u64>,
    entry_latency: Cell<u64>,
    handler: RefCell<Option<TrapHandler>>,
    in_trap: Cell<bool>,
    traps_taken: Cell<u64>,
    compare_trace: RefCell<Vec<u64>>,
    gpio: [GpioBank; 3],
    uart: UartDevice,
}

impl Machine {
    /// Creates a machine with the reference memory map.
    ///
    /// The counter starts frozen at zero; see
    /// [`set_ticks_per_access`](Self::set_ticks_per_access).
    pub fn new() -> Self {
        Self::with_map(MemoryMap::LEXINGTON)
    }

    /// Creates a machine whose peripherals sit at the bases in `map`.
    pub fn with_map(map: MemoryMap) -> Self {
        Self {
            map,
            csrs: RefCell::new([0; Csr::COUNT]),
            mtime: Cell::new(0),
            mtimecmp: Cell::new(u64::MAX),
            cycles: Cell::new(0),
            instret: Cell::new(0),
            ticks_per_access: Cell::new(0),
            entry_latency: Cell::new(0),
            handler: RefCell::new(None),
            in_trap: Cell::new(false),
            traps_taken: Cell::new(0),
            compare_trace: RefCell::new(Vec::new()),
            gpio: Default::default(),
            uart: UartDevice::default(),
        }
    }

    pub fn map(&self) -> MemoryMap {
        self.map
    }

    /// Counter ticks that elapse before every bus access. Zero freezes the
    /// counter between explicit [`advance`](Self::advance) calls.
    pub fn set_ticks_per_access(&self, ticks: u64) {
        self.ticks_per_access.set(ticks);
    }

    pub fn ticks_per_access(&self) -> u64 {
        self.ticks_per_access.get()
    }

    /// Counter ticks consumed between taking a trap and the first
    /// instruction of the handler.
    pub fn set_entry_latency(&self, ticks: u64) {
        self.entry_latency.set(ticks);
    }

    /// Installs the code run on every trap, replacing any previous handler.
    pub fn set_trap_handler(&self, handler: impl FnMut(&Machine) + 'static) {
        *self.handler.borrow_mut() = Some(Box::new(handler));
    }

    pub fn clear_trap_handler(&self) {
        self.handler.borrow_mut().take();
    }

    /// Counter value, observed without an access boundary.
    pub fn time(&self) -> u64 {
        self.mtime.get()
    }

    /// Compare value, observed without an access boundary.
    pub fn compare(&self) -> u64 {
        self.mtimecmp.get()
    }

    pub fn traps_taken(&self) -> u64 {
        self.traps_taken.get()
    }

    /// Bus accesses executed so far.
    pub fn accesses(&self) -> u64 {
        self.instret.get()
    }

    /// Whether the hart is currently inside the trap handler.
    pub fn in_trap(&self) -> bool {
        self.in_trap.get()
    }

    /// Every value the compare register held after each store to one of its
    /// halves, oldest first.
    pub fn compare_trace(&self) -> Vec<u64> {
        self.compare_trace.borrow().clone()
    }

    pub fn clear_compare_trace(&self) {
        self.compare_trace.borrow_mut().clear();
    }

    pub fn gpio(&self, port: GpioPort) -> &GpioBank {
        &self.gpio[port.index()]
    }

    pub fn uart(&self) -> &UartDevice {
        &self.uart
    }

    /// Lets `ticks` counter ticks elapse one at a time with the hart idle,
    /// taking interrupts as they become pending.
    pub fn advance(&self, ticks: u64) {
        for _ in 0..ticks {
            self.mtime.set(self.mtime.get().wrapping_add(1));
            self.deliver();
        }
    }

    fn boundary(&self) {
        self.mtime
            .set(self.mtime.get().wrapping_add(self.ticks_per_access.get()));
        self.cycles.set(self.cycles.get().wrapping_add(1));
        self.instret.set(self.instret.get().wrapping_add(1));
        self.deliver();
    }

    fn timer_pending(&self) -> bool {
        self.mtime.get() >= self.mtimecmp.get()
    }

    fn raw(&self, csr: Csr) -> u32 {
        self.csrs.borrow()[csr.index()]
    }

    fn set_raw(&self, csr: Csr, value: u32) {
        self.csrs.borrow_mut()[csr.index()] = value;
    }

    fn pending_enabled(&self) -> u32 {
        self.csr_value(Csr::Mip) & self.raw(Csr::Mie)
    }

    /// Takes at most one interrupt. After the handler returns the next access
    /// boundary may take another, as the instruction after `mret` would.
    fn deliver(&self) {
        if self.in_trap.get() {
            return;
        }
        let mstatus = Mstatus::from_bits_truncate(self.raw(Csr::Mstatus));
        if !mstatus.contains(Mstatus::MIE) {
            return;
        }
        let pending = self.pending_enabled();
        if pending == 0 {
            return;
        }
        let Some(mut handler) = self.handler.borrow_mut().take() else {
            return;
        };

        let code = pending.trailing_zeros();
        self.set_raw(Csr::Mcause, cause::INTERRUPT_FLAG | code);
        self.set_raw(Csr::Mepc, self.cycles.get() as u32);
        self.set_raw(Csr::Mtval, 0);
        self.set_raw(Csr::Mstatus, (mstatus - Mstatus::MIE | Mstatus::MPIE).bits());
        self.in_trap.set(true);
        self.traps_taken.set(self.traps_taken.get() + 1);
        self.mtime
            .set(self.mtime.get().wrapping_add(self.entry_latency.get()));

        handler(self);

        let mut slot = self.handler.borrow_mut();
        if slot.is_none() {
            *slot = Some(handler);
        }
        drop(slot);

        let after = Mstatus::from_bits_truncate(self.raw(Csr::Mstatus));
        let restored = if after.contains(Mstatus::MPIE) {
            after | Mstatus::MIE
        } else {
            after - Mstatus::MIE
        };
        self.set_raw(Csr::Mstatus, restored.bits());
        self.in_trap.set(false);
    }

    /// Architectural value of a CSR, without an access boundary.
    fn csr_value(&self, csr: Csr) -> u32 {
        match csr {
            Csr::Mip => {
                let timer = if self.timer_pending() { bit(cause::MTI) } else { 0 };
                (self.raw(Csr::Mip) & !bit(cause::MTI)) | timer
            }
            Csr::Time => halves(self.mtime.get()).1,
            Csr::Timeh => halves(self.mtime.get()).0,
            Csr::Cycle | Csr::Mcycle => halves(self.cycles.get()).1,
            Csr::Cycleh | Csr::Mcycleh => halves(self.cycles.get()).0,
            Csr::Instret | Csr::Minstret => halves(self.instret.get()).1,
            Csr::Instreth | Csr::Minstreth => halves(self.instret.get()).0,
            other => self.raw(other),
        }
    }

    /// Applies a CSR write with each register's write-any-read-legal rules.
    fn write_csr(&self, csr: Csr, value: u32) {
        if csr.is_read_only() {
            log::warn!("sim: write to read-only {csr:?} ignored");
            return;
        }
        match csr {
            Csr::Mstatus => {
                let legal = Mstatus::from_bits_truncate(value);
                self.set_raw(csr, legal.bits());
            }
            Csr::Mstatush => {
                let legal = Mstatush::from_bits_truncate(value);
                self.set_raw(csr, legal.bits());
            }
            Csr::Mtvec => {
                let mode = value & mtvec::MODE_MASK;
                let mode = if mode == mtvec::MODE_VECTORED {
                    mtvec::MODE_VECTORED
                } else {
                    mtvec::MODE_DIRECT
                };
                self.set_raw(csr, (value & mtvec::BASE_MASK) | mode);
            }
            Csr::Mip => self.set_raw(csr, value & !bit(cause::MTI)),
            Csr::Mcycle => {
                let (high, _) = halves(self.cycles.get());
                self.cycles.set(join(high, value));
            }
            Csr::Mcycleh => {
                let (_, low) = halves(self.cycles.get());
                self.cycles.set(join(value, low));
            }
            Csr::Minstret => {
                let (high, _) = halves(self.instret.get());
                self.instret.set(join(high, value));
            }
            Csr::Minstreth => {
                let (_, low) = halves(self.instret.get());
                self.instret.set(join(value, low));
            }
            other => self.set_raw(other, value),
        }
    }

    fn decode(&self, addr: usize) -> Target {
        let in_bank = |base: usize, len: usize| addr.checked_sub(base).filter(|off| *off < len);
        if let Some(off) = in_bank(self.map.timer, MTIMECMP_HI + 4) {
            return Target::Timer(off);
        }
        if let Some(off) = in_bank(self.map.uart0, UART_CONF + 4) {
            return Target::Uart(off);
        }
        let gpio_len = GPIO_INT_CONF + 4;
        let bases = [self.map.gpioa, self.map.gpiob, self.map.gpioc];
        for (port, base) in GpioPort::ALL.into_iter().zip(bases) {
            if let Some(off) = in_bank(base, gpio_len) {
                return Target::Gpio(port, off);
            }
        }
        Target::Unmapped
    }

    fn timer_load(&self, offset: usize) -> Option<u32> {
        match offset {
            MTIME_LO => Some(halves(self.mtime.get()).1),
            MTIME_HI => Some(halves(self.mtime.get()).0),
            MTIMECMP_LO => Some(halves(self.mtimecmp.get()).1),
            MTIMECMP_HI => Some(halves(self.mtimecmp.get()).0),
            _ => None,
        }
    }

    fn timer_store(&self, offset: usize, value: u32) -> bool {
        let (time_high, time_low) = halves(self.mtime.get());
        let (cmp_high, cmp_low) = halves(self.mtimecmp.get());
        match offset {
            MTIME_LO => self.mtime.set(join(time_high, value)),
            MTIME_HI => self.mtime.set(join(value, time_low)),
            MTIMECMP_LO => self.mtimecmp.set(join(cmp_high, value)),
            MTIMECMP_HI => self.mtimecmp.set(join(value, cmp_low)),
            _ => return false,
        }
        if offset == MTIMECMP_LO || offset == MTIMECMP_HI {
            self.compare_trace.borrow_mut().push(self.mtimecmp.get());
        }
        true
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl CsrBus for Machine {
    fn csr_read(&self, csr: Csr) -> u32 {
        self.boundary();
        self.csr_value(csr)
    }

    fn csr_write(&self, csr: Csr, value: u32) {
        self.boundary();
        self.write_csr(csr, value);
    }

    fn csr_set(&self, csr: Csr, mask: u32) {
        self.boundary();
        self.write_csr(csr, self.csr_value(csr) | mask);
    }

    fn csr_clear(&self, csr: Csr, mask: u32) {
        self.boundary();
        self.write_csr(csr, self.csr_value(csr) & !mask);
    }

    fn csr_swap(&self, csr: Csr, value: u32) -> u32 {
        self.boundary();
        let previous = self.csr_value(csr);
        self.write_csr(csr, value);
        previous
    }
}

impl MmioBus for Machine {
    fn load(&self, addr: usize) -> u32 {
        self.boundary();
        let value = match self.decode(addr) {
            Target::Timer(off) => self.timer_load(off),
            Target::Uart(off) => self.uart.load(off),
            Target::Gpio(port, off) => self.gpio(port).load(off),
            Target::Unmapped => None,
        };
        value.unwrap_or_else(|| {
            log::warn!("sim: load from unmapped {addr:#010x}");
            0
        })
    }

    fn store(&self, addr: usize, value: u32) {
        self.boundary();
        let mapped = match self.decode(addr) {
            Target::Timer(off) => self.timer_store(off, value),
            Target::Uart(off) => self.uart.store(off, value),
            Target::Gpio(port, off) => self.gpio(port).store(off, value),
            Target::Unmapped => false,
        };
        if !mapped {
            log::warn!("sim: store of {value:#x} to unmapped {addr:#010x}");
        }
    }
}
