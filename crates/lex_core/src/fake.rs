//! In-memory bus for unit tests.
//!
//! Registers are plain storage: nothing advances on its own and no interrupt
//! is ever delivered. Stores are logged so tests can check write ordering.

use core::cell::RefCell;
use std::collections::BTreeMap;
use std::vec::Vec;

use crate::reg::{Csr, CsrBus, MmioBus};

pub struct FakeBus {
    csrs: RefCell<[u32; Csr::COUNT]>,
    mmio: RefCell<BTreeMap<usize, u32>>,
    stores: RefCell<Vec<(usize, u32)>>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self {
            csrs: RefCell::new([0; Csr::COUNT]),
            mmio: RefCell::new(BTreeMap::new()),
            stores: RefCell::new(Vec::new()),
        }
    }

    /// Every MMIO store performed so far, oldest first.
    pub fn stores(&self) -> Vec<(usize, u32)> {
        self.stores.borrow().clone()
    }

    /// Sets a word without logging it, as a device would.
    pub fn poke(&self, addr: usize, value: u32) {
        self.mmio.borrow_mut().insert(addr, value);
    }
}

impl CsrBus for FakeBus {
    fn csr_read(&self, csr: Csr) -> u32 {
        self.csrs.borrow()[csr.index()]
    }

    fn csr_write(&self, csr: Csr, value: u32) {
        self.csrs.borrow_mut()[csr.index()] = value;
    }

    fn csr_set(&self, csr: Csr, mask: u32) {
        self.csrs.borrow_mut()[csr.index()] |= mask;
    }

    fn csr_clear(&self, csr: Csr, mask: u32) {
        self.csrs.borrow_mut()[csr.index()] &= !mask;
    }

    fn csr_swap(&self, csr: Csr, value: u32) -> u32 {
        core::mem::replace(&mut self.csrs.borrow_mut()[csr.index()], value)
    }
}

impl MmioBus for FakeBus {
    fn load(&self, addr: usize) -> u32 {
        self.mmio.borrow().get(&addr).copied().unwrap_or(0)
    }

    fn store(&self, addr: usize, value: u32) {
        self.stores.borrow_mut().push((addr, value));
        self.mmio.borrow_mut().insert(addr, value);
    }
}
