//! Performance counters and hart identification.

use crate::reg::{Csr, CsrBus};
use crate::split::CsrPair;

/// Cycles executed since reset, read through `cycle`/`cycleh`.
pub fn cycles<B: CsrBus + ?Sized>(bus: &B) -> u64 {
    CsrPair::new(bus, Csr::Cycle, Csr::Cycleh).get()
}

/// Instructions retired since reset, read through `instret`/`instreth`.
pub fn instructions_retired<B: CsrBus + ?Sized>(bus: &B) -> u64 {
    CsrPair::new(bus, Csr::Instret, Csr::Instreth).get()
}

/// Identification registers of the running hart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HartInfo {
    pub hart_id: u32,
    pub vendor_id: u32,
    pub arch_id: u32,
    pub impl_id: u32,
}

impl HartInfo {
    pub fn read<B: CsrBus + ?Sized>(bus: &B) -> Self {
        Self {
            hart_id: bus.csr_read(Csr::Mhartid),
            vendor_id: bus.csr_read(Csr::Mvendorid),
            arch_id: bus.csr_read(Csr::Marchid),
            impl_id: bus.csr_read(Csr::Mimpid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeBus;

    #[test]
    fn counters_join_their_halves() {
        let bus = FakeBus::new();
        bus.csr_write(Csr::Instret, 0xFFFF_FFFF);
        bus.csr_write(Csr::Instreth, 0x7);
        bus.csr_write(Csr::Cycle, 3);
        assert_eq!(instructions_retired(&bus), 0x7_FFFF_FFFF);
        assert_eq!(cycles(&bus), 3);
    }

    #[test]
    fn hart_info_reads_identification_registers() {
        let bus = FakeBus::new();
        bus.csr_write(Csr::Mvendorid, 0x5AB);
        bus.csr_write(Csr::Mhartid, 0);
        let info = HartInfo::read(&bus);
        assert_eq!(info.vendor_id, 0x5AB);
        assert_eq!(info.hart_id, 0);
        assert_eq!(info.arch_id, 0);
    }
}
