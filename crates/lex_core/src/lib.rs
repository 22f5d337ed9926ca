//! Hardware abstraction layer for the Lexington RV32 microcontroller.
//!
//! This crate provides machine-mode access to the control and status
//! registers, the trap and interrupt controller, the 64-bit machine timer and
//! the GPIO and UART peripherals. Every driver is generic over the register
//! primitive layer, so the same code runs on silicon through
//! [`hart::Hart`] and on the host against a simulated machine.

#![cfg_attr(not(test), no_std)]

/// Register primitive layer.
///
/// Defines the closed set of CSRs and the [`reg::CsrBus`] and
/// [`reg::MmioBus`] traits whose methods each map to one indivisible
/// hardware operation. All higher layers are written against these traits.
pub mod reg;

/// Composite 64-bit registers.
///
/// Implements the read-retry and low-first write protocols used for every
/// value the hardware exposes as two 32-bit halves: `mtime`, `mtimecmp`,
/// `cycle` and `instret`.
pub mod split;

/// RV32 hardware backend using inline `csr*` instructions.
#[cfg(target_arch = "riscv32")]
pub mod hart;

/// Machine-mode trap controller.
///
/// Global enable, vector configuration, per-source masks and pending bits,
/// cause decoding and dispatch of the machine timer interrupt to a bound
/// handler.
pub mod trap;

/// Machine timer and millisecond tick.
///
/// Reads and writes the free-running counter and the compare register with
/// the composite protocols, re-arms the compare register on every match and
/// provides blocking delays.
pub mod timer;

pub mod counters;

/// GPIO bank driver.
pub mod gpio;

/// Polled UART driver.
pub mod uart;

/// GPIO mirror and blink demonstrations.
pub mod app;

#[cfg(test)]
mod fake;
