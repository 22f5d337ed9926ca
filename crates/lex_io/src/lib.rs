//! I/O utilities for the host-side Lexington tools.
//!
//! Provides functions for reading memory-map descriptions, used to retarget
//! the drivers to a board with a different peripheral layout, and GPIO
//! stimulus streams (.b8 files) replayed into the simulator.

/// Loader for raw GPIO stimulus streams.
///
/// Reads .b8 files into bit vectors and slices them into one input word per
/// frame. Also writes streams back, so test fixtures can be generated from
/// the command line.
pub mod loader;

/// Parser for memory-map description files.
///
/// Parses the line-oriented `<name> <address>` format into a `MemoryMap`,
/// keeping the reference layout for every bank the file does not mention.
pub mod parser;
