//! Parser for memory-map description files.
//!
//! One entry per line, `<name> <address>`, where the name is one of `timer`,
//! `uart0`, `gpioa`, `gpiob` or `gpioc` and the address is a `0x`-prefixed
//! hex or a decimal number; `_` may separate digits. `#` starts a comment.
//!
//! ```text
//! # Lexington on the FPGA shell
//! timer 0x4000_0000
//! gpioa 0x4000_1000
//! ```

use std::fmt::Write;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use lex_common::mmio::MemoryMap;
use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::{tag_no_case, take_while1};
use nom::character::complete::{space0, space1};
use nom::combinator::{all_consuming, map_res};
use nom::sequence::{preceded, separated_pair, terminated};

/// A peripheral bank that can be placed by a description file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
    Timer,
    Uart0,
    GpioA,
    GpioB,
    GpioC,
}

impl Bank {
    pub const ALL: [Bank; 5] = [Bank::Timer, Bank::Uart0, Bank::GpioA, Bank::GpioB, Bank::GpioC];

    pub fn from_name(name: &str) -> Option<Bank> {
        Bank::ALL.into_iter().find(|bank| bank.name() == name)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Bank::Timer => "timer",
            Bank::Uart0 => "uart0",
            Bank::GpioA => "gpioa",
            Bank::GpioB => "gpiob",
            Bank::GpioC => "gpioc",
        }
    }

    fn slot(self, map: &mut MemoryMap) -> &mut usize {
        match self {
            Bank::Timer => &mut map.timer,
            Bank::Uart0 => &mut map.uart0,
            Bank::GpioA => &mut map.gpioa,
            Bank::GpioB => &mut map.gpiob,
            Bank::GpioC => &mut map.gpioc,
        }
    }

    pub fn base(self, map: &MemoryMap) -> usize {
        match self {
            Bank::Timer => map.timer,
            Bank::Uart0 => map.uart0,
            Bank::GpioA => map.gpioa,
            Bank::GpioB => map.gpiob,
            Bank::GpioC => map.gpioc,
        }
    }
}

fn name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn hex(input: &str) -> IResult<&str, u32> {
    map_res(
        preceded(
            tag_no_case("0x"),
            take_while1(|c: char| c.is_ascii_hexdigit() || c == '_'),
        ),
        |digits: &str| u32::from_str_radix(&digits.replace('_', ""), 16),
    )(input)
}

fn decimal(input: &str) -> IResult<&str, u32> {
    map_res(
        take_while1(|c: char| c.is_ascii_digit() || c == '_'),
        |digits: &str| digits.replace('_', "").parse::<u32>(),
    )(input)
}

fn entry(input: &str) -> IResult<&str, (&str, u32)> {
    all_consuming(terminated(
        separated_pair(name, space1, alt((hex, decimal))),
        space0,
    ))(input)
}

/// Parses a description, starting from the reference layout.
pub fn parse_map(text: &str) -> Result<MemoryMap> {
    let mut map = MemoryMap::LEXINGTON;
    let mut seen: Vec<Bank> = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let (_, (bank_name, address)) = entry(line)
            .map_err(|e| anyhow!("line {line_no}: expected `<name> <address>`: {e}"))?;
        let bank = Bank::from_name(bank_name)
            .ok_or_else(|| anyhow!("line {line_no}: unknown bank `{bank_name}`"))?;
        if seen.contains(&bank) {
            bail!("line {line_no}: `{bank_name}` placed twice");
        }
        if address % 4 != 0 {
            bail!("line {line_no}: `{bank_name}` base {address:#x} is not word aligned");
        }

        seen.push(bank);
        *bank.slot(&mut map) = address as usize;
    }

    Ok(map)
}

/// Reads and parses a description file.
pub fn load_map_file<P: AsRef<Path>>(path: P) -> Result<MemoryMap> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to open memory map {}", path.display()))?;
    parse_map(&text).with_context(|| format!("Invalid memory map {}", path.display()))
}

/// Formats `map` in the description format, one bank per line.
pub fn render_map(map: &MemoryMap) -> String {
    let mut out = String::new();
    for bank in Bank::ALL {
        let _ = writeln!(out, "{:<6} {:#010x}", bank.name(), bank.base(map));
    }
    out
}
