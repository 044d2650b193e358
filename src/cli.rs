//! This module implements the CLI interface.
//!
//! The input is a raw Configuration Space dump as found in
//! `/sys/bus/pci/devices/*/config` or produced by `lspci -xxxx`
//! after conversion to binary.
use std::{num::ParseIntError, path::PathBuf};

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None
)]
pub struct Cli {
    /// Enable verbose logging. Can be specified multiple times to
    /// increase verbosity.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to the Configuration Space dump of a single PCI
    /// function. Dumps of 256 bytes only contain the standard
    /// capability list.
    #[arg(value_name = "CONFIG_FILE")]
    pub config: PathBuf,

    /// Start the standard capability list at this offset instead of
    /// the capabilities pointer in the header. Accepts decimal or
    /// 0x-prefixed hexadecimal values.
    #[arg(long, value_name = "OFFSET", value_parser = parse_offset)]
    pub cap_pointer: Option<u8>,

    /// Skip the PCI Express extended capability list.
    #[arg(long)]
    pub standard_only: bool,
}

/// Parse a byte offset given either in decimal or with a `0x` prefix.
fn parse_offset(arg: &str) -> Result<u8, ParseIntError> {
    match arg
        .strip_prefix("0x")
        .or_else(|| arg.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => arg.parse(),
    }
}
