mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::Cli;
use pcicaps::device::pci::{
    capability::ChainKind,
    chain::{decode_chain, DecodedChain},
    config_space::ConfigSpaceView,
    constants::config_space::{self, capability_list},
};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Print all records of a chain followed by the reason it was cut short, if any.
fn print_chain(kind: ChainKind, chain: &DecodedChain) {
    println!("{kind} capabilities:");

    if chain.is_empty() && chain.is_complete() {
        println!("  none");
    }

    for record in chain {
        println!("  {record}");
    }

    if let Some(error) = chain.error() {
        println!("  ! {error}");
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(match args.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global tracing subscriber")?;
    tracing_log::LogTracer::init().context("Failed to forward log records")?;

    let data = std::fs::read(&args.config)
        .with_context(|| format!("Failed to read {}", args.config.display()))?;

    if data.len() < config_space::HEADER_SIZE {
        bail!(
            "{} holds {} bytes, but a Configuration Space header needs {}",
            args.config.display(),
            data.len(),
            config_space::HEADER_SIZE
        );
    }

    if data.len() > config_space::EXTENDED_SIZE {
        warn!(
            "Ignoring {} bytes past the end of the Configuration Space",
            data.len() - config_space::EXTENDED_SIZE
        );
    }

    let view = ConfigSpaceView::new(&data).limit(config_space::EXTENDED_SIZE);
    info!(
        "Decoding {} ({} bytes)",
        args.config.display(),
        view.len()
    );

    let cap_pointer = args
        .cap_pointer
        .or_else(|| view.capabilities_pointer())
        .unwrap_or(capability_list::END_OF_LIST);
    debug!("Standard capability list starts at {cap_pointer:#04x}");

    print_chain(
        ChainKind::Standard,
        &decode_chain(view, cap_pointer.into(), ChainKind::Standard),
    );

    if args.standard_only {
        return Ok(());
    }

    if view.has_extended_space() {
        print_chain(
            ChainKind::Extended,
            &decode_chain(view, capability_list::EXTENDED_ROOT, ChainKind::Extended),
        );
    } else {
        info!("Dump has no PCI Express extended space");
    }

    Ok(())
}
