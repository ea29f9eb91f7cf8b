mod nvmllib;
mod summary;

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;

/// Prints a memory and temperature summary for every GPU on the host.
#[derive(Parser)]
#[command(about, version)]
struct Cli {}

fn main() -> Result<()> {
    utils::logging::init();
    let _cli = Cli::parse();

    let nvml = nvmllib::init_nvml().context("NVML initialization failed")?;
    let device_count = nvml.device_count().context("failed to enumerate GPUs")?;
    tracing::debug!("Found {device_count} GPUs");

    let stdout = io::stdout();
    let mut out = stdout.lock();

    for index in 0..device_count {
        let summary = summary::device_summary(&nvml, index)
            .with_context(|| format!("failed to read GPU {index}"))?;
        summary::write_summary(&mut out, &summary)?;
    }
    out.flush()?;

    Ok(())
}
