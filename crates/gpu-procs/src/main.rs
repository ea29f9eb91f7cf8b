mod nvml;
mod procname;
mod report;

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;

use crate::nvml::{NvmlContext, ProcessKind};
use crate::report::ProcessSample;

/// Reports the compute and graphics processes currently using GPU 0.
#[derive(Parser)]
#[command(about, version)]
struct Cli {}

fn main() -> Result<()> {
    utils::logging::init();
    let _cli = Cli::parse();

    let nvml = NvmlContext::init().context("NVML initialization failed")?;
    // Fixed on device 0; there is no multi-device iteration in this path.
    let device = nvml
        .device_by_index(0)
        .context("failed to get a handle for GPU 0")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    for kind in [ProcessKind::Compute, ProcessKind::Graphics] {
        let processes = nvml
            .running_processes(device, kind)
            .with_context(|| format!("failed to query {kind:?} processes"))?;

        let samples: Vec<ProcessSample> = processes
            .iter()
            .map(|info| ProcessSample {
                pid: info.pid,
                used_gpu_memory: info.usedGpuMemory,
                name: procname::process_name(info.pid),
            })
            .collect();

        report::write_report(&mut out, kind, &samples)?;
    }
    out.flush()?;

    Ok(())
}
