//! Renders the per-category process report.

use std::io;

use crate::nvml::ProcessKind;

const BYTES_PER_MIB: u64 = 1024 * 1024;

/// One reported process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSample {
    pub pid: u32,
    /// GPU memory in use, in bytes.
    pub used_gpu_memory: u64,
    /// Resolved command line, or the unknown-name placeholder.
    pub name: String,
}

pub fn bytes_to_mib(bytes: u64) -> u64 {
    bytes / BYTES_PER_MIB
}

/// Write the report block for one process category.
///
/// An empty sample list prints a single "no processes" line; otherwise a
/// header carries the record count and the entries are numbered from 1.
pub fn write_report<W: io::Write>(
    out: &mut W,
    kind: ProcessKind,
    samples: &[ProcessSample],
) -> io::Result<()> {
    if samples.is_empty() {
        return writeln!(
            out,
            "No hay procesos {} utilizando la GPU.",
            kind_qualifier(kind)
        );
    }

    writeln!(
        out,
        "Número de procesos {} utilizando la GPU: {}",
        kind_qualifier(kind),
        samples.len()
    )?;

    for (position, sample) in samples.iter().enumerate() {
        writeln!(
            out,
            "{} {}: PID {}, Memoria GPU usada: {} MB, Nombre: {}",
            entry_label(kind),
            position + 1,
            sample.pid,
            bytes_to_mib(sample.used_gpu_memory),
            sample.name
        )?;
    }

    Ok(())
}

fn kind_qualifier(kind: ProcessKind) -> &'static str {
    match kind {
        ProcessKind::Compute => "de computación",
        ProcessKind::Graphics => "gráficos",
    }
}

fn entry_label(kind: ProcessKind) -> &'static str {
    match kind {
        ProcessKind::Compute => "Proceso",
        ProcessKind::Graphics => "Proceso Gráfico",
    }
}
