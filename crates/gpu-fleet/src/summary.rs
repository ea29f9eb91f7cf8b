//! Per-device summary collection and rendering.

use std::io;

use nvml_wrapper::enum_wrappers::device::TemperatureSensor;
use nvml_wrapper::error::NvmlError;
use nvml_wrapper::Nvml;

const BYTES_PER_MIB: u64 = 1024 * 1024;

/// Snapshot of one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSummary {
    pub index: u32,
    pub name: String,
    /// Total device memory in bytes.
    pub total_memory: u64,
    /// Device memory in use, in bytes.
    pub used_memory: u64,
    /// GPU die temperature in the sensor's native unit (°C).
    pub temperature: u32,
}

/// Fetch the summary for the device at `index`.
///
/// Every query must succeed; there is no partial summary for a device.
pub fn device_summary(nvml: &Nvml, index: u32) -> Result<DeviceSummary, NvmlError> {
    let device = nvml.device_by_index(index)?;
    let name = device.name()?;
    let memory = device.memory_info()?;
    let temperature = device.temperature(TemperatureSensor::Gpu)?;

    Ok(DeviceSummary {
        index,
        name,
        total_memory: memory.total,
        used_memory: memory.used,
        temperature,
    })
}

/// Write the report block for one device.
///
/// Free memory is derived from the total/used pair; memory figures are
/// floor-divided to MiB.
pub fn write_summary<W: io::Write>(out: &mut W, summary: &DeviceSummary) -> io::Result<()> {
    writeln!(out, "GPU {}: {}", summary.index, summary.name)?;
    writeln!(
        out,
        "Memoria total: {} MiB",
        summary.total_memory / BYTES_PER_MIB
    )?;
    writeln!(
        out,
        "Memoria usada: {} MiB",
        summary.used_memory / BYTES_PER_MIB
    )?;
    writeln!(
        out,
        "Memoria libre: {} MiB",
        summary.total_memory.saturating_sub(summary.used_memory) / BYTES_PER_MIB
    )?;
    writeln!(out, "Temperatura: {} C", summary.temperature)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(summary: &DeviceSummary) -> String {
        let mut buf = Vec::new();
        write_summary(&mut buf, summary).expect("write to vec");
        String::from_utf8(buf).expect("utf8 report")
    }

    #[test]
    fn block_reports_all_figures_in_mib() {
        let summary = DeviceSummary {
            index: 0,
            name: "NVIDIA GeForce RTX 3080".to_string(),
            total_memory: 10_737_418_240,
            used_memory: 10_485_760,
            temperature: 47,
        };

        assert_eq!(
            render(&summary),
            "GPU 0: NVIDIA GeForce RTX 3080\n\
             Memoria total: 10240 MiB\n\
             Memoria usada: 10 MiB\n\
             Memoria libre: 10230 MiB\n\
             Temperatura: 47 C\n"
        );
    }

    #[test]
    fn memory_figures_are_floor_divided() {
        let summary = DeviceSummary {
            index: 1,
            name: "Tesla T4".to_string(),
            total_memory: 10_485_760,
            used_memory: 10_485_759,
            temperature: 35,
        };
        let text = render(&summary);

        assert!(text.contains("Memoria total: 10 MiB"));
        assert!(text.contains("Memoria usada: 9 MiB"));
        assert!(text.contains("Memoria libre: 0 MiB"));
    }

    #[test]
    fn free_memory_never_underflows() {
        let summary = DeviceSummary {
            index: 0,
            name: "A100".to_string(),
            total_memory: BYTES_PER_MIB,
            used_memory: 2 * BYTES_PER_MIB,
            temperature: 30,
        };

        assert!(render(&summary).contains("Memoria libre: 0 MiB"));
    }
}
