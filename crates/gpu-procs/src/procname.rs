//! Resolves a PID to its command line by reading `/proc/<pid>/cmdline`.
//!
//! Resolution is best effort: a missing entry (the process exited, or the
//! procfs record is unreadable) degrades to a placeholder instead of
//! failing the report.

use std::fs;
use std::path::Path;

/// Placeholder shown when a command line cannot be read.
pub const UNKNOWN_PROCESS: &str = "Desconocido";

/// Resolve `pid` to a printable command line, falling back to
/// [`UNKNOWN_PROCESS`].
pub fn process_name(pid: u32) -> String {
    let path = format!("/proc/{pid}/cmdline");
    read_cmdline(Path::new(&path)).unwrap_or_else(|| UNKNOWN_PROCESS.to_string())
}

fn read_cmdline(path: &Path) -> Option<String> {
    let raw = fs::read(path).ok()?;
    Some(decode_cmdline(&raw))
}

/// The arguments in a `cmdline` record are NUL-separated, with a trailing
/// NUL after the last one.
fn decode_cmdline(raw: &[u8]) -> String {
    let spaced: Vec<u8> = raw
        .iter()
        .map(|&byte| if byte == 0 { b' ' } else { byte })
        .collect();
    String::from_utf8_lossy(&spaced).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_replaces_nul_separators_with_spaces() {
        let raw = b"python3\x00train.py\x00--epochs\x0042\x00";
        assert_eq!(decode_cmdline(raw), "python3 train.py --epochs 42");
    }

    #[test]
    fn decode_trims_the_trailing_separator() {
        assert_eq!(decode_cmdline(b"nvidia-smi\x00"), "nvidia-smi");
    }

    #[test]
    fn decode_of_an_empty_record_is_empty() {
        assert_eq!(decode_cmdline(b""), "");
    }

    #[test]
    fn read_cmdline_reads_a_nul_separated_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cmdline");
        fs::write(&path, b"ferris\x00--fast\x00").expect("write fixture");
        assert_eq!(read_cmdline(&path).as_deref(), Some("ferris --fast"));
    }

    #[test]
    fn read_cmdline_of_a_missing_record_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(read_cmdline(&dir.path().join("cmdline")).is_none());
    }

    #[test]
    fn process_name_of_an_absent_pid_is_the_placeholder() {
        // PID 0 never has a /proc entry
        assert_eq!(process_name(0), UNKNOWN_PROCESS);
    }
}
