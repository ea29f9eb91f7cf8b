//! Runtime loading and initialization of NVML.

use std::env;
use std::ffi::{OsStr, OsString};

use nvml_wrapper::error::NvmlError;
use nvml_wrapper::Nvml;

const PRIMARY_NVML_LIB: &str = "libnvidia-ml.so.1";
const NVML_FALLBACK_LIB: &str = "libnvidia-ml.so";

/// Environment override for the NVML library path, checked before the
/// well-known sonames.
pub const NVML_LIB_PATH_ENV: &str = "GPU_REPORT_NVML_LIB_PATH";

/// Initialize NVML, trying each library candidate in order and keeping the
/// last error when none of them loads.
pub fn init_nvml() -> Result<Nvml, NvmlError> {
    let mut last_err: Option<NvmlError> = None;

    for candidate in lib_candidates(env::var_os(NVML_LIB_PATH_ENV)) {
        let candidate_display = candidate.to_string_lossy();
        tracing::debug!("Loading NVML library from {candidate_display}");
        match Nvml::builder().lib_path(candidate.as_os_str()).init() {
            Ok(nvml) => return Ok(nvml),
            Err(err) => {
                tracing::warn!(error = %err, "Failed to load {candidate_display}");
                last_err = Some(err);
            }
        }
    }

    Err(last_err.unwrap_or(NvmlError::Unknown))
}

fn lib_candidates(override_path: Option<OsString>) -> Vec<OsString> {
    let mut candidates = Vec::with_capacity(3);
    if let Some(path) = override_path {
        candidates.push(path);
    }
    candidates.push(OsStr::new(PRIMARY_NVML_LIB).to_os_string());
    candidates.push(OsStr::new(NVML_FALLBACK_LIB).to_os_string());
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_default_to_the_well_known_sonames() {
        let candidates = lib_candidates(None);
        assert_eq!(
            candidates,
            vec![
                OsString::from(PRIMARY_NVML_LIB),
                OsString::from(NVML_FALLBACK_LIB)
            ]
        );
    }

    #[test]
    fn candidates_try_the_override_first() {
        let override_path = OsString::from("/opt/driver/libnvidia-ml.so");
        let candidates = lib_candidates(Some(override_path.clone()));
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0], override_path);
    }
}
