//! Raw NVML context.
//!
//! This module talks to the management library through the generated
//! bindings, one status check per call. The library is loaded at runtime;
//! NVML is never linked at build time.

use std::env;
use std::ffi::{CStr, OsStr, OsString};
use std::mem;
use std::os::raw::c_uint;
use std::ptr;

use nvml_wrapper_sys::bindings::{
    nvmlDevice_t, nvmlProcessInfo_t, nvmlReturn_enum_NVML_ERROR_INSUFFICIENT_SIZE,
    nvmlReturn_enum_NVML_SUCCESS, nvmlReturn_t, NvmlLib,
};
use thiserror::Error;

const PRIMARY_NVML_LIB: &str = "libnvidia-ml.so.1";
const NVML_FALLBACK_LIB: &str = "libnvidia-ml.so";

/// Environment override for the NVML library path, checked before the
/// well-known sonames.
pub const NVML_LIB_PATH_ENV: &str = "GPU_REPORT_NVML_LIB_PATH";

#[derive(Debug, Error)]
pub enum NvmlError {
    #[error("failed to load the NVML library: {0}")]
    Load(#[from] libloading::Error),

    #[error("no NVML library candidate could be loaded")]
    NoLibrary,

    #[error("{call} failed: {description} (code {code})")]
    Call {
        call: &'static str,
        code: nvmlReturn_t,
        description: String,
    },
}

/// The two running-process categories NVML reports per device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessKind {
    Compute,
    Graphics,
}

impl ProcessKind {
    fn call_name(self) -> &'static str {
        match self {
            ProcessKind::Compute => "nvmlDeviceGetComputeRunningProcesses_v3",
            ProcessKind::Graphics => "nvmlDeviceGetGraphicsRunningProcesses_v3",
        }
    }
}

/// An initialized NVML context.
///
/// `nvmlShutdown` runs when the context drops, on every exit path; a
/// shutdown failure is logged and otherwise ignored.
pub struct NvmlContext {
    lib: NvmlLib,
}

impl NvmlContext {
    pub fn init() -> Result<Self, NvmlError> {
        let lib = load_lib()?;
        let ret = unsafe { lib.nvmlInit_v2() };
        check(&lib, "nvmlInit_v2", ret)?;
        Ok(Self { lib })
    }

    pub fn device_by_index(&self, index: u32) -> Result<nvmlDevice_t, NvmlError> {
        let mut device: nvmlDevice_t = ptr::null_mut();
        let ret = unsafe { self.lib.nvmlDeviceGetHandleByIndex_v2(index, &mut device) };
        check(&self.lib, "nvmlDeviceGetHandleByIndex_v2", ret)?;
        Ok(device)
    }

    /// Query the running processes of one category on `device`.
    ///
    /// NVML sizes this query in two calls: a probe with a null buffer that
    /// reports the record count (`NVML_SUCCESS` when it is zero,
    /// `NVML_ERROR_INSUFFICIENT_SIZE` otherwise), then a fill call with a
    /// buffer of that count. Any other status on the probe, and any
    /// non-success status on the fill, is an error.
    pub fn running_processes(
        &self,
        device: nvmlDevice_t,
        kind: ProcessKind,
    ) -> Result<Vec<nvmlProcessInfo_t>, NvmlError> {
        let mut count: c_uint = 0;
        let ret = self.query_processes(device, kind, &mut count, ptr::null_mut());
        if ret != nvmlReturn_enum_NVML_SUCCESS
            && ret != nvmlReturn_enum_NVML_ERROR_INSUFFICIENT_SIZE
        {
            return Err(call_error(&self.lib, kind.call_name(), ret));
        }

        if count == 0 {
            return Ok(Vec::new());
        }

        let mut processes: Vec<nvmlProcessInfo_t> =
            vec![unsafe { mem::zeroed() }; count as usize];
        let ret = self.query_processes(device, kind, &mut count, processes.as_mut_ptr());
        check(&self.lib, kind.call_name(), ret)?;

        // the fill call reports how many records it actually wrote
        processes.truncate(count as usize);
        Ok(processes)
    }

    fn query_processes(
        &self,
        device: nvmlDevice_t,
        kind: ProcessKind,
        count: &mut c_uint,
        buffer: *mut nvmlProcessInfo_t,
    ) -> nvmlReturn_t {
        match kind {
            ProcessKind::Compute => unsafe {
                self.lib
                    .nvmlDeviceGetComputeRunningProcesses_v3(device, count, buffer)
            },
            ProcessKind::Graphics => unsafe {
                self.lib
                    .nvmlDeviceGetGraphicsRunningProcesses_v3(device, count, buffer)
            },
        }
    }
}

impl Drop for NvmlContext {
    fn drop(&mut self) {
        let ret = unsafe { self.lib.nvmlShutdown() };
        if ret != nvmlReturn_enum_NVML_SUCCESS {
            tracing::warn!(
                "nvmlShutdown failed: {} (code {ret})",
                error_string(&self.lib, ret)
            );
        }
    }
}

fn load_lib() -> Result<NvmlLib, NvmlError> {
    let mut last_err: Option<NvmlError> = None;

    for candidate in lib_candidates(env::var_os(NVML_LIB_PATH_ENV)) {
        let candidate_display = candidate.to_string_lossy();
        tracing::debug!("Loading NVML library from {candidate_display}");
        match unsafe { NvmlLib::new(candidate.as_os_str()) } {
            Ok(lib) => return Ok(lib),
            Err(err) => {
                tracing::warn!(error = %err, "Failed to load {candidate_display}");
                last_err = Some(NvmlError::Load(err));
            }
        }
    }

    Err(last_err.unwrap_or(NvmlError::NoLibrary))
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

fn check(lib: &NvmlLib, call: &'static str, code: nvmlReturn_t) -> Result<(), NvmlError> {
    if code == nvmlReturn_enum_NVML_SUCCESS {
        Ok(())
    } else {
        Err(call_error(lib, call, code))
    }
}

fn call_error(lib: &NvmlLib, call: &'static str, code: nvmlReturn_t) -> NvmlError {
    NvmlError::Call {
        call,
        code,
        description: error_string(lib, code),
    }
}

fn error_string(lib: &NvmlLib, code: nvmlReturn_t) -> String {
    // nvmlErrorString returns a pointer to a static string owned by the library
    unsafe { CStr::from_ptr(lib.nvmlErrorString(code)) }
        .to_string_lossy()
        .into_owned()
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
