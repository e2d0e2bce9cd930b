//! Error types for accelerator construction and queries.

use thiserror::Error;

/// Errors surfaced by accelerator construction and dispatch.
///
/// Building a BVH over valid geometry never fails; these cover backend
/// setup and misuse of the batched query interface.
#[derive(Debug, Error)]
pub enum AccelError {
    #[error("Accelerator backend '{0}' is not available in this build")]
    BackendUnavailable(&'static str),

    #[error("Embree error during {stage}: {code} ({name})")]
    Embree {
        stage: &'static str,
        code: i32,
        name: &'static str,
    },

    #[error(
        "Batch length mismatch: {rays} rays, {t_hits} hit distances, {interactions} interactions, {skip} skip flags"
    )]
    BatchLength {
        rays: usize,
        t_hits: usize,
        interactions: usize,
        skip: usize,
    },

    #[error("Invalid accelerator configuration: {0}")]
    InvalidConfig(String),
}

impl AccelError {
    /// Embree failure at `stage` with the device's `RTCError` code.
    pub fn embree(stage: &'static str, code: i32) -> Self {
        Self::Embree {
            stage,
            code,
            name: embree_error_name(code),
        }
    }
}

/// Symbolic name of an Embree `RTCError` code.
pub fn embree_error_name(code: i32) -> &'static str {
    match code {
        0 => "RTC_ERROR_NONE",
        1 => "RTC_ERROR_UNKNOWN",
        2 => "RTC_ERROR_INVALID_ARGUMENT",
        3 => "RTC_ERROR_INVALID_OPERATION",
        4 => "RTC_ERROR_OUT_OF_MEMORY",
        5 => "RTC_ERROR_UNSUPPORTED_CPU",
        6 => "RTC_ERROR_CANCELLED",
        _ => "UNKNOWN_ERROR",
    }
}

pub type Result<T> = std::result::Result<T, AccelError>;
