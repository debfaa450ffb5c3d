//! Errors raised by the compute layer.

use std::path::PathBuf;

use thiserror::Error;

use super::status;

/// Failures reported by the GPU compute driver or rejected before reaching it.
#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("No {requested} device found among {available} adapter(s)")]
    DeviceNotFound { requested: String, available: usize },

    #[error("Device not available: {message}")]
    DeviceNotAvailable { message: String },

    #[error("Buffer allocation of {size} bytes failed: {message}")]
    MemObjectAllocationFailure { size: u64, message: String },

    #[error("Device ran out of resources: {message}")]
    OutOfResources { message: String },

    #[error("Program build failed for {label}:\n{log}")]
    BuildProgramFailure { label: String, log: String },

    #[error("Buffer map failed: {message}")]
    MapFailure { message: String },

    #[error("Invalid value: {message}")]
    InvalidValue { message: String },

    #[error("Couldn't open kernel source {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid build options {options:?}: {reason}")]
    InvalidBuildOptions { options: String, reason: String },

    #[error("Kernel {name} could not be created: {message}")]
    InvalidKernelName { name: String, message: String },

    #[error("Kernel {name} rejected its arguments: {message}")]
    InvalidKernelArgs { name: String, message: String },

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("Invalid buffer size {size}: must be between 1 and {max_size} bytes")]
    InvalidBufferSize { size: u64, max_size: u64 },

    #[error("Invalid global work size {size}: {reason}")]
    InvalidGlobalWorkSize { size: usize, reason: String },
}

impl ComputeError {
    /// The numeric status code this error corresponds to.
    pub fn status(&self) -> i32 {
        match self {
            ComputeError::DeviceNotFound { .. } => status::DEVICE_NOT_FOUND,
            ComputeError::DeviceNotAvailable { .. } => status::DEVICE_NOT_AVAILABLE,
            ComputeError::MemObjectAllocationFailure { .. } => {
                status::MEM_OBJECT_ALLOCATION_FAILURE
            }
            ComputeError::OutOfResources { .. } => status::OUT_OF_RESOURCES,
            ComputeError::BuildProgramFailure { .. } => status::BUILD_PROGRAM_FAILURE,
            ComputeError::MapFailure { .. } => status::MAP_FAILURE,
            ComputeError::InvalidValue { .. } | ComputeError::SourceUnavailable { .. } => {
                status::INVALID_VALUE
            }
            ComputeError::InvalidBuildOptions { .. } => status::INVALID_BUILD_OPTIONS,
            ComputeError::InvalidKernelName { .. } => status::INVALID_KERNEL_NAME,
            ComputeError::InvalidKernelArgs { .. } => status::INVALID_KERNEL_ARGS,
            ComputeError::InvalidOperation { .. } => status::INVALID_OPERATION,
            ComputeError::InvalidBufferSize { .. } => status::INVALID_BUFFER_SIZE,
            ComputeError::InvalidGlobalWorkSize { .. } => status::INVALID_GLOBAL_WORK_SIZE,
        }
    }

    /// Readable name of [`ComputeError::status`].
    pub fn status_name(&self) -> &'static str {
        status::status_name(self.status())
    }
}
