//! Numeric status codes and their readable names.
//!
//! Codes follow the classic compute-driver numbering: `0` is success, small
//! negative numbers are runtime failures and `-30` onwards are invalid-argument
//! failures. Every [`ComputeError`](super::ComputeError) maps onto one of them.

use log::error;

pub const SUCCESS: i32 = 0;
pub const DEVICE_NOT_FOUND: i32 = -1;
pub const DEVICE_NOT_AVAILABLE: i32 = -2;
pub const MEM_OBJECT_ALLOCATION_FAILURE: i32 = -4;
pub const OUT_OF_RESOURCES: i32 = -5;
pub const BUILD_PROGRAM_FAILURE: i32 = -11;
pub const MAP_FAILURE: i32 = -12;
pub const INVALID_VALUE: i32 = -30;
pub const INVALID_BUILD_OPTIONS: i32 = -43;
pub const INVALID_KERNEL_NAME: i32 = -46;
pub const INVALID_KERNEL_ARGS: i32 = -52;
pub const INVALID_OPERATION: i32 = -59;
pub const INVALID_BUFFER_SIZE: i32 = -61;
pub const INVALID_GLOBAL_WORK_SIZE: i32 = -63;

/// Names indexed by the negated status code. Empty entries are unassigned codes.
static STATUS_NAMES: [&str; 64] = [
    "CL_SUCCESS",
    "CL_DEVICE_NOT_FOUND",
    "CL_DEVICE_NOT_AVAILABLE",
    "CL_COMPILER_NOT_AVAILABLE",
    "CL_MEM_OBJECT_ALLOCATION_FAILURE",
    "CL_OUT_OF_RESOURCES",
    "CL_OUT_OF_HOST_MEMORY",
    "CL_PROFILING_INFO_NOT_AVAILABLE",
    "CL_MEM_COPY_OVERLAP",
    "CL_IMAGE_FORMAT_MISMATCH",
    "CL_IMAGE_FORMAT_NOT_SUPPORTED",
    "CL_BUILD_PROGRAM_FAILURE",
    "CL_MAP_FAILURE",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "",
    "CL_INVALID_VALUE",
    "CL_INVALID_DEVICE_TYPE",
    "CL_INVALID_PLATFORM",
    "CL_INVALID_DEVICE",
    "CL_INVALID_CONTEXT",
    "CL_INVALID_QUEUE_PROPERTIES",
    "CL_INVALID_COMMAND_QUEUE",
    "CL_INVALID_HOST_PTR",
    "CL_INVALID_MEM_OBJECT",
    "CL_INVALID_IMAGE_FORMAT_DESCRIPTOR",
    "CL_INVALID_IMAGE_SIZE",
    "CL_INVALID_SAMPLER",
    "CL_INVALID_BINARY",
    "CL_INVALID_BUILD_OPTIONS",
    "CL_INVALID_PROGRAM",
    "CL_INVALID_PROGRAM_EXECUTABLE",
    "CL_INVALID_KERNEL_NAME",
    "CL_INVALID_KERNEL_DEFINITION",
    "CL_INVALID_KERNEL",
    "CL_INVALID_ARG_INDEX",
    "CL_INVALID_ARG_VALUE",
    "CL_INVALID_ARG_SIZE",
    "CL_INVALID_KERNEL_ARGS",
    "CL_INVALID_WORK_DIMENSION",
    "CL_INVALID_WORK_GROUP_SIZE",
    "CL_INVALID_WORK_ITEM_SIZE",
    "CL_INVALID_GLOBAL_OFFSET",
    "CL_INVALID_EVENT_WAIT_LIST",
    "CL_INVALID_EVENT",
    "CL_INVALID_OPERATION",
    "CL_INVALID_GL_OBJECT",
    "CL_INVALID_BUFFER_SIZE",
    "CL_INVALID_MIP_LEVEL",
    "CL_INVALID_GLOBAL_WORK_SIZE",
];

/// Returns the readable name of a status code, or `""` when the code is unknown.
pub fn status_name(code: i32) -> &'static str {
    if code > 0 {
        return "";
    }
    usize::try_from(-i64::from(code))
        .ok()
        .and_then(|index| STATUS_NAMES.get(index))
        .copied()
        .unwrap_or("")
}

/// Logs the name of a non-success status code and hands the code back.
pub fn show_status(code: i32) -> i32 {
    if code != SUCCESS {
        error!("Compute error: {}", status_name(code));
    }
    code
}
