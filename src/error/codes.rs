/// Error code registry for devstats
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 3000-3999: Storage errors (reference table, input, output)
/// - 4000-4999: Record errors
/// - 9000-9999: Internal errors
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_INVALID_YAML: u16 = 1002;
    pub const CONFIG_UNKNOWN_PRESET: u16 = 1006;
    pub const CONFIG_VALIDATION_FAILED: u16 = 1008;

    // Storage errors (3000-3999)
    pub const STORAGE_IO_ERROR: u16 = 3001;
    pub const STORAGE_PERMISSION_DENIED: u16 = 3002;
    pub const STORAGE_NOT_FOUND: u16 = 3004;
    pub const STORAGE_ALREADY_EXISTS: u16 = 3005;
    pub const STORAGE_REFERENCE_UNREADABLE: u16 = 3020;
    pub const STORAGE_INPUT_UNREADABLE: u16 = 3021;
    pub const STORAGE_OUTPUT_FAILED: u16 = 3022;

    // Record errors (4000-4999)
    pub const RECORD_FIELD_COUNT: u16 = 4001;
    pub const RECORD_INVALID_ID: u16 = 4002;
    pub const RECORD_INVALID_VALUE: u16 = 4003;
    pub const RECORD_INVALID_UTF8: u16 = 4004;

    // Internal errors (9000-9999)
    pub const INTERNAL_EMPTY_GROUP: u16 = 9001;
    pub const INTERNAL_WORKER_POOL: u16 = 9002;
    pub const INTERNAL_TASK_JOIN: u16 = 9003;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        ErrorCode::CONFIG_GENERIC => "General configuration error",
        ErrorCode::CONFIG_NOT_FOUND => "Job file not found",
        ErrorCode::CONFIG_INVALID_YAML => "Job file is not valid YAML",
        ErrorCode::CONFIG_UNKNOWN_PRESET => "Unknown job preset",
        ErrorCode::CONFIG_VALIDATION_FAILED => "Job configuration failed validation",

        ErrorCode::STORAGE_IO_ERROR => "I/O operation failed",
        ErrorCode::STORAGE_PERMISSION_DENIED => "Permission denied",
        ErrorCode::STORAGE_NOT_FOUND => "File or directory not found",
        ErrorCode::STORAGE_ALREADY_EXISTS => "File or directory already exists",
        ErrorCode::STORAGE_REFERENCE_UNREADABLE => "Reference table could not be read",
        ErrorCode::STORAGE_INPUT_UNREADABLE => "Input shard could not be read",
        ErrorCode::STORAGE_OUTPUT_FAILED => "Results could not be written",

        ErrorCode::RECORD_FIELD_COUNT => "Record does not have exactly three fields",
        ErrorCode::RECORD_INVALID_ID => "Record id is not an integer",
        ErrorCode::RECORD_INVALID_VALUE => "Record value is not a finite number",
        ErrorCode::RECORD_INVALID_UTF8 => "Record is not valid UTF-8",

        ErrorCode::INTERNAL_EMPTY_GROUP => "A group was finalized without contributions",
        ErrorCode::INTERNAL_WORKER_POOL => "Worker pool could not be created",
        ErrorCode::INTERNAL_TASK_JOIN => "Background task failed",

        _ => "Unknown error",
    }
}
