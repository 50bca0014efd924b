//! Error types for vidtex-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for vidtex-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for decoding and texture streaming
#[derive(Error, Debug)]
pub enum Error {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Path is not valid UTF-8 and cannot be handed to the native decoder
    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),

    /// Native initializer reported a non-zero status
    #[error("Failed to open {path}: {}", Error::from_status(*status))]
    Open { path: PathBuf, status: i32 },

    /// Decoder reported unusable stream dimensions
    #[error("Invalid stream dimensions {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },

    /// RGB conversion failed, usually because no frame is current
    #[error("RGB conversion failed: {}", Error::from_status(*status))]
    Conversion { status: i32 },

    /// Memory allocation error
    #[error("Memory allocation failed")]
    Memory,

    /// Decoder shared library could not be loaded
    #[error("Decoder library not found: {0}")]
    LibraryNotFound(String),

    /// Decoder shared library lacks an ABI symbol
    #[error("Required symbol not found: {0}")]
    SymbolNotFound(String),

    /// Graphics backend failure
    #[error("Graphics error: {0}")]
    Graphics(String),

    /// Rejected configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// FFmpeg error with code
    #[error("FFmpeg error {code}: {message}")]
    FFmpeg { code: i32, message: String },
}

impl Error {
    /// Convert to FFI error code
    pub fn to_ffi_code(&self) -> i32 {
        match self {
            Error::FileNotFound(_) => 1,
            Error::InvalidPath(_) => 1,
            Error::Open { .. } => 2,
            Error::InvalidDimensions { .. } => 2,
            Error::Conversion { .. } => 3,
            Error::Memory => 4,
            Error::LibraryNotFound(_) => 5,
            Error::SymbolNotFound(_) => 5,
            Error::Graphics(_) => 6,
            Error::InvalidConfig(_) => 8,
            Error::FFmpeg { .. } => 2,
        }
    }

    /// Whether this error was raised while opening a stream
    pub fn is_open_error(&self) -> bool {
        matches!(
            self,
            Error::FileNotFound(_)
                | Error::InvalidPath(_)
                | Error::Open { .. }
                | Error::InvalidDimensions { .. }
        )
    }

    /// Describe a native status code (FFmpeg uses negated errno values)
    pub fn from_status(code: i32) -> String {
        let message = match code {
            0 => "Success",
            -1 => "Operation failed",
            -2 => "No such file or directory",
            -5 => "Input/output error",
            -12 => "Cannot allocate memory",
            -22 => "Invalid argument",
            -38 => "Function not implemented",
            -1094995529 => "Invalid data found",
            -1414092869 => "End of file",
            _ => "Unknown native error",
        };
        format!("{} (status {})", message, code)
    }
}

#[cfg(feature = "ffmpeg")]
impl From<ffmpeg_next::Error> for Error {
    fn from(e: ffmpeg_next::Error) -> Self {
        Error::FFmpeg {
            code: i32::from(e),
            message: e.to_string(),
        }
    }
}
