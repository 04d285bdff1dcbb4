use std::fmt;
use std::path::PathBuf;

/// Custom error types for hushmix
#[derive(Debug)]
pub enum HushmixError {
    /// File system related errors
    FileSystem { source: std::io::Error, path: PathBuf },

    /// Configuration validation errors
    Config { field: String, message: String },

    /// Input audio could not be read or decoded
    AudioDecode { path: PathBuf, message: String },

    /// Output audio could not be encoded or written
    AudioEncode { path: PathBuf, message: String },

    /// A sample buffer violated its shape invariants
    InvalidBuffer { message: String },

    /// Primary and companion buffers could not be reconciled for mixing
    Mix { message: String },

    /// Unsupported file format
    UnsupportedFormat { extension: String, supported: Vec<String> },

    /// General processing error
    Processing { message: String },
}

impl fmt::Display for HushmixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HushmixError::FileSystem { source, path } => {
                write!(f, "File system error for '{}': {}", path.display(), source)
            }
            HushmixError::Config { field, message } => {
                write!(f, "Configuration error in '{}': {}", field, message)
            }
            HushmixError::AudioDecode { path, message } => {
                write!(f, "Failed to decode audio '{}': {}", path.display(), message)
            }
            HushmixError::AudioEncode { path, message } => {
                write!(f, "Failed to encode audio '{}': {}", path.display(), message)
            }
            HushmixError::InvalidBuffer { message } => {
                write!(f, "Invalid audio buffer: {}", message)
            }
            HushmixError::Mix { message } => {
                write!(f, "Mixing error: {}", message)
            }
            HushmixError::UnsupportedFormat { extension, supported } => {
                write!(
                    f,
                    "Unsupported file format '{}'. Supported formats: {}",
                    extension,
                    supported.join(", ")
                )
            }
            HushmixError::Processing { message } => {
                write!(f, "Processing error: {}", message)
            }
        }
    }
}

impl std::error::Error for HushmixError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HushmixError::FileSystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type alias for hushmix operations
pub type Result<T> = std::result::Result<T, HushmixError>;

/// Helper function to create configuration errors
pub fn config_error(field: impl Into<String>, message: impl Into<String>) -> HushmixError {
    HushmixError::Config {
        field: field.into(),
        message: message.into(),
    }
}

/// Helper function to create file system errors
pub fn fs_error(source: std::io::Error, path: PathBuf) -> HushmixError {
    HushmixError::FileSystem { source, path }
}

/// Helper function to create mix-stage errors
pub fn mix_error(message: impl Into<String>) -> HushmixError {
    HushmixError::Mix {
        message: message.into(),
    }
}

/// Helper function to create buffer shape errors
pub fn buffer_error(message: impl Into<String>) -> HushmixError {
    HushmixError::InvalidBuffer {
        message: message.into(),
    }
}

/// Trait for converting io errors to HushmixError
pub trait IntoHushmixError<T> {
    fn with_path(self, path: PathBuf) -> Result<T>;
}

impl<T> IntoHushmixError<T> for std::result::Result<T, std::io::Error> {
    fn with_path(self, path: PathBuf) -> Result<T> {
        self.map_err(|e| fs_error(e, path))
    }
}
