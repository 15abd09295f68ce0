use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Failed to open process: {0}")]
    ProcessOpenFailed(String),

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Short read at address {address:#x}: expected {expected} bytes, got {actual}")]
    ShortRead {
        address: u64,
        expected: usize,
        actual: usize,
    },

    #[error("Local player not found in unit table")]
    PlayerNotFound,

    #[error("Validation failed for {field}: value {value:#x} out of range")]
    Validation { field: &'static str, value: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this failure means the cached player root and stable facts
    /// must be dropped and re-resolved from scratch on the next poll.
    ///
    /// Short reads and transient attach failures are retried with the same
    /// cached pointers; a missing player or an out-of-range scalar means we
    /// are attached to garbage.
    pub fn clears_session(&self) -> bool {
        matches!(self, Error::PlayerNotFound | Error::Validation { .. })
    }
}
