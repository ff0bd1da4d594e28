use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("invalid ring buffer capacity: {0}")]
    InvalidCapacity(usize),

    #[error("ring buffer overflow: {requested} bytes requested, {available} free")]
    Overflow { requested: usize, available: usize },

    #[error("ring buffer is empty")]
    EmptyBuffer,

    #[error("not enough data: need {needed} bytes, {available} buffered")]
    NotEnoughData { needed: usize, available: usize },

    #[error("sync byte mismatch: expected 0x47, found {0:#04x}")]
    SyncError(u8),

    #[error("invalid PES start code: {0:02x?}")]
    InvalidStartCode([u8; 3]),

    #[error("invalid input length: expected {expected} bytes, got {actual}")]
    InvalidInputLength { expected: usize, actual: usize },

    #[error("truncated {what}: need {needed} bytes, {available} available")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    /// Conditions the consumer retries after waiting for more input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProbeError::EmptyBuffer | ProbeError::NotEnoughData { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ProbeError>;
