use std::io;

use thiserror::Error;

/// Everything that can go wrong between a caller's buffer and the codec.
///
/// Any error means no bytes were produced: callers must not read partial
/// output out of the buffer after a failed call.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("bridge initialization failed: {0}")]
    Initialization(String),

    #[error("invalid buffer: {0}")]
    InvalidBuffer(String),

    #[error("buffer too small: block needs {required} bytes, capacity is {capacity}")]
    BufferTooSmall { required: usize, capacity: usize },

    #[error("corrupt block: {0}")]
    CorruptBlock(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl BridgeError {
    /// Negative return value used for this error at the C boundary.
    pub fn sentinel(&self) -> i32 {
        match self {
            BridgeError::InvalidBuffer(_) => -1,
            BridgeError::BufferTooSmall { .. } => -2,
            BridgeError::CorruptBlock(_) => -3,
            BridgeError::Initialization(_) => -4,
            BridgeError::Io(_) => -5,
        }
    }
}
