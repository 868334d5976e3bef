pub mod bridge;
pub mod codec;
pub mod config;
pub mod error;
pub mod format;
pub mod reader;
pub mod writer;

pub use bridge::DecompressionBridge;
pub use codec::Codec;
pub use config::{BridgeConfig, LengthPolicy};
pub use error::BridgeError;
pub use format::{BlockHeader, HEADER_LENGTH, SIZE_LENGTH, UNCOMPRESSED_BLOCKSIZE_LENGTH};
pub use reader::{FrameInfo, Reader};
pub use writer::Writer;
