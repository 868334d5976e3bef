#[cfg(feature = "c-abi")]
pub mod abi;
mod snappy_codec;

pub use snappy_codec::SnappyCodec;

use snapbridge_core::format::CODEC_SNAPPY;
use snapbridge_core::Codec;
use std::sync::Arc;

/// Resolve a codec from its numeric `codec_id`.
pub fn codec_by_id(id: u16) -> anyhow::Result<Arc<dyn Codec>> {
    match id {
        CODEC_SNAPPY => Ok(Arc::new(SnappyCodec)),
        _ => anyhow::bail!("unknown codec id {}; only {} (snappy) is supported", id, CODEC_SNAPPY),
    }
}
