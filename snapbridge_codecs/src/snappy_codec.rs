use log::trace;
use snap::raw::{decompress_len, max_compress_len, Decoder, Encoder};
use snapbridge_core::codec::Codec;
use snapbridge_core::format::CODEC_SNAPPY;

/// Snappy raw block codec.
///
/// Payloads are unframed snappy blocks: a varint of the decompressed length
/// followed by literal/copy elements, with no CRC. Integrity beyond that is
/// checked by the bridge against the frame header.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnappyCodec;

impl Codec for SnappyCodec {
    fn id(&self) -> u16 {
        CODEC_SNAPPY
    }

    fn name(&self) -> &'static str {
        "snappy"
    }

    fn max_compressed_len(&self, raw_len: usize) -> usize {
        max_compress_len(raw_len)
    }

    fn compress_block(&self, raw: &[u8], out: &mut [u8]) -> anyhow::Result<usize> {
        let n = Encoder::new().compress(raw, out)?;
        trace!("snappy compressed {} -> {} bytes", raw.len(), n);
        Ok(n)
    }

    fn decompressed_len(&self, compressed: &[u8]) -> anyhow::Result<usize> {
        Ok(decompress_len(compressed)?)
    }

    fn decompress_block(&self, compressed: &[u8], out: &mut [u8]) -> anyhow::Result<usize> {
        let n = Decoder::new()
            .decompress(compressed, out)
            .map_err(|e| anyhow::anyhow!("snappy decompress error: {}", e))?;
        Ok(n)
    }
}
