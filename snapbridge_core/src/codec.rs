/// The external block compression primitive the bridge invokes.
///
/// Implementations wrap a third-party codec; the bridge never looks inside a
/// payload itself. Each call works on exactly one independent block: no
/// cross-block state is permitted, which is what lets any frame be decoded
/// on its own and lets one codec instance serve many threads.
pub trait Codec: Send + Sync {
    /// Stable codec ID.
    fn id(&self) -> u16;

    /// Human-readable codec name for CLI display.
    fn name(&self) -> &'static str;

    /// Worst-case compressed size for a block of `raw_len` bytes.
    fn max_compressed_len(&self, raw_len: usize) -> usize;

    /// Compress `raw` into `out`, returning the number of bytes written.
    ///
    /// `out` is at least `max_compressed_len(raw.len())` bytes long.
    fn compress_block(&self, raw: &[u8], out: &mut [u8]) -> anyhow::Result<usize>;

    /// Decompressed length recorded inside the payload itself.
    fn decompressed_len(&self, compressed: &[u8]) -> anyhow::Result<usize>;

    /// Decompress `compressed` into `out`, returning the number of bytes written.
    fn decompress_block(&self, compressed: &[u8], out: &mut [u8]) -> anyhow::Result<usize>;
}
