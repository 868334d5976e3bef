use std::io::Write;
use std::sync::Arc;

use log::debug;

use crate::bridge::DecompressionBridge;
use crate::error::BridgeError;

/// Streaming writer for block streams.
///
/// # Write contract
/// Call [`write`] any number of times with arbitrary-sized byte slices.
/// The writer accumulates data and emits one independent frame whenever
/// `block_size` bytes of raw data have been gathered.
/// Call [`finish`] to flush any remaining partial block.
///
/// # Layout written
/// ```text
/// [FRAME 0] [FRAME 1] ... [FRAME N-1]
/// FRAME = [compressed_len: u64 BE][uncompressed_len: u32 BE][snappy payload]
/// ```
/// There is no file header, index, or footer.
///
/// [`write`]: Writer::write
/// [`finish`]: Writer::finish
pub struct Writer<W: Write> {
    inner: W,
    bridge: Arc<DecompressionBridge>,
    block_size: u32,
    /// Pending raw bytes not yet flushed into a frame.
    pending: Vec<u8>,
    blocks_written: u64,
    bytes_written: u64,
}

impl<W: Write> Writer<W> {
    /// Wrap `inner`. `block_size` controls the raw bytes per frame; use
    /// [`DEFAULT_BLOCK_SIZE`](crate::format::DEFAULT_BLOCK_SIZE) if unsure.
    pub fn new(
        inner: W,
        bridge: Arc<DecompressionBridge>,
        block_size: u32,
    ) -> Result<Self, BridgeError> {
        if block_size == 0 {
            return Err(BridgeError::InvalidBuffer("block size must be non-zero".to_string()));
        }
        let max = bridge.config().block_limit();
        if block_size as usize > max {
            return Err(BridgeError::BufferTooSmall {
                required: block_size as usize,
                capacity: max,
            });
        }
        bridge.initialize()?;
        Ok(Self {
            inner,
            bridge,
            block_size,
            pending: Vec::with_capacity(block_size as usize),
            blocks_written: 0,
            bytes_written: 0,
        })
    }

    /// Buffer `data` and flush complete blocks as they fill up.
    pub fn write(&mut self, data: &[u8]) -> Result<(), BridgeError> {
        self.pending.extend_from_slice(data);
        let block_size = self.block_size as usize;
        while self.pending.len() >= block_size {
            let raw: Vec<u8> = self.pending.drain(..block_size).collect();
            self.flush_block(&raw)?;
        }
        Ok(())
    }

    fn flush_block(&mut self, raw: &[u8]) -> Result<(), BridgeError> {
        let frame = self.bridge.compress_block(raw)?;
        self.inner.write_all(&frame)?;
        self.blocks_written += 1;
        self.bytes_written += frame.len() as u64;
        Ok(())
    }

    /// Bytes of framed output produced so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush the trailing partial block and the underlying writer.
    ///
    /// Returns the number of frames written.
    pub fn finish(mut self) -> Result<u64, BridgeError> {
        if !self.pending.is_empty() {
            let remaining = std::mem::take(&mut self.pending);
            self.flush_block(&remaining)?;
        }
        self.inner.flush()?;
        debug!(
            "block stream finished: {} frames, {} bytes",
            self.blocks_written, self.bytes_written
        );
        Ok(self.blocks_written)
    }
}
