use std::io::{ErrorKind, Read};
use std::sync::Arc;

use log::trace;

use crate::bridge::DecompressionBridge;
use crate::error::BridgeError;
use crate::format::{BlockHeader, HEADER_LENGTH};

/// Position and header of one frame in a block stream.
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo {
    /// Zero-based frame number.
    pub index: u64,
    /// Byte offset of the frame header from the start of the stream.
    pub offset: u64,
    pub header: BlockHeader,
}

/// Sequential reader for block streams.
///
/// Each frame is read into one direct buffer that is reused across frames,
/// grown only when a frame needs more room, and then decompressed in place
/// by the bridge. That buffer is sized to
/// `max(HEADER_LENGTH + compressed_len, uncompressed_len)`.
pub struct Reader<R: Read> {
    inner: R,
    bridge: Arc<DecompressionBridge>,
    buffer: Vec<u8>,
    /// Frame currently held in `buffer`, if it has not been decoded yet.
    current: Option<FrameInfo>,
    next_index: u64,
    offset: u64,
    /// Set once framing is lost; the stream position is no longer trusted.
    failed: bool,
}

impl<R: Read> Reader<R> {
    pub fn new(inner: R, bridge: Arc<DecompressionBridge>) -> Result<Self, BridgeError> {
        bridge.initialize()?;
        Ok(Self {
            inner,
            bridge,
            buffer: Vec::new(),
            current: None,
            next_index: 0,
            offset: 0,
            failed: false,
        })
    }

    /// Number of frames consumed so far.
    pub fn frames_read(&self) -> u64 {
        self.next_index
    }

    /// Read the next frame into the direct buffer without decoding it.
    ///
    /// Returns `None` on a clean end of stream at a frame boundary. After an
    /// error the reader is fused: every later call fails without touching the
    /// underlying stream.
    pub fn next_frame(&mut self) -> Result<Option<FrameInfo>, BridgeError> {
        self.current = None;
        if self.failed {
            return Err(BridgeError::InvalidBuffer(format!(
                "block stream already failed at offset {}",
                self.offset
            )));
        }
        let result = self.read_frame();
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    fn read_frame(&mut self) -> Result<Option<FrameInfo>, BridgeError> {
        let mut header_buf = [0u8; HEADER_LENGTH];
        let filled = read_up_to(&mut self.inner, &mut header_buf)?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < HEADER_LENGTH {
            return Err(BridgeError::InvalidBuffer(format!(
                "truncated frame header at offset {}: {} of {} bytes",
                self.offset, filled, HEADER_LENGTH
            )));
        }
        let header = BlockHeader::from_bytes(&header_buf)?;

        let max_raw = self.bridge.config().block_limit();
        if header.uncompressed_len as usize > max_raw {
            return Err(BridgeError::BufferTooSmall {
                required: header.uncompressed_len as usize,
                capacity: max_raw,
            });
        }
        // Bound by this frame's own declared size; the codec reports 0 for
        // sizes it could never have produced.
        let max_payload = self
            .bridge
            .codec()
            .max_compressed_len(header.uncompressed_len as usize);
        let payload_len = usize::try_from(header.compressed_len)
            .ok()
            .filter(|&len| len <= max_payload)
            .ok_or_else(|| {
                BridgeError::InvalidBuffer(format!(
                    "frame at offset {} declares {} payload bytes (limit {})",
                    self.offset, header.compressed_len, max_payload
                ))
            })?;

        let frame_len = HEADER_LENGTH + payload_len;
        let direct_len = frame_len.max(header.uncompressed_len as usize);
        if self.buffer.len() < direct_len {
            self.buffer.resize(direct_len, 0);
        }
        self.buffer[..HEADER_LENGTH].copy_from_slice(&header_buf);
        self.inner
            .read_exact(&mut self.buffer[HEADER_LENGTH..frame_len])
            .map_err(|e| match e.kind() {
                ErrorKind::UnexpectedEof => BridgeError::InvalidBuffer(format!(
                    "truncated payload in frame at offset {}",
                    self.offset
                )),
                _ => BridgeError::Io(e),
            })?;

        let info = FrameInfo {
            index: self.next_index,
            offset: self.offset,
            header,
        };
        self.next_index += 1;
        self.offset += frame_len as u64;
        self.current = Some(info);

        trace!(
            "read frame {} at offset {}: {} compressed, {} raw",
            info.index,
            info.offset,
            header.compressed_len,
            header.uncompressed_len
        );
        Ok(Some(info))
    }

    /// Compressed payload of the frame most recently returned by
    /// [`next_frame`](Self::next_frame). Empty once that frame is decoded.
    pub fn payload(&self) -> &[u8] {
        match self.current {
            Some(info) => {
                let end = HEADER_LENGTH + info.header.compressed_len as usize;
                &self.buffer[HEADER_LENGTH..end]
            }
            None => &[],
        }
    }

    /// Decode the frame most recently returned by [`next_frame`](Self::next_frame).
    pub fn decode_current(&mut self) -> Result<Vec<u8>, BridgeError> {
        let info = self.current.take().ok_or_else(|| {
            BridgeError::InvalidBuffer("no undecoded frame in the buffer".to_string())
        })?;
        let n = self
            .bridge
            .decompress_block(&mut self.buffer, info.header.compressed_len as usize)?;
        Ok(self.buffer[..n].to_vec())
    }

    /// Read and decompress the next block.
    ///
    /// Returns `None` on a clean end of stream at a frame boundary.
    pub fn next_block(&mut self) -> Result<Option<Vec<u8>>, BridgeError> {
        match self.next_frame()? {
            Some(_) => self.decode_current().map(Some),
            None => Ok(None),
        }
    }
}

/// Like `read_exact`, but a short read at end of stream reports how many
/// bytes arrived instead of failing.
fn read_up_to<R: Read>(src: &mut R, buf: &mut [u8]) -> Result<usize, BridgeError> {
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
