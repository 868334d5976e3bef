use std::ops::Range;
use std::sync::{Arc, OnceLock};

use log::{debug, trace, warn};

use crate::codec::Codec;
use crate::config::{BridgeConfig, LengthPolicy};
use crate::error::BridgeError;
use crate::format::{BlockHeader, HEADER_LENGTH};

/// Fixed input pushed through the codec once by the self-check.
const SELF_CHECK_INPUT: &[u8] = b"snapbridge self-check: abcabcabcabcabcabcabcabc 0123456789";

/// Direct-buffer block decompression bridge.
///
/// # Call sequence
/// 1. [`initialize`] once (from any number of threads; the self-check runs once).
/// 2. [`decompress_block`] per frame, each caller with its own buffer.
///
/// # Frame layout on input
/// ```text
/// [compressed_len: u64 BE][uncompressed_len: u32 BE][payload ...]
/// ```
/// On success `buffer[..n]` holds the `n` decompressed bytes. The bridge keeps
/// no reference to the buffer after the call returns, and after
/// initialization it holds no mutable state, so it is shared via `Arc`.
///
/// [`initialize`]: DecompressionBridge::initialize
/// [`decompress_block`]: DecompressionBridge::decompress_block
pub struct DecompressionBridge {
    codec: Arc<dyn Codec>,
    config: BridgeConfig,
    /// Cached outcome of the one-time self-check. A failure is permanent.
    ready: OnceLock<Result<(), String>>,
}

impl DecompressionBridge {
    pub fn new(codec: Arc<dyn Codec>, config: BridgeConfig) -> Self {
        Self {
            codec,
            config,
            ready: OnceLock::new(),
        }
    }

    /// Build and initialize in one step.
    pub fn initialized(codec: Arc<dyn Codec>, config: BridgeConfig) -> Result<Self, BridgeError> {
        let bridge = Self::new(codec, config);
        bridge.initialize()?;
        Ok(bridge)
    }

    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.ready.get(), Some(Ok(())))
    }

    /// Resolve the codec capability by running a round trip through it.
    ///
    /// Idempotent: the self-check runs at most once per bridge and its outcome is
    /// returned to every caller, including callers racing on other threads.
    pub fn initialize(&self) -> Result<(), BridgeError> {
        self.ready
            .get_or_init(|| {
                let outcome = self_check(self.codec.as_ref());
                match &outcome {
                    Ok(()) => debug!("bridge initialized with {} codec", self.codec.name()),
                    Err(reason) => warn!("bridge initialization failed: {}", reason),
                }
                outcome
            })
            .clone()
            .map_err(BridgeError::Initialization)
    }

    fn ensure_initialized(&self) -> Result<(), BridgeError> {
        match self.ready.get() {
            Some(Ok(())) => Ok(()),
            Some(Err(reason)) => Err(BridgeError::Initialization(reason.clone())),
            None => Err(BridgeError::Initialization(
                "bridge used before initialize()".to_string(),
            )),
        }
    }

    /// Decompress the frame held in `buffer` back into `buffer` itself.
    ///
    /// `compressed_length` is the caller's idea of the payload length; how it
    /// is reconciled with the embedded length field depends on
    /// [`LengthPolicy`]. The buffer must hold the full frame and must also be
    /// large enough for the declared uncompressed size.
    ///
    /// On any error the buffer is left untouched.
    pub fn decompress_block(
        &self,
        buffer: &mut [u8],
        compressed_length: usize,
    ) -> Result<usize, BridgeError> {
        self.ensure_initialized()?;
        let (header, payload) = self.locate_payload(buffer, compressed_length)?;
        let declared = self.check_capacity(&header, buffer.len())?;

        // Payload and output overlap, so decode aside and copy back on success.
        let mut scratch = vec![0u8; declared];
        let n = self.decode(&buffer[payload], declared, &mut scratch)?;
        buffer[..n].copy_from_slice(&scratch[..n]);

        trace!("decompressed block in place: {} -> {} bytes", header.compressed_len, n);
        Ok(n)
    }

    /// Decompress the frame in `frame` into the separate region `output`.
    ///
    /// Same validation as [`decompress_block`](Self::decompress_block); the
    /// capacity checked is `output.len()`. On error `output` holds no valid
    /// data.
    pub fn decompress_block_into(
        &self,
        frame: &[u8],
        compressed_length: usize,
        output: &mut [u8],
    ) -> Result<usize, BridgeError> {
        self.ensure_initialized()?;
        let (header, payload) = self.locate_payload(frame, compressed_length)?;
        let declared = self.check_capacity(&header, output.len())?;
        let n = self.decode(&frame[payload], declared, output)?;

        trace!("decompressed block: {} -> {} bytes", header.compressed_len, n);
        Ok(n)
    }

    /// Compress `raw` into a complete frame (header + payload).
    pub fn compress_block(&self, raw: &[u8]) -> Result<Vec<u8>, BridgeError> {
        self.ensure_initialized()?;

        let limit = self.config.block_limit();
        if raw.len() > limit {
            return Err(BridgeError::BufferTooSmall {
                required: raw.len(),
                capacity: limit,
            });
        }

        let mut frame = vec![0u8; HEADER_LENGTH + self.codec.max_compressed_len(raw.len())];
        let written = if raw.is_empty() {
            0
        } else {
            self.codec
                .compress_block(raw, &mut frame[HEADER_LENGTH..])
                .map_err(|e| {
                    BridgeError::CorruptBlock(format!("{} compression failed: {:#}", self.codec.name(), e))
                })?
        };

        let header = BlockHeader {
            compressed_len: written as u64,
            uncompressed_len: raw.len() as u32,
        };
        frame[..HEADER_LENGTH].copy_from_slice(&header.to_bytes());
        frame.truncate(HEADER_LENGTH + written);

        trace!("framed block: {} -> {} bytes", raw.len(), written);
        Ok(frame)
    }

    /// Validate `frame` against `compressed_length` and return the header and
    /// the byte range of the payload inside `frame`.
    fn locate_payload(
        &self,
        frame: &[u8],
        compressed_length: usize,
    ) -> Result<(BlockHeader, Range<usize>), BridgeError> {
        if frame.is_empty() {
            return Err(BridgeError::InvalidBuffer("buffer is empty".to_string()));
        }
        let needed = HEADER_LENGTH.checked_add(compressed_length).ok_or_else(|| {
            BridgeError::InvalidBuffer(format!("compressed length {} overflows", compressed_length))
        })?;
        if frame.len() < needed {
            return Err(BridgeError::InvalidBuffer(format!(
                "frame with {} payload bytes needs {} bytes, buffer holds {}",
                compressed_length,
                needed,
                frame.len()
            )));
        }

        let header = BlockHeader::from_bytes(frame)?;
        let payload_len = match self.config.length_policy {
            LengthPolicy::RequireMatch => {
                if header.compressed_len != compressed_length as u64 {
                    return Err(BridgeError::InvalidBuffer(format!(
                        "length mismatch: caller says {} payload bytes, header says {}",
                        compressed_length, header.compressed_len
                    )));
                }
                compressed_length
            }
            LengthPolicy::TrustCaller => compressed_length,
            LengthPolicy::TrustEmbedded => header
                .frame_len()
                .filter(|&len| len <= frame.len())
                .map(|len| len - HEADER_LENGTH)
                .ok_or_else(|| {
                    BridgeError::InvalidBuffer(format!(
                        "header declares {} payload bytes, buffer holds {}",
                        header.compressed_len,
                        frame.len() - HEADER_LENGTH
                    ))
                })?,
        };

        Ok((header, HEADER_LENGTH..HEADER_LENGTH + payload_len))
    }

    fn check_capacity(&self, header: &BlockHeader, available: usize) -> Result<usize, BridgeError> {
        let declared = header.uncompressed_len as usize;
        let capacity = available.min(self.config.block_limit());
        if declared > capacity {
            return Err(BridgeError::BufferTooSmall {
                required: declared,
                capacity,
            });
        }
        Ok(declared)
    }

    /// Run the codec over `payload` into `out[..declared]`, insisting that it
    /// produces exactly `declared` bytes.
    fn decode(&self, payload: &[u8], declared: usize, out: &mut [u8]) -> Result<usize, BridgeError> {
        if payload.is_empty() {
            if declared == 0 {
                return Ok(0);
            }
            return Err(BridgeError::CorruptBlock(format!(
                "empty payload but header declares {} bytes",
                declared
            )));
        }

        let corrupt = |e: anyhow::Error| BridgeError::CorruptBlock(format!("{:#}", e));

        let embedded = self.codec.decompressed_len(payload).map_err(corrupt)?;
        if embedded != declared {
            return Err(BridgeError::CorruptBlock(format!(
                "payload decodes to {} bytes but header declares {}",
                embedded, declared
            )));
        }

        let n = self
            .codec
            .decompress_block(payload, &mut out[..declared])
            .map_err(corrupt)?;
        if n != declared {
            return Err(BridgeError::CorruptBlock(format!(
                "codec produced {} bytes but header declares {}",
                n, declared
            )));
        }
        Ok(n)
    }
}

fn self_check(codec: &dyn Codec) -> Result<(), String> {
    let mut compressed = vec![0u8; codec.max_compressed_len(SELF_CHECK_INPUT.len())];
    let n = codec
        .compress_block(SELF_CHECK_INPUT, &mut compressed)
        .map_err(|e| format!("{} codec cannot compress: {:#}", codec.name(), e))?;

    let mut restored = vec![0u8; SELF_CHECK_INPUT.len()];
    let m = codec
        .decompress_block(&compressed[..n], &mut restored)
        .map_err(|e| format!("{} codec cannot decompress: {:#}", codec.name(), e))?;

    if restored[..m] != *SELF_CHECK_INPUT {
        return Err(format!("{} codec failed the round-trip self-check", codec.name()));
    }
    Ok(())
}
