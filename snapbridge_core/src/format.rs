use crate::error::BridgeError;

/// Width of the compressed-payload-length field at the start of every frame.
pub const SIZE_LENGTH: usize = 8;

/// Width of the declared-uncompressed-length field that follows it.
pub const UNCOMPRESSED_BLOCKSIZE_LENGTH: usize = 4;

/// Fixed size of a frame header in bytes.
///   compressed_len:u64 BE + uncompressed_len:u32 BE = 8 + 4 = 12
pub const HEADER_LENGTH: usize = SIZE_LENGTH + UNCOMPRESSED_BLOCKSIZE_LENGTH;

/// Default raw bytes per block written by [`crate::Writer`]: 64 KB.
pub const DEFAULT_BLOCK_SIZE: u32 = 64 * 1024;

/// Default upper bound on a single block's declared uncompressed size: 64 MB.
pub const DEFAULT_MAX_UNCOMPRESSED_LEN: usize = 64 * 1024 * 1024;

// ── Codec IDs ──────────────────────────────────────────────────────────────

pub const CODEC_SNAPPY: u16 = 1;

// ── Header ─────────────────────────────────────────────────────────────────

/// Decoded representation of the 12-byte frame header.
///
/// Both fields are big-endian on the wire, matching the byte order of the
/// JVM-side producer's buffers. The compressed payload follows immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockHeader {
    /// Length of the compressed payload in bytes (excluding this header).
    pub compressed_len: u64,
    /// Declared length of the decompressed block in bytes.
    pub uncompressed_len: u32,
}

impl BlockHeader {
    /// Serialize to exactly `HEADER_LENGTH` bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_LENGTH] {
        let mut buf = [0u8; HEADER_LENGTH];
        buf[..SIZE_LENGTH].copy_from_slice(&self.compressed_len.to_be_bytes());
        buf[SIZE_LENGTH..].copy_from_slice(&self.uncompressed_len.to_be_bytes());
        buf
    }

    /// Deserialize from the first `HEADER_LENGTH` bytes of `buf`.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, BridgeError> {
        if buf.len() < HEADER_LENGTH {
            return Err(BridgeError::InvalidBuffer(format!(
                "frame header needs {} bytes, buffer holds {}",
                HEADER_LENGTH,
                buf.len()
            )));
        }
        let mut size = [0u8; SIZE_LENGTH];
        size.copy_from_slice(&buf[..SIZE_LENGTH]);
        let mut raw = [0u8; UNCOMPRESSED_BLOCKSIZE_LENGTH];
        raw.copy_from_slice(&buf[SIZE_LENGTH..HEADER_LENGTH]);
        Ok(Self {
            compressed_len: u64::from_be_bytes(size),
            uncompressed_len: u32::from_be_bytes(raw),
        })
    }

    /// Total frame length (header + payload), if it fits in `usize`.
    pub fn frame_len(&self) -> Option<usize> {
        usize::try_from(self.compressed_len)
            .ok()?
            .checked_add(HEADER_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_big_endian() {
        let header = BlockHeader {
            compressed_len: 13,
            uncompressed_len: 11,
        };
        assert_eq!(
            header.to_bytes(),
            [0, 0, 0, 0, 0, 0, 0, 13, 0, 0, 0, 11]
        );
        assert_eq!(BlockHeader::from_bytes(&header.to_bytes()).unwrap(), header);
    }

    #[test]
    fn short_header_is_invalid_buffer() {
        let err = BlockHeader::from_bytes(&[0u8; HEADER_LENGTH - 1]).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidBuffer(_)));
    }
}
