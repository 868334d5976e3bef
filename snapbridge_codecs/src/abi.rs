//! C-ABI entry points for the process-wide decompression bridge.
//!
//! Enabled with:
//!   cargo build --release --features c-abi
//!
//! Its tests only compile with the feature on:
//!   cargo test -p snapbridge_codecs --features c-abi
//! or, for the whole workspace, `cargo test-all` (alias in .cargo/config.toml).
//!
//! Call `snapbridge_init_ids` once before any `snapbridge_decompress_bytes_direct`.
//! Failures are reported as negative return values:
//!
//! | value | meaning |
//! |---|---|
//! | -1 | invalid buffer (null, negative length, too short, length mismatch) |
//! | -2 | buffer too small for the declared uncompressed size |
//! | -3 | corrupt block |
//! | -4 | bridge not initialized, or initialization failed |

use std::os::raw::c_int;
use std::slice;
use std::sync::{Arc, OnceLock};

use log::debug;
use snapbridge_core::{BridgeConfig, BridgeError, DecompressionBridge};

use crate::SnappyCodec;

static BRIDGE: OnceLock<DecompressionBridge> = OnceLock::new();

fn bridge() -> &'static DecompressionBridge {
    BRIDGE.get_or_init(|| DecompressionBridge::new(Arc::new(SnappyCodec), BridgeConfig::default()))
}

/// Initialize the process-wide bridge. Returns 0 on success.
///
/// Safe to call repeatedly and from several threads; the outcome of the
/// first call is returned every time.
#[no_mangle]
pub extern "C" fn snapbridge_init_ids() -> c_int {
    match bridge().initialize() {
        Ok(()) => 0,
        Err(e) => e.sentinel(),
    }
}

/// Decompress the frame at `buf` in place.
///
/// `capacity` is the full length of the region at `buf`; it must cover the
/// frame and the decompressed output. Returns the number of bytes written to
/// the start of `buf`, or a negative sentinel.
///
/// # Safety
/// `buf` must be valid for reads and writes of `capacity` bytes and must not
/// be accessed by anything else for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn snapbridge_decompress_bytes_direct(
    buf: *mut u8,
    capacity: usize,
    compressed_length: c_int,
) -> c_int {
    let invalid = BridgeError::InvalidBuffer(String::new()).sentinel();
    if buf.is_null() || compressed_length < 0 {
        return invalid;
    }
    let buffer = slice::from_raw_parts_mut(buf, capacity);
    match bridge().decompress_block(buffer, compressed_length as usize) {
        Ok(n) => c_int::try_from(n).unwrap_or(invalid),
        Err(e) => {
            debug!("snapbridge_decompress_bytes_direct failed: {}", e);
            e.sentinel()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapbridge_core::format::{BlockHeader, HEADER_LENGTH};

    fn framed(raw: &[u8]) -> Vec<u8> {
        let mut payload = vec![0u8; snap::raw::max_compress_len(raw.len())];
        let n = snap::raw::Encoder::new().compress(raw, &mut payload).unwrap();
        let header = BlockHeader {
            compressed_len: n as u64,
            uncompressed_len: raw.len() as u32,
        };
        let mut frame = header.to_bytes().to_vec();
        frame.extend_from_slice(&payload[..n]);
        frame
    }

    /// One test drives the whole lifecycle because the bridge is process-wide.
    #[test]
    fn sentinels_follow_the_init_lifecycle() {
        let mut frame = framed(b"hello world");
        let compressed_length = (frame.len() - HEADER_LENGTH) as c_int;

        let rc = unsafe {
            snapbridge_decompress_bytes_direct(frame.as_mut_ptr(), frame.len(), compressed_length)
        };
        assert_eq!(rc, -4, "decompressing before init must fail");

        assert_eq!(snapbridge_init_ids(), 0);
        assert_eq!(snapbridge_init_ids(), 0, "init is idempotent");

        let rc = unsafe {
            snapbridge_decompress_bytes_direct(frame.as_mut_ptr(), frame.len(), compressed_length)
        };
        assert_eq!(rc, 11);
        assert_eq!(&frame[..11], b"hello world");

        let rc = unsafe { snapbridge_decompress_bytes_direct(std::ptr::null_mut(), 64, 1) };
        assert_eq!(rc, -1);

        let mut frame = framed(b"hello world");
        let rc = unsafe { snapbridge_decompress_bytes_direct(frame.as_mut_ptr(), frame.len(), -3) };
        assert_eq!(rc, -1);

        let mut frame = framed(b"hello world");
        frame[HEADER_LENGTH] ^= 0xff;
        let rc = unsafe {
            snapbridge_decompress_bytes_direct(frame.as_mut_ptr(), frame.len(), compressed_length)
        };
        assert_eq!(rc, -3);
    }
}
