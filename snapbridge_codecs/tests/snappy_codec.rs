use std::sync::Arc;

use snapbridge_codecs::{codec_by_id, SnappyCodec};
use snapbridge_core::format::CODEC_SNAPPY;
use snapbridge_core::{BridgeConfig, Codec, DecompressionBridge};

fn compress(codec: &dyn Codec, raw: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; codec.max_compressed_len(raw.len())];
    let n = codec.compress_block(raw, &mut out).unwrap();
    out.truncate(n);
    out
}

#[test]
fn test_snappy_roundtrip() {
    let codec = SnappyCodec;
    let raw: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
    let compressed = compress(&codec, &raw);
    assert!(compressed.len() < raw.len());
    assert_eq!(codec.decompressed_len(&compressed).unwrap(), raw.len());

    let mut out = vec![0u8; raw.len()];
    let n = codec.decompress_block(&compressed, &mut out).unwrap();
    assert_eq!(n, raw.len());
    assert_eq!(out, raw);
}

#[test]
fn test_snappy_output_too_small_is_error() {
    let codec = SnappyCodec;
    let compressed = compress(&codec, b"hello world");
    let mut out = vec![0u8; 5];
    assert!(codec.decompress_block(&compressed, &mut out).is_err());
}

#[test]
fn test_snappy_garbage_is_error() {
    let codec = SnappyCodec;
    let mut out = vec![0u8; 64];
    // Preamble says 3 bytes, then a copy element pointing before the start.
    let garbage = [0x03, 0x01, 0x05];
    assert!(codec.decompress_block(&garbage, &mut out).is_err());
    // An empty payload has no preamble; snap reads it as length zero.
    assert_eq!(codec.decompressed_len(&[]).unwrap(), 0);
}

#[test]
fn test_codec_by_id() {
    let codec = codec_by_id(CODEC_SNAPPY).unwrap();
    assert_eq!(codec.id(), CODEC_SNAPPY);
    assert_eq!(codec.name(), "snappy");

    let err = codec_by_id(42).err().unwrap().to_string();
    assert!(err.contains("unknown codec id 42"), "got: {err}");
}

#[test]
fn test_bridge_over_resolved_codec() {
    let codec = codec_by_id(CODEC_SNAPPY).unwrap();
    let bridge = DecompressionBridge::initialized(Arc::clone(&codec), BridgeConfig::default()).unwrap();
    let mut buffer = bridge.compress_block(b"hello world").unwrap();
    let compressed_length = buffer.len() - snapbridge_core::HEADER_LENGTH;
    let n = bridge.decompress_block(&mut buffer, compressed_length).unwrap();
    assert_eq!(&buffer[..n], b"hello world");
}
