use crate::format::DEFAULT_MAX_UNCOMPRESSED_LEN;

/// How the caller-supplied `compressed_length` is reconciled with the 8-byte
/// length field embedded in the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthPolicy {
    /// Both must agree; a mismatch is an invalid buffer.
    #[default]
    RequireMatch,
    /// Use the caller's value and ignore the embedded field.
    TrustCaller,
    /// Use the embedded field and ignore the caller's value.
    TrustEmbedded,
}

/// Tunables for a [`crate::DecompressionBridge`].
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub length_policy: LengthPolicy,
    /// Largest declared uncompressed size accepted for one block, regardless
    /// of how much room the caller's buffer has. Values above `u32::MAX`, the
    /// widest length the header field can carry, act as `u32::MAX`.
    pub max_uncompressed_len: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            length_policy: LengthPolicy::default(),
            max_uncompressed_len: DEFAULT_MAX_UNCOMPRESSED_LEN,
        }
    }
}

impl BridgeConfig {
    pub fn with_length_policy(mut self, policy: LengthPolicy) -> Self {
        self.length_policy = policy;
        self
    }

    pub fn with_max_uncompressed_len(mut self, max: usize) -> Self {
        self.max_uncompressed_len = max.min(u32::MAX as usize);
        self
    }

    /// Effective per-block limit: the configured maximum clamped to what a
    /// frame header can declare.
    pub fn block_limit(&self) -> usize {
        self.max_uncompressed_len.min(u32::MAX as usize)
    }
}
