//! Content keys for text.
//!
//! Identical strings map to the same key, so state keyed by content (such as
//! a toast's marquee phase) is shared between equal messages.
//! Uses BLAKE3 over the UTF-8 bytes.

/// Hex BLAKE3 digest of `text`.
pub fn content_key(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

// ============================================================================
// TESTS
// ============================================================================
