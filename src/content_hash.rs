//! Canonical content identity for markdown artifacts.
//!
//! The digest is SHA-256 over the NFC-normalized string, returned as
//! lowercase hex. Every checksum stored or compared by the page store goes
//! through this function; the in-browser DOM signature (a djb2 hash) is a
//! separate, local mechanism and must never be compared against these.

use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

/// SHA-256 of the NFC normalization of `content`, as lowercase hex.
#[must_use]
pub fn checksum(content: &str) -> String {
    let normalized: String = content.nfc().collect();
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_across_calls() {
        let md = "# Rooms\n\nOcean-view rooms from $199.";
        assert_eq!(checksum(md), checksum(md));
    }

    #[test]
    fn known_digest_for_empty_string() {
        // SHA-256("") is a fixed vector; NFC of "" is "".
        assert_eq!(
            checksum(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn nfc_equivalent_forms_collide() {
        // U+00E9 (precomposed) vs U+0065 U+0301 (decomposed) normalize to
        // the same NFC form and must hash identically.
        let precomposed = "caf\u{e9}";
        let decomposed = "cafe\u{301}";
        assert_eq!(checksum(precomposed), checksum(decomposed));
    }

    #[test]
    fn lowercase_hex_output() {
        let digest = checksum("hotel");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
