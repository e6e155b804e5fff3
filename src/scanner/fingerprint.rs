//! Content fingerprints for change detection.
//!
//! The fingerprint is the git blob object id:
//! `SHA-1("blob " + byte_length + "\0" + bytes)`, hex-encoded. Any tool
//! that already speaks git produces the same id for the same bytes, so the
//! manifest stays comparable with VCS-side hashes.

use sha1::{Digest, Sha1};

/// Computes the git blob object id of a byte slice.
#[must_use]
pub fn blob_fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(b"blob ");
    hasher.update(bytes.len().to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference ids from `git hash-object`.

    #[test]
    fn test_empty_blob() {
        assert_eq!(
            blob_fingerprint(b""),
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"
        );
    }

    #[test]
    fn test_hello_world_blob() {
        assert_eq!(
            blob_fingerprint(b"hello world\n"),
            "3b18e512dbec19042ab14b9e2774d36a96c1f752"
        );
    }

    #[test]
    fn test_identical_bytes_identical_fingerprint() {
        let a = blob_fingerprint(b"fn main() {}\n");
        let b = blob_fingerprint(b"fn main() {}\n");
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_bytes_differ() {
        assert_ne!(blob_fingerprint(b"a"), blob_fingerprint(b"b"));
    }

    #[test]
    fn test_length_prefix_matters() {
        // "a" + "b" concatenated differently must not collide via the header.
        assert_ne!(blob_fingerprint(b"ab"), blob_fingerprint(b"a\0b"));
    }
}
