//! Repository scanning: walking, ignore matching, fingerprinting.
//!
//! The scanner turns a filesystem tree into a lazy stream of
//! `(relative_path, Option<fingerprint>)` entries. A `None` fingerprint
//! means the path matches the ignore specification and must be treated as
//! absent by the indexer (existing chunks for it get deleted).

pub mod fingerprint;
pub mod ignore;
pub mod language;
pub mod walk;

pub use fingerprint::blob_fingerprint;
pub use language::{language_for_extension, mime_for_extension};
pub use self::ignore::IgnoreMatcher;
pub use walk::{FileScanner, ScannedFile};
