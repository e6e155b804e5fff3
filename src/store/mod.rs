//! Document store layer: REST client, chunk schema, manifest.
//!
//! The store is the only shared mutable state in the system. All writes are
//! single-document upserts (idempotent by id) or bulk operations that
//! proceed past version conflicts.

pub mod chunk;
pub mod client;
pub mod manifest;

pub use chunk::{ChunkDocument, ChunkLink, EMBEDDING_DIM, chunk_doc_id, parse_chunk_id};
pub use client::{BulkOp, EsClient, bulk_body};
pub use manifest::{ManifestEntry, ManifestStore};
