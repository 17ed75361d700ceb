//! S3 object storage client.
//!
//! This crate provides:
//! - Streaming download of source videos
//! - Content type lookup for uploads
//! - File upload of blurred videos
//! - The [`ObjectStore`] seam used by the worker

pub mod client;
pub mod error;
pub mod store;

pub use client::{S3Client, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use store::{ByteReader, ObjectStore, DEFAULT_CONTENT_TYPE};
