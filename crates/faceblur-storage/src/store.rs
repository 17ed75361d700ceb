//! Object storage seam.

use std::path::Path;
use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use faceblur_models::VideoRef;

use crate::error::StorageResult;

/// Content type used when the source object does not report one.
pub const DEFAULT_CONTENT_TYPE: &str = "video/mp4";

/// Streaming object body.
pub type ByteReader = Pin<Box<dyn AsyncRead + Send>>;

/// Download and upload of whole objects.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Open `object` for streaming reads.
    async fn download(&self, object: &VideoRef) -> StorageResult<ByteReader>;

    /// Content type recorded on `object`, if any.
    async fn content_type(&self, object: &VideoRef) -> StorageResult<Option<String>>;

    /// Upload the file at `path` as `object`.
    async fn upload(&self, object: &VideoRef, path: &Path, content_type: &str) -> StorageResult<()>;
}
