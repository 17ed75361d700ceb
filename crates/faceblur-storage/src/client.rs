//! S3 client implementation.

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use aws_types::region::Region;
use tracing::{debug, info};

use faceblur_models::VideoRef;

use crate::error::{StorageError, StorageResult};
use crate::store::{ByteReader, ObjectStore};

/// Default region when `AWS_REGION` is not set.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Configuration for the S3 client.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Custom S3 API endpoint (MinIO, LocalStack, R2); AWS when unset
    pub endpoint_url: Option<String>,
    /// Region
    pub region: String,
    /// Static access key ID; the default provider chain is used when unset
    pub access_key_id: Option<String>,
    /// Static secret access key
    pub secret_access_key: Option<String>,
    /// Address buckets as `/bucket/key` instead of `bucket.host/key`
    pub force_path_style: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            region: DEFAULT_REGION.to_string(),
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
        }
    }
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let access_key_id = std::env::var("S3_ACCESS_KEY_ID").ok();
        let secret_access_key = std::env::var("S3_SECRET_ACCESS_KEY").ok();

        if access_key_id.is_some() != secret_access_key.is_some() {
            return Err(StorageError::config_error(
                "S3_ACCESS_KEY_ID and S3_SECRET_ACCESS_KEY must be set together",
            ));
        }

        Ok(Self {
            endpoint_url: std::env::var("S3_ENDPOINT_URL").ok().filter(|s| !s.is_empty()),
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string()),
            access_key_id,
            secret_access_key,
            force_path_style: std::env::var("S3_FORCE_PATH_STYLE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),
        })
    }

    /// Static credentials for a custom endpoint, path-style addressing.
    pub fn with_static_credentials(
        endpoint_url: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint_url: Some(endpoint_url.into()),
            access_key_id: Some(access_key_id.into()),
            secret_access_key: Some(secret_access_key.into()),
            force_path_style: true,
            ..Default::default()
        }
    }
}

/// S3 storage client.
#[derive(Clone)]
pub struct S3Client {
    client: Client,
}

impl S3Client {
    /// Create a new S3 client from configuration.
    pub async fn new(config: StorageConfig) -> StorageResult<Self> {
        let region = Region::new(config.region);

        let mut builder = match (config.access_key_id, config.secret_access_key) {
            (Some(key_id), Some(secret)) => {
                let credentials = Credentials::new(key_id, secret, None, None, "faceblur-static");
                Builder::new()
                    .behavior_version(BehaviorVersion::latest())
                    .region(region)
                    .credentials_provider(credentials)
            }
            (None, None) => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(region)
                    .load()
                    .await;
                Builder::from(&shared)
            }
            _ => {
                return Err(StorageError::config_error(
                    "Access key ID and secret access key must be set together",
                ))
            }
        };

        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }
        builder = builder.force_path_style(config.force_path_style);

        Ok(Self {
            client: Client::from_conf(builder.build()),
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        let config = StorageConfig::from_env()?;
        Self::new(config).await
    }

    /// Open an object as a byte stream.
    pub async fn download_stream(&self, bucket: &str, key: &str) -> StorageResult<ByteReader> {
        debug!(bucket, key, "Downloading object");

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StorageError::not_found(format!("s3://{}/{}", bucket, key))
                } else {
                    StorageError::download_failed(DisplayErrorContext(&e).to_string())
                }
            })?;

        Ok(Box::pin(response.body.into_async_read()))
    }

    /// Content type of an object, or `None` when it has none.
    pub async fn head_content_type(&self, bucket: &str, key: &str) -> StorageResult<Option<String>> {
        let response = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    StorageError::not_found(format!("s3://{}/{}", bucket, key))
                } else {
                    StorageError::AwsSdk(DisplayErrorContext(&e).to_string())
                }
            })?;

        Ok(response
            .content_type()
            .filter(|ct| !ct.is_empty())
            .map(str::to_string))
    }

    /// Upload a file.
    pub async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: impl AsRef<Path>,
        content_type: &str,
    ) -> StorageResult<()> {
        let path = path.as_ref();
        debug!("Uploading {} to s3://{}/{}", path.display(), bucket, key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(DisplayErrorContext(&e).to_string()))?;

        info!("Uploaded {} to s3://{}/{}", path.display(), bucket, key);
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn download(&self, object: &VideoRef) -> StorageResult<ByteReader> {
        self.download_stream(&object.bucket, &object.key).await
    }

    async fn content_type(&self, object: &VideoRef) -> StorageResult<Option<String>> {
        self.head_content_type(&object.bucket, &object.key).await
    }

    async fn upload(&self, object: &VideoRef, path: &Path, content_type: &str) -> StorageResult<()> {
        self.upload_file(&object.bucket, &object.key, path, content_type)
            .await
    }
}
