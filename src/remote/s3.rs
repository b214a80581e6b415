//! S3-backed [`ObjectStore`].
//!
//! The SDK is async; every call blocks on a private current-thread runtime.

use std::path::Path;

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tokio::runtime::{Builder, Runtime};

use super::store::{ObjectStore, StorageError, StorageResult};
use crate::config::StorageConfig;

/// Object store over one S3 bucket.
pub struct S3ObjectStore {
    bucket: String,
    client: Client,
    runtime: Runtime,
}

impl S3ObjectStore {
    pub fn new(config: &StorageConfig) -> StorageResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StorageError::Runtime(e.to_string()))?;

        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "snowduck",
        );
        let sdk_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .build();

        Ok(Self {
            bucket: config.remote_bucket_name.clone(),
            client: Client::from_conf(sdk_config),
            runtime,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl ObjectStore for S3ObjectStore {
    fn upload(&self, local: &Path, key: &str) -> StorageResult<()> {
        self.runtime.block_on(async {
            let body = ByteStream::from_path(local)
                .await
                .map_err(|e| request_error(key, e))?;
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(body)
                .send()
                .await
                .map_err(|e| request_error(key, e))?;
            Ok::<_, StorageError>(())
        })?;
        tracing::debug!(bucket = %self.bucket, key, "uploaded object");
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.runtime.block_on(async {
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| request_error(key, e))
        })?;
        tracing::debug!(bucket = %self.bucket, key, "deleted object");
        Ok(())
    }

    fn uri(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }

    fn load_prelude(&self) -> Option<&str> {
        Some("LOAD aws; LOAD httpfs;")
    }
}

fn request_error(key: &str, err: impl std::fmt::Display) -> StorageError {
    StorageError::Request {
        key: key.to_string(),
        message: err.to_string(),
    }
}
