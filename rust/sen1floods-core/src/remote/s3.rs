// rust/sen1floods-core/src/remote/s3.rs

//! S3-compatible remote store using the object_store crate.
//!
//! `object_store` is async; this store owns a current-thread tokio runtime
//! and blocks on each read, so it must not be called from inside another
//! tokio runtime.

use std::sync::Arc;

use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::ObjectStore;

use super::RemoteStore;
use crate::config::S3Config;
use crate::error::{FloodsError, Result};

/// S3-compatible remote store.
pub struct S3Store {
    /// The underlying object store client.
    store: Arc<AmazonS3>,
    /// Bucket name, kept for logging.
    bucket: String,
    /// Key prefix for all logical paths.
    base_prefix: String,
    /// Runtime driving the async client.
    runtime: tokio::runtime::Runtime,
}

impl S3Store {
    /// Creates a new S3Store from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the S3 client or its runtime cannot be built.
    pub fn new(config: &S3Config) -> Result<Self> {
        config.validate()?;

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region);

        // Set endpoint if provided (for MinIO, LocalStack, etc.)
        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }

        // Set credentials if provided
        if let Some(access_key) = &config.access_key_id {
            builder = builder.with_access_key_id(access_key);
        }
        if let Some(secret_key) = &config.secret_access_key {
            builder = builder.with_secret_access_key(secret_key);
        }
        if let Some(token) = &config.session_token {
            builder = builder.with_token(token);
        }

        // Configure path style (required for MinIO)
        if config.force_path_style {
            builder = builder.with_virtual_hosted_style_request(false);
        }

        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| FloodsError::config_with_source("failed to build S3 client", e))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| FloodsError::config_with_source("failed to start S3 runtime", e))?;

        Ok(Self {
            store: Arc::new(store),
            bucket: config.bucket.clone(),
            base_prefix: config.prefix.clone(),
            runtime,
        })
    }

    /// Maps a logical path to an object key with the base prefix.
    fn resolve_path(&self, path: &str) -> object_store::path::Path {
        let key = if self.base_prefix.is_empty() {
            path.trim_start_matches('/').to_string()
        } else {
            format!(
                "{}/{}",
                self.base_prefix.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        };
        object_store::path::Path::from(key)
    }
}

impl RemoteStore for S3Store {
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let object_path = self.resolve_path(path);
        let store = self.store.clone();

        let bytes = self
            .runtime
            .block_on(async move {
                let result = store.get(&object_path).await?;
                result.bytes().await
            })
            .map_err(|e| FloodsError::remote_fetch_with_source(path, "failed to read object", e))?;

        Ok(bytes.to_vec())
    }

    fn describe(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.base_prefix.trim_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store(prefix: &str) -> S3Store {
        let config = S3Config {
            bucket: "sen1floods11".to_string(),
            prefix: prefix.to_string(),
            endpoint: Some("http://localhost:9000".to_string()),
            access_key_id: Some("minio".to_string()),
            secret_access_key: Some("minio123".to_string()),
            allow_http: true,
            force_path_style: true,
            ..Default::default()
        };
        S3Store::new(&config).unwrap()
    }

    #[test]
    fn test_resolve_path_without_prefix() {
        let store = test_store("");
        assert_eq!(
            store.resolve_path("/v1.1/S1Hand/tile.tif").as_ref(),
            "v1.1/S1Hand/tile.tif"
        );
    }

    #[test]
    fn test_resolve_path_with_prefix() {
        let store = test_store("datasets/");
        assert_eq!(
            store.resolve_path("/v1.1/S1Hand/tile.tif").as_ref(),
            "datasets/v1.1/S1Hand/tile.tif"
        );
        assert_eq!(store.describe(), "s3://sen1floods11/datasets");
    }

    #[test]
    fn test_new_rejects_empty_bucket() {
        assert!(S3Store::new(&S3Config::default()).is_err());
    }
}
