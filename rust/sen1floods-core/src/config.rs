// rust/sen1floods-core/src/config.rs

//! Configuration management for the dataset loader.
//!
//! A `LoaderConfig` names the dataset context, how the local cache is read
//! and written, where missing files are fetched from, and the default
//! iteration flags. It is read from TOML, patched from `S1F_*` variables,
//! then checked with `validate`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{FloodsError, Result};

// Top-level loader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Dataset root. Manifests and the local cache are resolved against it.
    pub context: PathBuf,
    /// Bypass the local cache entirely: every file is fetched remotely and
    /// nothing is written to disk.
    pub no_cache: bool,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub dataset: DatasetConfig,
    pub remote: RemoteConfig,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            context: PathBuf::from("."),
            no_cache: false,
            storage: StorageConfig::default(),
            cache: CacheConfig::default(),
            dataset: DatasetConfig::default(),
            remote: RemoteConfig::default(),
        }
    }
}

// Local cache I/O options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    // Buffer size in bytes for I/O operations.
    pub buffer_size: usize,
    // Whether to use memory-mapped I/O for cached rasters.
    pub use_mmap: bool,
    // File size threshold (bytes) above which to use mmap.
    pub mmap_threshold: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            buffer_size: 64 * 1024, // 64 KB
            use_mmap: true,
            mmap_threshold: 1024 * 1024, // 1 MB
        }
    }
}

/// How a remotely fetched file is materialized in the local cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheWriteMode {
    /// Write the fetched bytes unchanged.
    #[default]
    Raw,
    /// Decode the fetched bytes and write the re-encoded raster.
    Reencode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub write_mode: CacheWriteMode,
}

/// Per-iteration defaults handed to split sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    // Whether to shuffle manifest rows before iterating.
    pub shuffle: bool,
    // Optional seed for reproducible shuffling.
    pub seed: Option<u64>,
    // Allow fetching files missing from the local cache.
    pub stream: bool,
    // Persist remotely fetched files to the local cache.
    pub stream_cache: bool,
    // Log and skip examples that fail to resolve instead of aborting.
    pub skip_errors: bool,
    // Check framework-variant examples against the declared feature schema.
    pub validate_schema: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            shuffle: false,
            seed: None,
            stream: false,
            stream_cache: true,
            skip_errors: false,
            validate_schema: true,
        }
    }
}

/// Remote store backend type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteBackendType {
    /// No remote store; only the local cache is readable.
    #[default]
    None,
    /// A directory holding a full copy of the remote store.
    Mirror,
    /// S3-compatible object storage.
    S3,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Remote backend type: "none", "mirror" or "s3".
    pub backend: RemoteBackendType,
    /// Root directory of the mirror backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror_root: Option<PathBuf>,
    /// S3-specific configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Config>,
}

/// S3-compatible remote configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    /// S3 bucket name.
    pub bucket: String,
    /// AWS region (e.g., "us-east-1").
    pub region: String,
    /// Key prefix prepended to every logical path.
    pub prefix: String,
    /// Custom endpoint URL (for MinIO, LocalStack, etc.).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// AWS access key ID (if not using instance credentials).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    /// AWS secret access key (if not using instance credentials).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
    /// AWS session token (for temporary credentials).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    /// Whether to use path-style addressing (required for MinIO).
    pub force_path_style: bool,
    /// Whether to allow HTTP (non-TLS) connections.
    pub allow_http: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: "us-east-1".to_string(),
            prefix: String::new(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            force_path_style: false,
            allow_http: false,
        }
    }
}

impl S3Config {
    /// Apply environment variable overrides to S3 configuration.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("S1F_S3_BUCKET") {
            self.bucket = val;
        }
        if let Ok(val) = std::env::var("S1F_S3_REGION") {
            self.region = val;
        }
        if let Ok(val) = std::env::var("S1F_S3_PREFIX") {
            self.prefix = val;
        }
        if let Ok(val) = std::env::var("S1F_S3_ENDPOINT") {
            self.endpoint = Some(val);
        }
        if let Ok(val) = std::env::var("S1F_S3_ACCESS_KEY_ID") {
            self.access_key_id = Some(val);
        }
        if let Ok(val) = std::env::var("S1F_S3_SECRET_ACCESS_KEY") {
            self.secret_access_key = Some(val);
        }
        if let Ok(val) = std::env::var("S1F_S3_SESSION_TOKEN") {
            self.session_token = Some(val);
        }
        if let Ok(val) = std::env::var("S1F_S3_FORCE_PATH_STYLE") {
            if let Ok(v) = val.parse() {
                self.force_path_style = v;
            }
        }
        if let Ok(val) = std::env::var("S1F_S3_ALLOW_HTTP") {
            if let Ok(v) = val.parse() {
                self.allow_http = v;
            }
        }
        self
    }

    /// Validate S3 configuration.
    pub fn validate(&self) -> Result<()> {
        if self.bucket.is_empty() {
            return Err(FloodsError::config("remote.s3.bucket must not be empty"));
        }
        if self.region.is_empty() {
            return Err(FloodsError::config("remote.s3.region must not be empty"));
        }
        Ok(())
    }
}

impl FromStr for LoaderConfig {
    type Err = FloodsError;

    /// Parse configuration from a TOML string.
    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| FloodsError::config_with_source("failed to parse TOML config", e))
    }
}

impl LoaderConfig {
    /// Creates a default configuration rooted at `context`.
    pub fn with_context(context: impl Into<PathBuf>) -> Self {
        Self {
            context: context.into(),
            ..Default::default()
        }
    }

    // Load configuration from a TOML file.
    //
    // # Errors
    //
    // Returns an error if the file cannot be read, parsed, or is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FloodsError::storage_with_source(path, "failed to read config file", e)
        })?;
        let config: Self = content.parse()?;
        config.validate()?;
        Ok(config)
    }

    // Apply environment variable overrides.
    //
    // Environment variables are prefixed with `S1F_` and use underscores
    // to separate nested fields. For example:
    // - `S1F_CONTEXT` overrides `context`
    // - `S1F_NO_CACHE` overrides `no_cache`
    // - `S1F_DATASET_STREAM` overrides `dataset.stream`
    // - `S1F_REMOTE_BACKEND` overrides `remote.backend` ("none", "mirror" or "s3")
    // - `S1F_S3_BUCKET` overrides `remote.s3.bucket`
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("S1F_CONTEXT") {
            self.context = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("S1F_NO_CACHE") {
            if let Ok(v) = val.parse() {
                self.no_cache = v;
            }
        }

        // Storage overrides
        if let Ok(val) = std::env::var("S1F_STORAGE_BUFFER_SIZE") {
            if let Ok(v) = val.parse() {
                self.storage.buffer_size = v;
            }
        }
        if let Ok(val) = std::env::var("S1F_STORAGE_USE_MMAP") {
            if let Ok(v) = val.parse() {
                self.storage.use_mmap = v;
            }
        }
        if let Ok(val) = std::env::var("S1F_STORAGE_MMAP_THRESHOLD") {
            if let Ok(v) = val.parse() {
                self.storage.mmap_threshold = v;
            }
        }

        if let Ok(val) = std::env::var("S1F_CACHE_WRITE_MODE") {
            match val.to_lowercase().as_str() {
                "raw" => self.cache.write_mode = CacheWriteMode::Raw,
                "reencode" => self.cache.write_mode = CacheWriteMode::Reencode,
                _ => {} // ignore invalid values
            }
        }

        // Dataset overrides
        if let Ok(val) = std::env::var("S1F_DATASET_SHUFFLE") {
            if let Ok(v) = val.parse() {
                self.dataset.shuffle = v;
            }
        }
        if let Ok(val) = std::env::var("S1F_DATASET_SEED") {
            if let Ok(v) = val.parse() {
                self.dataset.seed = Some(v);
            }
        }
        if let Ok(val) = std::env::var("S1F_DATASET_STREAM") {
            if let Ok(v) = val.parse() {
                self.dataset.stream = v;
            }
        }
        if let Ok(val) = std::env::var("S1F_DATASET_STREAM_CACHE") {
            if let Ok(v) = val.parse() {
                self.dataset.stream_cache = v;
            }
        }
        if let Ok(val) = std::env::var("S1F_DATASET_SKIP_ERRORS") {
            if let Ok(v) = val.parse() {
                self.dataset.skip_errors = v;
            }
        }
        if let Ok(val) = std::env::var("S1F_DATASET_VALIDATE_SCHEMA") {
            if let Ok(v) = val.parse() {
                self.dataset.validate_schema = v;
            }
        }

        // Remote overrides
        if let Ok(val) = std::env::var("S1F_REMOTE_BACKEND") {
            match val.to_lowercase().as_str() {
                "none" => self.remote.backend = RemoteBackendType::None,
                "mirror" => self.remote.backend = RemoteBackendType::Mirror,
                "s3" => self.remote.backend = RemoteBackendType::S3,
                _ => {} // ignore invalid values
            }
        }
        if let Ok(val) = std::env::var("S1F_REMOTE_MIRROR_ROOT") {
            self.remote.mirror_root = Some(PathBuf::from(val));
        }

        // S3 overrides - create S3Config if any S3 env vars are set
        if std::env::var("S1F_S3_BUCKET").is_ok() {
            let s3_config = self.remote.s3.take().unwrap_or_default().with_env_overrides();
            self.remote.s3 = Some(s3_config);
        } else if let Some(s3_config) = self.remote.s3.take() {
            self.remote.s3 = Some(s3_config.with_env_overrides());
        }

        self
    }

    // Rejects settings the loader cannot start with, such as a mirror
    // backend without a root.
    //
    // # Errors
    //
    // Returns `FloodsError::Config` naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.context.as_os_str().is_empty() {
            return Err(FloodsError::config("context must not be empty"));
        }

        if self.storage.buffer_size == 0 {
            return Err(FloodsError::config(
                "storage.buffer_size must be greater than 0",
            ));
        }

        match self.remote.backend {
            RemoteBackendType::None => {}
            RemoteBackendType::Mirror => {
                if self.remote.mirror_root.is_none() {
                    return Err(FloodsError::config(
                        "remote.mirror_root is required when backend is 'mirror'",
                    ));
                }
            }
            RemoteBackendType::S3 => match &self.remote.s3 {
                Some(s3_config) => s3_config.validate()?,
                None => {
                    return Err(FloodsError::config(
                        "remote.s3 configuration is required when backend is 's3'",
                    ));
                }
            },
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LoaderConfig::default();

        assert_eq!(config.context, PathBuf::from("."));
        assert!(!config.no_cache);
        assert_eq!(config.storage.buffer_size, 64 * 1024);
        assert!(config.storage.use_mmap);
        assert_eq!(config.cache.write_mode, CacheWriteMode::Raw);

        assert!(!config.dataset.shuffle);
        assert!(config.dataset.seed.is_none());
        assert!(!config.dataset.stream);
        assert!(config.dataset.stream_cache);
        assert!(!config.dataset.skip_errors);
        assert!(config.dataset.validate_schema);

        assert_eq!(config.remote.backend, RemoteBackendType::None);
        assert!(config.remote.mirror_root.is_none());
        assert!(config.remote.s3.is_none());
    }

    #[test]
    fn test_default_validates() {
        assert!(LoaderConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_str_empty() {
        let config: LoaderConfig = "".parse().unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.context, PathBuf::from("."));
    }

    #[test]
    fn test_from_str_full() {
        let toml = r#"
            context = "/data/sen1floods11"
            no_cache = true

            [storage]
            buffer_size = 131072
            use_mmap = false

            [cache]
            write_mode = "reencode"

            [dataset]
            shuffle = true
            seed = 7
            stream = true
            stream_cache = false
            skip_errors = true
            validate_schema = false

            [remote]
            backend = "mirror"
            mirror_root = "/mnt/remote"
        "#;

        let config: LoaderConfig = toml.parse().unwrap();

        assert_eq!(config.context, PathBuf::from("/data/sen1floods11"));
        assert!(config.no_cache);
        assert_eq!(config.storage.buffer_size, 131072);
        assert!(!config.storage.use_mmap);
        // Untouched fields keep their defaults
        assert_eq!(config.storage.mmap_threshold, 1024 * 1024);
        assert_eq!(config.cache.write_mode, CacheWriteMode::Reencode);
        assert!(config.dataset.shuffle);
        assert_eq!(config.dataset.seed, Some(7));
        assert!(config.dataset.stream);
        assert!(!config.dataset.stream_cache);
        assert!(config.dataset.skip_errors);
        assert!(!config.dataset.validate_schema);
        assert_eq!(config.remote.backend, RemoteBackendType::Mirror);
        assert_eq!(config.remote.mirror_root, Some(PathBuf::from("/mnt/remote")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_str_invalid_toml() {
        let result: std::result::Result<LoaderConfig, _> = "context = [".parse();
        assert!(matches!(result, Err(FloodsError::Config { .. })));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            context = "/tmp/floods"
            "#
        )
        .unwrap();

        let config = LoaderConfig::from_file(file.path()).unwrap();
        assert_eq!(config.context, PathBuf::from("/tmp/floods"));
    }

    #[test]
    fn test_from_file_not_found() {
        let result = LoaderConfig::from_file("/nonexistent/sen1floods.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_invalid_buffer_size() {
        let mut config = LoaderConfig::default();
        config.storage.buffer_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mirror_requires_root() {
        let mut config = LoaderConfig::default();
        config.remote.backend = RemoteBackendType::Mirror;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("mirror_root"));

        config.remote.mirror_root = Some(PathBuf::from("/mnt/remote"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_s3_backend_requires_s3_config() {
        let mut config = LoaderConfig::default();
        config.remote.backend = RemoteBackendType::S3;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("remote.s3 configuration is required"));

        config.remote.s3 = Some(S3Config::default());
        assert!(config.validate().unwrap_err().to_string().contains("bucket"));

        config.remote.s3 = Some(S3Config {
            bucket: "floods".to_string(),
            ..Default::default()
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_s3_config_from_toml() {
        let toml = r#"
            [remote]
            backend = "s3"

            [remote.s3]
            bucket = "sen1floods11"
            region = "eu-west-1"
            prefix = "dvc-store"
            endpoint = "http://localhost:9000"
            force_path_style = true
            allow_http = true
        "#;

        let config: LoaderConfig = toml.parse().unwrap();
        assert_eq!(config.remote.backend, RemoteBackendType::S3);

        let s3 = config.remote.s3.unwrap();
        assert_eq!(s3.bucket, "sen1floods11");
        assert_eq!(s3.region, "eu-west-1");
        assert_eq!(s3.prefix, "dvc-store");
        assert_eq!(s3.endpoint, Some("http://localhost:9000".to_string()));
        assert!(s3.force_path_style);
        assert!(s3.allow_http);
    }

    // Helper to clear all S1F_ environment variables for test isolation
    fn clear_s1f_env_vars() {
        for (key, _) in std::env::vars() {
            if key.starts_with("S1F_") {
                std::env::remove_var(&key);
            }
        }
    }

    // One test for all S1F_* variables; they are process-global.
    #[test]
    fn test_env_overrides() {
        clear_s1f_env_vars();

        std::env::set_var("S1F_CONTEXT", "/env/context");
        std::env::set_var("S1F_NO_CACHE", "true");
        std::env::set_var("S1F_DATASET_STREAM", "true");
        std::env::set_var("S1F_DATASET_SEED", "99");
        std::env::set_var("S1F_CACHE_WRITE_MODE", "REENCODE");
        std::env::set_var("S1F_REMOTE_BACKEND", "mirror");
        std::env::set_var("S1F_REMOTE_MIRROR_ROOT", "/env/mirror");

        let config = LoaderConfig::default().with_env_overrides();

        assert_eq!(config.context, PathBuf::from("/env/context"));
        assert!(config.no_cache);
        assert!(config.dataset.stream);
        assert_eq!(config.dataset.seed, Some(99));
        assert_eq!(config.cache.write_mode, CacheWriteMode::Reencode);
        assert_eq!(config.remote.backend, RemoteBackendType::Mirror);
        assert_eq!(config.remote.mirror_root, Some(PathBuf::from("/env/mirror")));
        assert!(config.remote.s3.is_none());

        clear_s1f_env_vars();

        // Invalid values are ignored
        std::env::set_var("S1F_STORAGE_BUFFER_SIZE", "not_a_number");
        std::env::set_var("S1F_REMOTE_BACKEND", "ftp");
        std::env::set_var("S1F_S3_BUCKET", "env-bucket");

        let config = LoaderConfig::default().with_env_overrides();

        assert_eq!(config.storage.buffer_size, 64 * 1024);
        assert_eq!(config.remote.backend, RemoteBackendType::None);
        assert_eq!(config.remote.s3.unwrap().bucket, "env-bucket");

        clear_s1f_env_vars();
    }

    #[test]
    fn test_serialize_roundtrip() {
        let original = LoaderConfig::with_context("/data");
        let toml_str = toml::to_string(&original).unwrap();
        let parsed: LoaderConfig = toml_str.parse().unwrap();

        assert_eq!(original.context, parsed.context);
        assert_eq!(original.storage.buffer_size, parsed.storage.buffer_size);
        assert_eq!(original.dataset.stream_cache, parsed.dataset.stream_cache);
        assert_eq!(original.cache.write_mode, parsed.cache.write_mode);
    }
}
