use anyhow::Result;
use object_store::{ObjectStore, aws::AmazonS3Builder, local::LocalFileSystem, memory::InMemory};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use url::Url;

use crate::config::StorageConfig;

/// Backend selected by a storage DSN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// AWS S3, or an S3-compatible endpoint when `endpoint` is set.
    S3 { endpoint: Option<String> },
    /// Local filesystem; each bucket is a subdirectory of `root`.
    Filesystem { root: PathBuf },
    /// Process-local in-memory stores.
    Memory,
}

impl StorageBackend {
    /// Parse a storage DSN.
    ///
    /// # Examples
    /// ```
    /// use common::storage::StorageBackend;
    ///
    /// assert_eq!(
    ///     StorageBackend::from_dsn("s3://").unwrap(),
    ///     StorageBackend::S3 { endpoint: None }
    /// );
    /// assert_eq!(StorageBackend::from_dsn("memory://").unwrap(), StorageBackend::Memory);
    /// ```
    pub fn from_dsn(dsn: &str) -> Result<Self> {
        let url =
            Url::parse(dsn).map_err(|e| anyhow::anyhow!("Invalid storage DSN '{}': {}", dsn, e))?;

        match url.scheme() {
            "file" => {
                let path = url.path();
                if path.is_empty() || path == "/" {
                    return Err(anyhow::anyhow!(
                        "File DSN must specify a path: file:///path/to/buckets"
                    ));
                }
                Ok(Self::Filesystem {
                    root: PathBuf::from(path),
                })
            }
            "memory" => Ok(Self::Memory),
            "s3" => Ok(Self::S3 {
                endpoint: s3_endpoint_from_dsn(&url),
            }),
            scheme => Err(anyhow::anyhow!(
                "Unsupported storage scheme: {}. Supported: file, memory, s3",
                scheme
            )),
        }
    }
}

/// Custom endpoint for S3-compatible services.
///
/// Returns `None` for `s3://` and for hosts under amazonaws.com.
fn s3_endpoint_from_dsn(dsn: &Url) -> Option<String> {
    let host = dsn.host_str().filter(|host| !host.is_empty())?;
    if host.contains("amazonaws.com") {
        return None;
    }
    let port = dsn.port();
    let scheme = if port == Some(443) { "https" } else { "http" };
    Some(match port {
        Some(p) => format!("{scheme}://{host}:{p}"),
        None => format!("{scheme}://{host}"),
    })
}

/// Create an S3 builder for one bucket.
///
/// Credentials and region come from the standard `AWS_*` environment.
pub fn create_s3_builder(bucket: &str, endpoint: Option<&str>) -> AmazonS3Builder {
    let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

    if let Some(endpoint) = endpoint {
        builder = builder
            .with_endpoint(endpoint)
            .with_allow_http(true)
            .with_virtual_hosted_style_request(false); // MinIO requires path-style URLs
    }

    builder
}

/// Reject bucket names that cannot be used as a single path segment.
fn validate_bucket_name(bucket: &str) -> Result<()> {
    if bucket.is_empty() {
        anyhow::bail!("Bucket name cannot be empty");
    }
    if bucket == "." || bucket == ".." || bucket.contains(['/', '\\']) {
        anyhow::bail!("Invalid bucket name '{}'", bucket);
    }
    Ok(())
}

/// Resolves object stores by bucket name.
///
/// Notifications name the bucket, while an [`ObjectStore`] is bound to a
/// single bucket, so stores are created on first use and cached.
#[derive(Debug)]
pub struct BucketStores {
    backend: StorageBackend,
    stores: Mutex<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl BucketStores {
    pub fn new(backend: StorageBackend) -> Self {
        Self {
            backend,
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Create bucket stores from storage configuration.
    pub fn from_config(storage_config: &StorageConfig) -> Result<Self> {
        Ok(Self::new(StorageBackend::from_dsn(&storage_config.dsn)?))
    }

    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    /// Return the store for `bucket`, creating it if needed.
    ///
    /// Never creates anything in the backing storage. A filesystem bucket
    /// must already exist as a directory under the root.
    pub fn resolve(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        validate_bucket_name(bucket)?;

        let mut stores = self
            .stores
            .lock()
            .map_err(|_| anyhow::anyhow!("Bucket store cache lock poisoned"))?;

        if let Some(store) = stores.get(bucket) {
            return Ok(Arc::clone(store));
        }

        let store = self.create(bucket)?;
        stores.insert(bucket.to_string(), Arc::clone(&store));
        Ok(store)
    }

    fn create(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        match &self.backend {
            StorageBackend::S3 { endpoint } => {
                let builder = create_s3_builder(bucket, endpoint.as_deref());
                Ok(Arc::new(builder.build()?))
            }
            StorageBackend::Filesystem { root } => {
                let path = root.join(bucket);
                let store = LocalFileSystem::new_with_prefix(&path).map_err(|e| {
                    anyhow::anyhow!("Bucket directory {} is not usable: {}", path.display(), e)
                })?;
                Ok(Arc::new(store))
            }
            StorageBackend::Memory => Ok(Arc::new(InMemory::new())),
        }
    }
}
