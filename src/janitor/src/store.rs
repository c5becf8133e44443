//! Object storage seam.
//!
//! The staleness check needs three operations: read a playlist with its
//! metadata, read the metadata again, and delete. [`ObjectStorePlaylists`]
//! provides them over `object_store`.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use common::storage::BucketStores;
use object_store::ObjectStore;
use std::sync::Arc;

use crate::error::StoreError;
use crate::event::ObjectReference;

/// Metadata of a stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub last_modified: DateTime<Utc>,
    pub size: u64,
}

impl From<&object_store::ObjectMeta> for ObjectMetadata {
    fn from(meta: &object_store::ObjectMeta) -> Self {
        Self {
            last_modified: meta.last_modified,
            size: meta.size,
        }
    }
}

/// Body and metadata from one read.
#[derive(Debug, Clone)]
pub struct FetchedObject {
    pub body: Bytes,
    pub metadata: ObjectMetadata,
}

#[async_trait]
pub trait PlaylistStore: Send + Sync {
    /// Read the object body together with its metadata.
    async fn fetch(&self, reference: &ObjectReference) -> Result<FetchedObject, StoreError>;

    /// Read the object metadata only.
    async fn head(&self, reference: &ObjectReference) -> Result<ObjectMetadata, StoreError>;

    async fn delete(&self, reference: &ObjectReference) -> Result<(), StoreError>;
}

/// [`PlaylistStore`] backed by one object store per bucket.
pub struct ObjectStorePlaylists {
    stores: Arc<BucketStores>,
}

impl ObjectStorePlaylists {
    pub fn new(stores: Arc<BucketStores>) -> Self {
        Self { stores }
    }

    fn store(&self, reference: &ObjectReference) -> Result<Arc<dyn ObjectStore>, StoreError> {
        self.stores
            .resolve(&reference.bucket)
            .map_err(|e| StoreError::Unavailable {
                bucket: reference.bucket.clone(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl PlaylistStore for ObjectStorePlaylists {
    async fn fetch(&self, reference: &ObjectReference) -> Result<FetchedObject, StoreError> {
        let store = self.store(reference)?;
        let result = store.get(&reference.path()).await?;
        let metadata = ObjectMetadata::from(&result.meta);
        let body = result.bytes().await?;

        tracing::debug!(
            bucket = %reference.bucket,
            key = %reference.key,
            size = metadata.size,
            last_modified = %metadata.last_modified,
            "Fetched playlist"
        );

        Ok(FetchedObject { body, metadata })
    }

    async fn head(&self, reference: &ObjectReference) -> Result<ObjectMetadata, StoreError> {
        let store = self.store(reference)?;
        let meta = store.head(&reference.path()).await?;
        Ok(ObjectMetadata::from(&meta))
    }

    async fn delete(&self, reference: &ObjectReference) -> Result<(), StoreError> {
        let store = self.store(reference)?;
        store.delete(&reference.path()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::storage::StorageBackend;
    use object_store::PutPayload;

    async fn stores_with_playlist(body: &'static [u8]) -> (Arc<BucketStores>, ObjectReference) {
        let stores = Arc::new(BucketStores::new(StorageBackend::Memory));
        let reference = ObjectReference::new("media", "live/index.m3u8");
        stores
            .resolve(&reference.bucket)
            .unwrap()
            .put(&reference.path(), PutPayload::from_static(body))
            .await
            .unwrap();
        (stores, reference)
    }

    #[tokio::test]
    async fn test_fetch_returns_body_and_metadata() {
        let (stores, reference) = stores_with_playlist(b"#EXTM3U\n").await;
        let playlists = ObjectStorePlaylists::new(stores);

        let object = playlists.fetch(&reference).await.unwrap();
        assert_eq!(object.body.as_ref(), b"#EXTM3U\n");
        assert_eq!(object.metadata.size, 8);

        let metadata = playlists.head(&reference).await.unwrap();
        assert_eq!(metadata, object.metadata);
    }

    #[tokio::test]
    async fn test_fetch_missing_object() {
        let playlists =
            ObjectStorePlaylists::new(Arc::new(BucketStores::new(StorageBackend::Memory)));
        let reference = ObjectReference::new("media", "missing.m3u8");

        assert!(matches!(
            playlists.fetch(&reference).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            playlists.head(&reference).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_object() {
        let (stores, reference) = stores_with_playlist(b"#EXTM3U\n").await;
        let playlists = ObjectStorePlaylists::new(stores);

        playlists.delete(&reference).await.unwrap();
        assert!(matches!(
            playlists.head(&reference).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_bucket_is_unavailable() {
        let playlists =
            ObjectStorePlaylists::new(Arc::new(BucketStores::new(StorageBackend::Memory)));
        let reference = ObjectReference::new("", "index.m3u8");

        assert!(matches!(
            playlists.fetch(&reference).await,
            Err(StoreError::Unavailable { .. })
        ));
    }
}
