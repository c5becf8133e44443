//! Object-created notifications and the object references they carry.

use chrono::{DateTime, Utc};
use object_store::path::Path as ObjectPath;
use serde::Deserialize;
use std::fmt;

use crate::error::EventError;

/// Bucket and key of a stored playlist.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectReference {
    pub bucket: String,
    pub key: String,
}

impl ObjectReference {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Location of the object inside its bucket's store.
    pub fn path(&self) -> ObjectPath {
        ObjectPath::from(self.key.as_str())
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// S3 event notification document.
#[derive(Debug, Clone, Deserialize)]
pub struct Notification {
    #[serde(rename = "Records", default)]
    pub records: Vec<NotificationRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub event_time: Option<DateTime<Utc>>,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Object {
    /// Form-encoded object key, as delivered by S3.
    pub key: String,
    #[serde(default)]
    pub size: Option<u64>,
}

impl Notification {
    pub fn from_slice(data: &[u8]) -> Result<Self, EventError> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Reference named by the first record.
    ///
    /// One notification triggers one check; further records are ignored.
    pub fn first_reference(&self) -> Result<ObjectReference, EventError> {
        let record = self.records.first().ok_or(EventError::NoRecords)?;

        if self.records.len() > 1 {
            tracing::warn!(
                records = self.records.len(),
                "Notification carries several records, only the first is checked"
            );
        }

        record.reference()
    }
}

impl NotificationRecord {
    pub fn reference(&self) -> Result<ObjectReference, EventError> {
        let key = decode_key(&self.s3.object.key)?;
        tracing::debug!(
            bucket = %self.s3.bucket.name,
            key = %key,
            event_name = self.event_name.as_deref().unwrap_or("unknown"),
            size = ?self.s3.object.size,
            "Decoded notification record"
        );
        Ok(ObjectReference::new(self.s3.bucket.name.clone(), key))
    }
}

/// Decode an S3 notification key (`+` is a space, then percent-decoding).
pub fn decode_key(raw: &str) -> Result<String, EventError> {
    if raw.is_empty() {
        return Err(EventError::InvalidKey {
            key: raw.to_string(),
            reason: "key is empty".to_string(),
        });
    }

    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|key| key.into_owned())
        .map_err(|e| EventError::InvalidKey {
            key: raw.to_string(),
            reason: e.to_string(),
        })
}
