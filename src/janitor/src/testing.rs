//! Test doubles for the store and clock seams.
//!
//! Available with the `testing` feature or during tests:
//!
//! ```toml
//! [dev-dependencies]
//! janitor = { path = "../janitor", features = ["testing"] }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::clock::Clock;
use crate::error::StoreError;
use crate::event::ObjectReference;
use crate::store::{FetchedObject, ObjectMetadata, PlaylistStore};

/// UTC instant `secs` seconds after the Unix epoch.
pub fn epoch(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Clock that only moves when slept on.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Every duration passed to [`Clock::sleep`], in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(duration);

        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(advanced) = TimeDelta::from_std(duration)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
        {
            *now = advanced;
        }
    }
}

/// Store replaying a fixed metadata timeline for a single object.
///
/// `fetch` returns the body with the initial metadata. Each `head` pops the
/// next scripted recheck, falling back to the initial metadata.
#[derive(Debug)]
pub struct ScriptedStore {
    body: Option<Bytes>,
    initial: ObjectMetadata,
    rechecks: Mutex<VecDeque<Option<ObjectMetadata>>>,
    fail_delete: bool,
    heads: AtomicUsize,
    deleted: Mutex<Vec<ObjectReference>>,
}

impl ScriptedStore {
    pub fn new(body: impl Into<Bytes>, last_modified: DateTime<Utc>) -> Self {
        let body = body.into();
        Self {
            initial: ObjectMetadata {
                last_modified,
                size: body.len() as u64,
            },
            body: Some(body),
            rechecks: Mutex::new(VecDeque::new()),
            fail_delete: false,
            heads: AtomicUsize::new(0),
            deleted: Mutex::new(Vec::new()),
        }
    }

    /// Store in which the object does not exist.
    pub fn missing() -> Self {
        let mut store = Self::new(Bytes::new(), epoch(0));
        store.body = None;
        store
    }

    /// Script the modification time seen by the next recheck.
    pub fn with_recheck(self, last_modified: DateTime<Utc>) -> Self {
        let metadata = ObjectMetadata {
            last_modified,
            size: self.initial.size,
        };
        self.push_recheck(Some(metadata));
        self
    }

    /// Object disappears before the recheck.
    pub fn vanishing_on_recheck(self) -> Self {
        self.push_recheck(None);
        self
    }

    /// Make every delete fail as if the object were already gone.
    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn head_count(&self) -> usize {
        self.heads.load(Ordering::SeqCst)
    }

    /// References passed to successful deletes.
    pub fn deleted(&self) -> Vec<ObjectReference> {
        self.deleted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn push_recheck(&self, metadata: Option<ObjectMetadata>) {
        self.rechecks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(metadata);
    }

    fn not_found(reference: &ObjectReference) -> StoreError {
        StoreError::NotFound {
            path: reference.key.clone(),
        }
    }
}

#[async_trait]
impl PlaylistStore for ScriptedStore {
    async fn fetch(&self, reference: &ObjectReference) -> Result<FetchedObject, StoreError> {
        let body = self
            .body
            .clone()
            .ok_or_else(|| Self::not_found(reference))?;
        Ok(FetchedObject {
            body,
            metadata: self.initial,
        })
    }

    async fn head(&self, reference: &ObjectReference) -> Result<ObjectMetadata, StoreError> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        if self.body.is_none() {
            return Err(Self::not_found(reference));
        }

        let scripted = self
            .rechecks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match scripted {
            Some(Some(metadata)) => Ok(metadata),
            Some(None) => Err(Self::not_found(reference)),
            None => Ok(self.initial),
        }
    }

    async fn delete(&self, reference: &ObjectReference) -> Result<(), StoreError> {
        if self.fail_delete || self.body.is_none() {
            return Err(Self::not_found(reference));
        }
        self.deleted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(reference.clone());
        Ok(())
    }
}
