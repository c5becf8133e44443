use crate::event::ObjectReference;

/// Errors raised while reading a notification.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Malformed notification: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Notification contains no records")]
    NoRecords,
    #[error("Invalid object key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },
}

/// Errors raised by a [`crate::store::PlaylistStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Object not found: {path}")]
    NotFound { path: String },
    #[error("Store for bucket '{bucket}' unavailable: {reason}")]
    Unavailable { bucket: String, reason: String },
    #[error("Object store error: {0}")]
    Backend(#[source] object_store::Error),
}

impl From<object_store::Error> for StoreError {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { path, .. } => StoreError::NotFound { path },
            other => StoreError::Backend(other),
        }
    }
}

/// Errors raised while parsing playlist content.
#[derive(Debug, thiserror::Error)]
pub enum PlaylistError {
    #[error("Playlist is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("Not an M3U8 playlist: {0}")]
    Invalid(String),
    #[error("Media playlist declares no target duration")]
    MissingTargetDuration,
    #[error("Target duration {0}s is out of range")]
    TargetDurationOutOfRange(f64),
}

/// Fatal errors of one staleness check.
///
/// None of them is retried; the check aborts with no partial state.
#[derive(Debug, thiserror::Error)]
pub enum JanitorError {
    #[error("Failed to fetch {reference}: {source}")]
    Fetch {
        reference: ObjectReference,
        #[source]
        source: StoreError,
    },
    #[error("Failed to parse playlist {reference}: {source}")]
    Parse {
        reference: ObjectReference,
        #[source]
        source: PlaylistError,
    },
    #[error("Failed to delete {reference}: {source}")]
    Delete {
        reference: ObjectReference,
        #[source]
        source: StoreError,
    },
}

impl JanitorError {
    pub fn reference(&self) -> &ObjectReference {
        match self {
            JanitorError::Fetch { reference, .. }
            | JanitorError::Parse { reference, .. }
            | JanitorError::Delete { reference, .. } => reference,
        }
    }
}

/// Errors of a whole notification invocation.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Event(#[from] EventError),
    #[error(transparent)]
    Janitor(#[from] JanitorError),
}
