//! Stale live-playlist detection for object storage.
//!
//! Each object-created notification for an HLS playlist triggers one check:
//! the playlist is read, and if it is a live media playlist the check waits
//! until it would be overdue and deletes it when it was not rewritten in the
//! meantime.
//!
//! ```no_run
//! use std::sync::Arc;
//! use common::config::{StalenessConfig, StorageConfig};
//! use common::storage::BucketStores;
//! use janitor::{NotificationHandler, ObjectStorePlaylists, SystemClock};
//!
//! # async fn run(notification: janitor::Notification) -> anyhow::Result<()> {
//! let stores = Arc::new(BucketStores::from_config(&StorageConfig::default())?);
//! let handler = NotificationHandler::new(
//!     Arc::new(ObjectStorePlaylists::new(stores)),
//!     Arc::new(SystemClock),
//!     StalenessConfig::default(),
//! );
//! let response = handler.handle_notification(&notification).await?;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod error;
pub mod evaluator;
pub mod event;
pub mod handler;
pub mod playlist;
pub mod response;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use clock::{Clock, SystemClock};
pub use error::{EventError, HandlerError, JanitorError, PlaylistError, StoreError};
pub use evaluator::{Evaluation, NotApplicableReason, StalenessDecision, StalenessEvaluator};
pub use event::{Notification, ObjectReference};
pub use handler::NotificationHandler;
pub use playlist::{Playlist, PlaylistKind};
pub use response::Response;
pub use store::{ObjectStorePlaylists, PlaylistStore};
