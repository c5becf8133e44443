//! Staleness evaluation of a single playlist.
//!
//! A live media playlist is expected to be rewritten at least once per
//! target duration. The evaluator reads the playlist, waits until it would
//! be overdue by `multiple` target durations and then compares the
//! modification time again. An unchanged playlist is deleted.
//!
//! Variant playlists and playlists carrying `#EXT-X-ENDLIST` are never
//! stale.

use chrono::{DateTime, TimeDelta, Utc};
use common::config::StalenessConfig;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::error::{JanitorError, PlaylistError, StoreError};
use crate::event::ObjectReference;
use crate::playlist::{Playlist, PlaylistKind};
use crate::store::PlaylistStore;

/// Why a playlist is exempt from the staleness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotApplicableReason {
    Variant,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StalenessDecision {
    /// Variant index or finished stream.
    NotApplicable(NotApplicableReason),
    /// Rewritten while we waited.
    Fresh,
    /// Not rewritten within the staleness window.
    Stale,
}

impl fmt::Display for StalenessDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StalenessDecision::NotApplicable(NotApplicableReason::Variant) => {
                write!(f, "not-applicable(variant)")
            }
            StalenessDecision::NotApplicable(NotApplicableReason::Ended) => {
                write!(f, "not-applicable(ended)")
            }
            StalenessDecision::Fresh => write!(f, "fresh"),
            StalenessDecision::Stale => write!(f, "stale"),
        }
    }
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub reference: ObjectReference,
    pub decision: StalenessDecision,
    /// Whether a delete was issued. False for stale playlists in dry-run mode.
    pub deleted: bool,
}

/// Instant at which a playlist last modified at `last_modified` becomes stale.
///
/// Returns `None` if the window does not fit the time range.
pub fn stale_deadline(
    last_modified: DateTime<Utc>,
    target_duration: f64,
    multiple: f64,
) -> Option<DateTime<Utc>> {
    let window = Duration::try_from_secs_f64(target_duration * multiple).ok()?;
    let window = TimeDelta::from_std(window).ok()?;
    last_modified.checked_add_signed(window)
}

/// Time left until `deadline`; zero once it has passed.
pub fn wait_duration(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (deadline - now).to_std().unwrap_or(Duration::ZERO)
}

pub struct StalenessEvaluator {
    store: Arc<dyn PlaylistStore>,
    clock: Arc<dyn Clock>,
    config: StalenessConfig,
}

impl StalenessEvaluator {
    pub fn new(
        store: Arc<dyn PlaylistStore>,
        clock: Arc<dyn Clock>,
        config: StalenessConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Check one playlist and delete it if it went stale.
    ///
    /// Blocks for up to `target_duration * multiple` seconds. At most one
    /// delete is issued.
    ///
    /// # Errors
    ///
    /// - [`JanitorError::Fetch`] if the playlist or its metadata cannot be read
    /// - [`JanitorError::Parse`] if the content is not a usable playlist
    /// - [`JanitorError::Delete`] if the delete fails, including when the
    ///   object is already gone
    pub async fn evaluate(&self, reference: &ObjectReference) -> Result<Evaluation, JanitorError> {
        let object = self
            .store
            .fetch(reference)
            .await
            .map_err(|source| fetch_error(reference, source))?;
        let last_modified = object.metadata.last_modified;

        let playlist =
            Playlist::parse(&object.body).map_err(|source| parse_error(reference, source))?;

        match playlist.kind() {
            PlaylistKind::Variant => {
                tracing::info!(
                    bucket = %reference.bucket,
                    key = %reference.key,
                    "Playlist is a variant index, skipping"
                );
                return Ok(self.finish(
                    reference,
                    StalenessDecision::NotApplicable(NotApplicableReason::Variant),
                    false,
                ));
            }
            PlaylistKind::Ended => {
                tracing::info!(
                    bucket = %reference.bucket,
                    key = %reference.key,
                    "Playlist contains #EXT-X-ENDLIST, skipping"
                );
                return Ok(self.finish(
                    reference,
                    StalenessDecision::NotApplicable(NotApplicableReason::Ended),
                    false,
                ));
            }
            PlaylistKind::Live => {}
        }

        let target_duration = playlist
            .live_target_duration()
            .map_err(|source| parse_error(reference, source))?;
        let deadline = stale_deadline(last_modified, target_duration, self.config.multiple)
            .ok_or_else(|| {
                parse_error(
                    reference,
                    PlaylistError::TargetDurationOutOfRange(target_duration),
                )
            })?;
        let wait = wait_duration(deadline, self.clock.now());

        tracing::info!(
            bucket = %reference.bucket,
            key = %reference.key,
            target_duration,
            multiple = self.config.multiple,
            last_modified = %last_modified,
            deadline = %deadline,
            wait_secs = wait.as_secs_f64(),
            "Playlist is considered stale unless updated by deadline"
        );

        self.clock.sleep(wait).await;

        let recheck = self
            .store
            .head(reference)
            .await
            .map_err(|source| fetch_error(reference, source))?;

        if recheck.last_modified > last_modified {
            tracing::info!(
                bucket = %reference.bucket,
                key = %reference.key,
                last_modified = %recheck.last_modified,
                "Playlist was updated while waiting"
            );
            return Ok(self.finish(reference, StalenessDecision::Fresh, false));
        }

        if self.config.dry_run {
            tracing::info!(
                bucket = %reference.bucket,
                key = %reference.key,
                last_modified = %last_modified,
                "[DRY-RUN] Would delete stale playlist"
            );
            return Ok(self.finish(reference, StalenessDecision::Stale, false));
        }

        self.store.delete(reference).await.map_err(|source| {
            tracing::error!(
                bucket = %reference.bucket,
                key = %reference.key,
                error = %source,
                "Error deleting playlist"
            );
            JanitorError::Delete {
                reference: reference.clone(),
                source,
            }
        })?;

        tracing::warn!(
            bucket = %reference.bucket,
            key = %reference.key,
            last_modified = %last_modified,
            "Stale playlist detected and deleted"
        );

        Ok(self.finish(reference, StalenessDecision::Stale, true))
    }

    fn finish(
        &self,
        reference: &ObjectReference,
        decision: StalenessDecision,
        deleted: bool,
    ) -> Evaluation {
        tracing::debug!(
            bucket = %reference.bucket,
            key = %reference.key,
            decision = %decision,
            deleted,
            "Staleness evaluation complete"
        );
        Evaluation {
            reference: reference.clone(),
            decision,
            deleted,
        }
    }
}

fn fetch_error(reference: &ObjectReference, source: StoreError) -> JanitorError {
    tracing::error!(
        bucket = %reference.bucket,
        key = %reference.key,
        error = %source,
        "Error getting playlist"
    );
    JanitorError::Fetch {
        reference: reference.clone(),
        source,
    }
}

fn parse_error(reference: &ObjectReference, source: PlaylistError) -> JanitorError {
    tracing::error!(
        bucket = %reference.bucket,
        key = %reference.key,
        error = %source,
        "Error parsing playlist"
    );
    JanitorError::Parse {
        reference: reference.clone(),
        source,
    }
}
