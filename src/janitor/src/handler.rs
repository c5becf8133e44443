use common::config::StalenessConfig;
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::HandlerError;
use crate::evaluator::StalenessEvaluator;
use crate::event::{Notification, ObjectReference};
use crate::response::Response;
use crate::store::PlaylistStore;

/// Runs one staleness check per invocation.
pub struct NotificationHandler {
    evaluator: StalenessEvaluator,
}

impl NotificationHandler {
    pub fn new(
        store: Arc<dyn PlaylistStore>,
        clock: Arc<dyn Clock>,
        config: StalenessConfig,
    ) -> Self {
        Self {
            evaluator: StalenessEvaluator::new(store, clock, config),
        }
    }

    /// Check the playlist named by an object-created notification.
    pub async fn handle_notification(
        &self,
        notification: &Notification,
    ) -> Result<Response, HandlerError> {
        let reference = notification.first_reference().inspect_err(|e| {
            tracing::error!(error = %e, "Rejected notification");
        })?;
        self.handle_reference(&reference).await
    }

    /// Check a playlist by bucket and (already decoded) key.
    pub async fn handle_reference(
        &self,
        reference: &ObjectReference,
    ) -> Result<Response, HandlerError> {
        let evaluation = self.evaluator.evaluate(reference).await.inspect_err(|e| {
            let failed = e.reference();
            tracing::error!(
                bucket = %failed.bucket,
                key = %failed.key,
                error = %e,
                "Invocation failed"
            );
        })?;
        let response = Response::from(&evaluation);

        tracing::info!(
            bucket = %reference.bucket,
            key = %reference.key,
            decision = %evaluation.decision,
            status_code = response.status_code,
            "Invocation complete"
        );

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EventError, JanitorError};
    use crate::testing::{ManualClock, ScriptedStore, epoch};

    const LIVE: &str = "#EXTM3U\n#EXT-X-TARGETDURATION:4\n#EXTINF:4.0,\nseg1.ts\n";

    fn notification(bucket: &str, key: &str) -> Notification {
        let json = serde_json::json!({
            "Records": [{
                "eventName": "ObjectCreated:Put",
                "s3": { "bucket": { "name": bucket }, "object": { "key": key } }
            }]
        });
        serde_json::from_value(json).unwrap()
    }

    fn handler(store: &Arc<ScriptedStore>, now: i64) -> NotificationHandler {
        NotificationHandler::new(
            store.clone(),
            Arc::new(ManualClock::at(epoch(now))),
            StalenessConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_stale_notification_deletes_decoded_key() {
        let store = Arc::new(ScriptedStore::new(LIVE, epoch(1000)));

        let response = handler(&store, 1000)
            .handle_notification(&notification("media", "live/channel+one.m3u8"))
            .await
            .unwrap();

        assert_eq!(response, Response::object_deleted());
        assert_eq!(
            store.deleted(),
            vec![ObjectReference::new("media", "live/channel one.m3u8")]
        );
    }

    #[tokio::test]
    async fn test_fresh_notification_is_no_change() {
        let store = Arc::new(ScriptedStore::new(LIVE, epoch(1000)).with_recheck(epoch(1004)));

        let response = handler(&store, 1000)
            .handle_notification(&notification("media", "live/index.m3u8"))
            .await
            .unwrap();

        assert_eq!(response, Response::no_change());
        assert!(store.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_empty_notification_is_rejected() {
        let store = Arc::new(ScriptedStore::new(LIVE, epoch(1000)));

        let result = handler(&store, 1000)
            .handle_notification(&Notification { records: vec![] })
            .await;

        assert!(matches!(
            result,
            Err(HandlerError::Event(EventError::NoRecords))
        ));
        assert_eq!(store.head_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_object_propagates_fetch_error() {
        let store = Arc::new(ScriptedStore::missing());

        let result = handler(&store, 1000)
            .handle_reference(&ObjectReference::new("media", "gone.m3u8"))
            .await;

        match result {
            Err(HandlerError::Janitor(err @ JanitorError::Fetch { .. })) => {
                assert_eq!(err.reference(), &ObjectReference::new("media", "gone.m3u8"));
            }
            other => panic!("expected fetch error, got {other:?}"),
        }
    }
}
