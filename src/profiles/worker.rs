//! Fire-and-forget profile rebuilds.
//!
//! `like`/`finish` interactions schedule a rebuild without blocking the
//! request path. Failures are logged and never surfaced to the caller.

use super::builder::ProfileBuilder;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Handle for enqueueing background profile rebuilds.
#[derive(Clone)]
pub struct RebuildQueue {
    tx: mpsc::UnboundedSender<String>,
}

impl RebuildQueue {
    /// Schedule a rebuild for one user. Dropping the request when the worker
    /// is gone is deliberate: the profile will be rebuilt synchronously on
    /// the next stale recommendation request anyway.
    pub fn enqueue(&self, user_id: &str) {
        if self.tx.send(user_id.to_string()).is_err() {
            warn!("Profile rebuild worker is gone, dropping rebuild for {}", user_id);
        }
    }
}

/// Spawn the rebuild worker task and return its queue handle.
pub fn spawn_rebuild_worker(builder: Arc<ProfileBuilder>) -> RebuildQueue {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        while let Some(user_id) = rx.recv().await {
            let builder = builder.clone();
            let task_user = user_id.clone();
            let result =
                tokio::task::spawn_blocking(move || builder.rebuild(&task_user)).await;
            match result {
                Ok(Ok(profile)) => debug!(
                    "Background rebuild for {} done ({} interactions)",
                    user_id, profile.total_interactions
                ),
                Ok(Err(e)) => warn!("Background rebuild for {} failed: {:#}", user_id, e),
                Err(e) => warn!("Background rebuild task for {} panicked: {}", user_id, e),
            }
        }
    });

    RebuildQueue { tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SqliteTrackCatalog;
    use crate::interactions::{InteractionEvent, NewInteraction, SqliteInteractionStore};
    use crate::interactions::InteractionStore;
    use crate::profiles::{ProfileStore, SqliteProfileStore};
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_enqueued_rebuild_materializes_profile() {
        let temp_dir = TempDir::new().unwrap();
        let catalog =
            Arc::new(SqliteTrackCatalog::new(temp_dir.path().join("catalog.db")).unwrap());
        let interactions =
            Arc::new(SqliteInteractionStore::new(temp_dir.path().join("log.db")).unwrap());
        let profiles =
            Arc::new(SqliteProfileStore::new(temp_dir.path().join("profiles.db")).unwrap());
        interactions
            .append(NewInteraction::new("u1", "t1", InteractionEvent::Like))
            .unwrap();

        let builder = Arc::new(ProfileBuilder::new(
            interactions,
            catalog,
            profiles.clone(),
        ));
        let queue = spawn_rebuild_worker(builder);
        queue.enqueue("u1");

        // The rebuild is asynchronous; poll briefly for it to land.
        for _ in 0..50 {
            if profiles.get_profile("u1").unwrap().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let profile = profiles.get_profile("u1").unwrap().expect("profile built");
        assert_eq!(profile.total_interactions, 1);
    }
}
