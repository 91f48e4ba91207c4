//! Live feed state.
//!
//! The feed is a disposable projection of the store: every snapshot
//! notification discards the displayed list and rebuilds it in full,
//! newest first. No incremental diffing.

use revu_core::review::{Review, project_feed};
use revu_core::store::Snapshot;

/// Feed display state.
#[derive(Debug, Default)]
pub struct FeedState {
    reviews: Vec<Review>,
    /// Whether at least one snapshot has arrived.
    connected: bool,
}

impl FeedState {
    /// Replaces the displayed list with a projection of the snapshot.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot) {
        self.reviews = project_feed(Some(snapshot));
        self.connected = true;
    }

    /// Reviews in display order (newest first).
    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    /// False until the initial snapshot has been delivered.
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn snapshot_with_timestamps(timestamps: &[i64]) -> Snapshot {
        timestamps
            .iter()
            .enumerate()
            .map(|(i, ts)| {
                (
                    format!("k{i}"),
                    json!({"text": format!("r{i}"), "timestamp": ts, "user": "Ana"}),
                )
            })
            .collect()
    }

    /// Each snapshot fully replaces the list, newest first.
    #[test]
    fn test_snapshot_rebuilds_newest_first() {
        let mut feed = FeedState::default();

        feed.apply_snapshot(&snapshot_with_timestamps(&[5, 1, 3]));
        let order: Vec<i64> = feed.reviews().iter().map(|r| r.timestamp).collect();
        assert_eq!(order, vec![5, 3, 1]);

        // A later snapshot replaces everything, it does not append.
        feed.apply_snapshot(&snapshot_with_timestamps(&[9]));
        assert_eq!(feed.reviews().len(), 1);
        assert_eq!(feed.reviews()[0].timestamp, 9);
    }

    /// An empty snapshot renders as "no reviews", not an error.
    #[test]
    fn test_empty_snapshot_is_empty_feed() {
        let mut feed = FeedState::default();
        feed.apply_snapshot(&Snapshot::new());
        assert!(feed.is_empty());
        assert!(feed.is_connected());
    }
}
