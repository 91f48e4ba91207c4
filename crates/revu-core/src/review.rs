//! Review records and feed ordering.
//!
//! A review is created once on successful submission and never mutated or
//! deleted by this client. The rendered feed is a disposable projection
//! rebuilt from scratch on every store notification.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User label attached to submissions made without an active session.
pub const ANONYMOUS_USER: &str = "Anonymous";

/// Maximum review length in Unicode scalar values.
pub const MAX_REVIEW_CHARS: usize = 200;

/// A single review on the wall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub text: String,
    /// Creation instant in milliseconds since the epoch. Sole sort key.
    pub timestamp: i64,
    /// Display name of the author, or [`ANONYMOUS_USER`].
    pub user: String,
}

impl Review {
    /// Builds a review stamped with the current time.
    ///
    /// `user` is the active session's display name; `None` produces the
    /// anonymous sentinel.
    pub fn new(text: impl Into<String>, user: Option<&str>) -> Self {
        Self {
            text: text.into(),
            timestamp: Utc::now().timestamp_millis(),
            user: user.unwrap_or(ANONYMOUS_USER).to_string(),
        }
    }
}

/// Projects a raw store snapshot into the display order: newest first.
///
/// An empty or absent snapshot projects to an empty list. Records that do
/// not deserialize as reviews are skipped; the store enforces no schema,
/// so a foreign record must not take the feed down.
pub fn project_feed(snapshot: Option<&Map<String, Value>>) -> Vec<Review> {
    let Some(snapshot) = snapshot else {
        return Vec::new();
    };

    let mut reviews: Vec<Review> = snapshot
        .values()
        .filter_map(|value| match serde_json::from_value(value.clone()) {
            Ok(review) => Some(review),
            Err(err) => {
                tracing::warn!("Skipping malformed review record: {err}");
                None
            }
        })
        .collect();

    reviews.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    reviews
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn snapshot_of(entries: &[(&str, Value)]) -> Map<String, Value> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    /// Feed order: timestamps [5, 1, 3] render as [5, 3, 1].
    #[test]
    fn test_project_feed_newest_first() {
        let snapshot = snapshot_of(&[
            ("a", json!({"text": "first", "timestamp": 5, "user": "Ana"})),
            ("b", json!({"text": "second", "timestamp": 1, "user": "Bo"})),
            ("c", json!({"text": "third", "timestamp": 3, "user": "Cy"})),
        ]);

        let feed = project_feed(Some(&snapshot));
        let timestamps: Vec<i64> = feed.iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![5, 3, 1]);
    }

    /// Absent snapshot is "no reviews", not an error.
    #[test]
    fn test_project_feed_absent_is_empty() {
        assert!(project_feed(None).is_empty());
    }

    /// Empty snapshot is "no reviews".
    #[test]
    fn test_project_feed_empty_is_empty() {
        let snapshot = Map::new();
        assert!(project_feed(Some(&snapshot)).is_empty());
    }

    /// Malformed records are skipped, not fatal.
    #[test]
    fn test_project_feed_skips_malformed() {
        let snapshot = snapshot_of(&[
            ("a", json!({"text": "ok", "timestamp": 2, "user": "Ana"})),
            ("b", json!("not an object")),
            ("c", json!({"text": "missing fields"})),
        ]);

        let feed = project_feed(Some(&snapshot));
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].text, "ok");
    }

    /// Anonymous sentinel is applied when no display name is given.
    #[test]
    fn test_review_new_anonymous() {
        let review = Review::new("hello", None);
        assert_eq!(review.user, ANONYMOUS_USER);
        assert!(review.timestamp > 0);
    }

    /// Display name is carried through when a session is active.
    #[test]
    fn test_review_new_named() {
        let review = Review::new("hello", Some("Ana"));
        assert_eq!(review.user, "Ana");
    }
}
