//! Realtime store client.
//!
//! The wall lives in a hosted realtime JSON store with a REST write surface
//! and an event-stream read surface. Writes are append-only with
//! server-assigned keys. The subscription folds the stream of put/patch
//! notifications into a local snapshot and re-emits the full snapshot after
//! every change, starting with the initial state push.

mod sse;

use std::fmt;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::{Map, Value};
pub use sse::{SseParser, StoreStreamEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::StoreConfig;
use crate::review::Review;

/// Error categories for store operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// HTTP status error (4xx, 5xx)
    HttpStatus,
    /// Response or stream parsing failed
    Parse,
    /// The stream carried something outside the store protocol
    Protocol,
}

/// Structured error from the store client.
#[derive(Debug, Clone)]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Raw collection state: server key -> record.
pub type Snapshot = Map<String, Value>;

#[derive(Debug, Deserialize)]
struct PushResponse {
    /// Server-assigned key of the appended record.
    name: String,
}

/// Client for one review collection in the store.
#[derive(Clone)]
pub struct StoreClient {
    http: reqwest::Client,
    base_url: String,
    collection: String,
}

impl StoreClient {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            collection: config.collection.trim_matches('/').to_string(),
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/{}.json", self.base_url, self.collection)
    }

    /// Appends a review to the collection.
    ///
    /// The store assigns the key; there is no client-chosen identity and no
    /// overwrite. Returns the generated key.
    ///
    /// # Errors
    /// Returns an error if the operation fails.
    pub async fn append(&self, review: &Review) -> Result<String> {
        let response = self
            .http
            .post(self.collection_url())
            .json(review)
            .send()
            .await
            .context("Failed to send review to the store")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Review write failed (HTTP {status}): {body}");
        }

        let pushed: PushResponse = response
            .json()
            .await
            .context("Failed to parse store write response")?;
        Ok(pushed.name)
    }

    /// One-shot read of the whole collection.
    ///
    /// Returns `None` for an absent collection (the store serves `null`).
    ///
    /// # Errors
    /// Returns an error if the operation fails.
    pub async fn fetch(&self) -> Result<Option<Snapshot>> {
        let response = self
            .http
            .get(self.collection_url())
            .send()
            .await
            .context("Failed to read the review collection")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Review read failed (HTTP {status}): {body}");
        }

        let value: Value = response
            .json()
            .await
            .context("Failed to parse review collection")?;
        match value {
            Value::Null => Ok(None),
            Value::Object(map) => Ok(Some(map)),
            other => anyhow::bail!("Unexpected collection shape: {other}"),
        }
    }

    /// Opens a live subscription to the collection.
    ///
    /// Spawns a listener task that folds stream notifications into a local
    /// snapshot and sends the full snapshot after every change — including
    /// the initial state push, so the first emission reflects current data.
    /// The task ends when the server cancels the stream, on error, or when
    /// `shutdown` fires.
    pub fn subscribe(&self, shutdown: CancellationToken) -> mpsc::UnboundedReceiver<Snapshot> {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = self.clone();

        tokio::spawn(async move {
            if let Err(err) = client.run_subscription(&tx, shutdown).await {
                tracing::warn!("Store subscription ended: {err}");
            }
        });

        rx
    }

    async fn run_subscription(
        &self,
        tx: &mpsc::UnboundedSender<Snapshot>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let response = self
            .http
            .get(self.collection_url())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .context("Failed to open store subscription")?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("Store subscription rejected (HTTP {status})");
        }

        let mut stream = SseParser::new(response.bytes_stream());
        let mut snapshot = Snapshot::new();

        loop {
            let event = tokio::select! {
                () = shutdown.cancelled() => break,
                event = stream.next() => event,
            };

            match event {
                Some(Ok(StoreStreamEvent::Put { path, data })) => {
                    apply_put(&mut snapshot, &path, data);
                    if tx.send(snapshot.clone()).is_err() {
                        break;
                    }
                }
                Some(Ok(StoreStreamEvent::Patch { path, data })) => {
                    apply_patch(&mut snapshot, &path, data);
                    if tx.send(snapshot.clone()).is_err() {
                        break;
                    }
                }
                Some(Ok(StoreStreamEvent::KeepAlive)) => {}
                Some(Ok(StoreStreamEvent::Cancel)) => {
                    tracing::warn!("Store cancelled the subscription");
                    break;
                }
                Some(Ok(StoreStreamEvent::AuthRevoked)) => {
                    tracing::warn!("Store subscription credential revoked");
                    break;
                }
                Some(Err(err)) => {
                    tracing::warn!("Store stream error: {err}");
                    break;
                }
                None => break,
            }
        }

        Ok(())
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Replaces the data at `path` within the snapshot.
///
/// A root put replaces the whole snapshot (null clears it); a child put
/// sets or, for null data, removes that record.
fn apply_put(snapshot: &mut Snapshot, path: &str, data: Value) {
    let segments = split_path(path);

    let Some((head, rest)) = segments.split_first() else {
        snapshot.clear();
        match data {
            Value::Object(map) => *snapshot = map,
            Value::Null => {}
            other => tracing::warn!("Ignoring non-object root put: {other}"),
        }
        return;
    };

    if rest.is_empty() {
        if data.is_null() {
            snapshot.remove(*head);
        } else {
            snapshot.insert((*head).to_string(), data);
        }
        return;
    }

    let child = snapshot
        .entry((*head).to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    set_nested(child, rest, data);
}

/// Merges `data`'s children into the object at `path` (null removes a key).
fn apply_patch(snapshot: &mut Snapshot, path: &str, data: Value) {
    let Value::Object(updates) = data else {
        tracing::warn!("Ignoring non-object patch at {path}");
        return;
    };

    let segments = split_path(path);

    let Some((head, rest)) = segments.split_first() else {
        merge_into(snapshot, updates);
        return;
    };

    let child = snapshot
        .entry((*head).to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    let target = nested_entry(child, rest);
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        merge_into(map, updates);
    }
}

fn merge_into(target: &mut Map<String, Value>, updates: Map<String, Value>) {
    for (key, value) in updates {
        if value.is_null() {
            target.remove(&key);
        } else {
            target.insert(key, value);
        }
    }
}

fn set_nested(value: &mut Value, segments: &[&str], data: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *value = data;
        return;
    };

    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    if let Value::Object(map) = value {
        let child = map.entry((*head).to_string()).or_insert(Value::Null);
        set_nested(child, rest, data);
    }
}

fn nested_entry<'a>(value: &'a mut Value, segments: &[&str]) -> &'a mut Value {
    let Some((head, rest)) = segments.split_first() else {
        return value;
    };

    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => {
            let child = map
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            nested_entry(child, rest)
        }
        // unreachable: made an object above
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::review::Review;

    fn client_for(server: &MockServer) -> StoreClient {
        StoreClient::new(&StoreConfig {
            base_url: server.uri(),
            collection: "reviews".to_string(),
        })
    }

    /// Root put replaces the snapshot.
    #[test]
    fn test_apply_put_root_replaces() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("stale".to_string(), json!({"text": "old"}));

        apply_put(
            &mut snapshot,
            "/",
            json!({"a": {"text": "hi", "timestamp": 1, "user": "Ana"}}),
        );

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["a"]["text"], json!("hi"));
    }

    /// Root put with null clears the snapshot (absent collection).
    #[test]
    fn test_apply_put_root_null_clears() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("a".to_string(), json!({"text": "hi"}));

        apply_put(&mut snapshot, "/", Value::Null);
        assert!(snapshot.is_empty());
    }

    /// Child put inserts a new record; null removes it.
    #[test]
    fn test_apply_put_child() {
        let mut snapshot = Snapshot::new();

        apply_put(
            &mut snapshot,
            "/abc",
            json!({"text": "hi", "timestamp": 7, "user": "Ana"}),
        );
        assert_eq!(snapshot["abc"]["timestamp"], json!(7));

        apply_put(&mut snapshot, "/abc", Value::Null);
        assert!(snapshot.is_empty());
    }

    /// Deep put lands inside the record.
    #[test]
    fn test_apply_put_nested_field() {
        let mut snapshot = Snapshot::new();
        apply_put(&mut snapshot, "/abc/text", json!("edited"));
        assert_eq!(snapshot["abc"]["text"], json!("edited"));
    }

    /// Root patch merges records without disturbing siblings.
    #[test]
    fn test_apply_patch_root_merges() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("a".to_string(), json!({"text": "one"}));

        apply_patch(&mut snapshot, "/", json!({"b": {"text": "two"}}));

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["a"]["text"], json!("one"));
        assert_eq!(snapshot["b"]["text"], json!("two"));
    }

    /// Child patch merges fields into one record.
    #[test]
    fn test_apply_patch_child_merges_fields() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("a".to_string(), json!({"text": "one", "timestamp": 1}));

        apply_patch(&mut snapshot, "/a", json!({"text": "edited"}));

        assert_eq!(snapshot["a"]["text"], json!("edited"));
        assert_eq!(snapshot["a"]["timestamp"], json!(1));
    }

    /// Append posts the record and returns the server-assigned key.
    #[tokio::test]
    async fn test_append_returns_generated_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(url_path("/reviews.json"))
            .and(body_json(json!({
                "text": "lovely wall",
                "timestamp": 42,
                "user": "Ana",
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "name": "-Nabc123" })),
            )
            .mount(&server)
            .await;

        let review = Review {
            text: "lovely wall".to_string(),
            timestamp: 42,
            user: "Ana".to_string(),
        };
        let key = client_for(&server).append(&review).await.unwrap();
        assert_eq!(key, "-Nabc123");
    }

    /// Append surfaces HTTP failures.
    #[tokio::test]
    async fn test_append_surfaces_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(url_path("/reviews.json"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Permission denied"))
            .mount(&server)
            .await;

        let review = Review::new("hi", None);
        let result = client_for(&server).append(&review).await;
        assert!(result.is_err());
    }

    /// Fetch maps `null` to an absent collection.
    #[tokio::test]
    async fn test_fetch_absent_collection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/reviews.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Value::Null))
            .mount(&server)
            .await;

        let snapshot = client_for(&server).fetch().await.unwrap();
        assert!(snapshot.is_none());
    }

    /// Subscription folds stream events and emits a snapshot per change.
    #[tokio::test]
    async fn test_subscribe_emits_snapshots() {
        let body = concat!(
            "event: put\n",
            "data: {\"path\": \"/\", \"data\": {\"a\": {\"text\": \"hi\", \"timestamp\": 1, \"user\": \"Ana\"}}}\n",
            "\n",
            "event: keep-alive\n",
            "data: null\n",
            "\n",
            "event: put\n",
            "data: {\"path\": \"/b\", \"data\": {\"text\": \"yo\", \"timestamp\": 2, \"user\": \"Anonymous\"}}\n",
            "\n",
        );

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/reviews.json"))
            .and(header("accept", "text/event-stream"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_raw(body, "text/event-stream"),
            )
            .mount(&server)
            .await;

        let shutdown = CancellationToken::new();
        let mut rx = client_for(&server).subscribe(shutdown);

        let first = rx.recv().await.expect("initial snapshot");
        assert_eq!(first.len(), 1);

        let second = rx.recv().await.expect("snapshot after change");
        assert_eq!(second.len(), 2);
        assert_eq!(second["b"]["text"], json!("yo"));

        // Stream body is exhausted; the channel closes.
        assert!(rx.recv().await.is_none());
    }
}
