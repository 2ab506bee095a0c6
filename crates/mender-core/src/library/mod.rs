//! Media library access.
//!
//! The [`Library`] trait is the seam between the orchestration loop and the
//! media server. [`JellyfinClient`] talks to a real server; tests plug in an
//! in-memory implementation.

mod jellyfin;

pub use jellyfin::{JellyfinClient, EXTRA_FIELDS};

use crate::error::LibraryError;
use crate::types::Item;
use async_trait::async_trait;
use serde_json::Value;

/// Result of a read-modify-write overview update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The new overview was written
    Updated,
    /// The item vanished or became inaccessible between listing and writing
    Skipped { reason: String },
}

/// Operations Mender needs from a media library.
///
/// Uses `async_trait` so the orchestration loop can hold a `Box<dyn Library>`.
#[async_trait]
pub trait Library: Send + Sync {
    /// List all items of the given types, recursively, optionally under one
    /// library or collection. Tracks are never returned.
    async fn list_items(
        &self,
        item_types: &[String],
        scope_id: Option<&str>,
    ) -> Result<Vec<Item>, LibraryError>;

    /// Fetch the complete server record for one item.
    async fn fetch_full(&self, item_id: &str) -> Result<Value, LibraryError>;

    /// Write a complete record back.
    async fn write_full(&self, item_id: &str, record: &Value) -> Result<(), LibraryError>;

    /// Replace one item's overview, leaving every other field as fetched.
    ///
    /// Not-found, forbidden and gone turn into [`UpdateOutcome::Skipped`];
    /// any other failure is returned as an error. There is no concurrency
    /// token, so a change made by someone else between fetch and write is
    /// overwritten.
    async fn update_overview(
        &self,
        item_id: &str,
        overview: &str,
    ) -> Result<UpdateOutcome, LibraryError> {
        let mut record = match self.fetch_full(item_id).await {
            Ok(record) => record,
            Err(e) if e.is_recoverable() => return Ok(skip(item_id, e)),
            Err(e) => return Err(e),
        };

        set_overview(&mut record, overview).map_err(|message| LibraryError::Decode {
            path: item_id.to_string(),
            message,
        })?;

        match self.write_full(item_id, &record).await {
            Ok(()) => Ok(UpdateOutcome::Updated),
            Err(e) if e.is_recoverable() => Ok(skip(item_id, e)),
            Err(e) => Err(e),
        }
    }
}

fn skip(item_id: &str, error: LibraryError) -> UpdateOutcome {
    tracing::warn!("Skipping {item_id}: {error}");
    UpdateOutcome::Skipped {
        reason: error.to_string(),
    }
}

/// Set the `Overview` field on a full item record.
fn set_overview(record: &mut Value, overview: &str) -> Result<(), String> {
    match record.as_object_mut() {
        Some(fields) => {
            fields.insert("Overview".to_string(), Value::String(overview.to_string()));
            Ok(())
        }
        None => Err("item record is not a JSON object".to_string()),
    }
}

/// Drop track-level entries; only aggregates get rewritten.
pub fn without_tracks(items: Vec<Item>) -> Vec<Item> {
    items.into_iter().filter(|item| !item.is_track()).collect()
}
