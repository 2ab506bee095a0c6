//! Core data types: library items, change records, and run statistics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Overviews shorter than this (after trimming) get rewritten.
pub const MIN_OVERVIEW_LEN: usize = 50;

/// Old overviews are shortened to this many characters in the run log.
pub const OLD_OVERVIEW_LOG_WIDTH: usize = 180;

/// Item types processed when the config does not list any.
pub const DEFAULT_ITEM_TYPES: [&str; 2] = ["MusicAlbum", "MusicArtist"];

/// The server-side type tag of an item.
///
/// Known music types get their own variants; anything else is kept verbatim
/// so it round-trips and can be named in prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemKind {
    /// `MusicAlbum`
    Album,
    /// `MusicArtist`
    Artist,
    /// `Audio`, a single track. Never rewritten.
    Track,
    /// Any other configured type (`Playlist`, `Series`, ...)
    Other(String),
}

impl ItemKind {
    pub fn as_str(&self) -> &str {
        match self {
            ItemKind::Album => "MusicAlbum",
            ItemKind::Artist => "MusicArtist",
            ItemKind::Track => "Audio",
            ItemKind::Other(name) => name,
        }
    }
}

impl From<String> for ItemKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "MusicAlbum" => ItemKind::Album,
            "MusicArtist" => ItemKind::Artist,
            "Audio" => ItemKind::Track,
            _ => ItemKind::Other(value),
        }
    }
}

impl From<ItemKind> for String {
    fn from(kind: ItemKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One catalog entry as returned by the bulk item listing.
///
/// Field names follow the server's PascalCase DTO. Only the fields Mender
/// asks for are modelled; the full record is fetched separately at write time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Item {
    /// Stable server identifier, the only key used for read-modify-write
    pub id: String,

    /// Server type tag
    #[serde(rename = "Type")]
    pub kind: ItemKind,

    /// Display name
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_year: Option<i32>,

    #[serde(default)]
    pub genres: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artists: Option<Vec<String>>,

    /// The free-text description being rewritten
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premiere_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Item {
    /// Minimal item with just an id, type and name. Handy for tests and tooling.
    pub fn new(id: impl Into<String>, kind: ItemKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            original_title: None,
            production_year: None,
            genres: Vec::new(),
            artists: None,
            overview: None,
            sort_name: None,
            premiere_date: None,
            parent_id: None,
        }
    }

    pub fn with_overview(mut self, overview: impl Into<String>) -> Self {
        self.overview = Some(overview.into());
        self
    }

    /// True when the overview is missing or too short to keep.
    pub fn needs_overview(&self) -> bool {
        match &self.overview {
            None => true,
            Some(text) => text.trim().chars().count() < MIN_OVERVIEW_LEN,
        }
    }

    pub fn is_track(&self) -> bool {
        self.kind == ItemKind::Track
    }
}

/// One applied rewrite, as written to the run log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub kind: ItemKind,
    pub name: String,
    pub id: String,
    /// Previous overview, shortened for the log
    pub old_overview: String,
    pub new_overview: String,
}

impl ChangeRecord {
    pub fn new(item: &Item, new_overview: &str) -> Self {
        let old = item
            .overview
            .as_deref()
            .filter(|o| !o.trim().is_empty())
            .unwrap_or("(none)");
        Self {
            kind: item.kind.clone(),
            name: item.name.clone(),
            id: item.id.clone(),
            old_overview: shorten(old, OLD_OVERVIEW_LOG_WIDTH),
            new_overview: new_overview.to_string(),
        }
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} | {} | ID {}", self.kind, self.name, self.id)?;
        writeln!(f, "OLD: {}", self.old_overview)?;
        write!(f, "NEW: {}", self.new_overview)
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    /// Items classified as needing a new overview
    pub targets: usize,
    pub updated: usize,
    pub skipped: usize,
    pub total_tokens: u64,
}

impl RunStats {
    /// Rough spend estimate: a flat per-token rate, no per-model pricing.
    pub fn approx_cost(&self, cost_per_token: f64) -> f64 {
        self.total_tokens as f64 * cost_per_token
    }
}

/// Collapse whitespace and cut at a word boundary so the result fits `width`
/// characters, marking truncation with ` [...]`.
pub fn shorten(text: &str, width: usize) -> String {
    const PLACEHOLDER: &str = " [...]";

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let budget = width.saturating_sub(PLACEHOLDER.len());
    let mut out = String::new();
    for word in collapsed.split(' ') {
        let extra = if out.is_empty() { 0 } else { 1 };
        if out.chars().count() + extra + word.chars().count() > budget {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }

    if out.is_empty() {
        PLACEHOLDER.trim_start().to_string()
    } else {
        out + PLACEHOLDER
    }
}
