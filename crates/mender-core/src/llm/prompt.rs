//! Prompt templates, one per item type.

use crate::types::{Item, ItemKind};

/// Build the generation prompt for an item.
///
/// Missing fields fall back to fixed placeholders so every item gets a prompt.
pub fn compose(item: &Item) -> String {
    let title = non_empty(Some(item.name.as_str()))
        .or_else(|| non_empty(item.original_title.as_deref()))
        .unwrap_or("Untitled");
    let year = item
        .production_year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let genres = join_or(&item.genres, "Various genres");
    let current = non_empty(item.overview.as_deref()).unwrap_or("(none)");

    match &item.kind {
        ItemKind::Album => {
            let artists = join_or(item.artists.as_deref().unwrap_or_default(), "Various Artists");
            format!(
                "Write a lively, streaming-service style album blurb (18-25 words) for \
                 \"{title}\" ({year}) by {artists}. Sum up the sound and theme and add one \
                 concrete hook, such as a hit track or chart feat. Use at most one vivid \
                 adjective per phrase. Genres: {genres}. Current: {current}"
            )
        }
        ItemKind::Artist => format!(
            "Write a concise artist bio (20-30 words) for {title}. Include origin, style, \
             and one standout milestone. Genres: {genres}. Current: {current}"
        ),
        other => format!(
            "Rewrite this {} overview (25-40 words) in a polished streaming style. \
             Title: {title}. Year: {year}. Current: {current}",
            other.as_str().to_lowercase()
        ),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn join_or(values: &[String], fallback: &str) -> String {
    let joined = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        fallback.to_string()
    } else {
        joined
    }
}
