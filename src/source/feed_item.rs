//! The feed entry type.
//!
//! `FeedItem` is one fact as the backend describes it.  Items are immutable
//! once received: the paginator appends them and nothing edits them after.
//!
//! ## Wire format
//!
//! The backend's JSON uses `wikiUrl` / `imgUrl` for the two links, and any
//! field may be omitted when empty.  Omitted fields deserialize to `""`.

use serde::{Deserialize, Serialize};

/// A single fact surfaced to the user.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedItem {
    /// Headline.
    pub title: String,

    /// Recommendation category; this is what a like is recorded against.
    pub category: String,

    /// Short body text.
    pub summary: String,

    /// Link to the full article.
    #[serde(rename = "wikiUrl")]
    pub external_url: String,

    /// Thumbnail URL.  Empty when the article has no image.
    #[serde(rename = "imgUrl")]
    pub image_url: String,
}

impl FeedItem {
    pub fn has_image(&self) -> bool {
        !self.image_url.is_empty()
    }

    pub fn has_link(&self) -> bool {
        !self.external_url.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
