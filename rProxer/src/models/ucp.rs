//! Control panel models: bookmarks and the user's media list.

use serde::Deserialize;

use super::{BookmarkId, EntryId, Language, MediaKind, Medium};
use crate::api::de;

/// Bookmark of an episode or chapter to continue with.
#[derive(Debug, Clone, Deserialize)]
pub struct Bookmark {
    pub id: BookmarkId,
    #[serde(rename = "eid")]
    pub entry_id: EntryId,
    #[serde(rename = "kat")]
    pub kind: MediaKind,
    pub name: String,
    #[serde(rename = "episode", deserialize_with = "de::number")]
    pub number: u32,
    pub language: Language,
    pub medium: Medium,
    /// Whether the bookmarked content is online.
    #[serde(rename = "state", default, deserialize_with = "de::truthy")]
    pub available: bool,
}

/// Progress state of an entry on the user's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListState {
    Finished,
    InProgress,
    Planned,
    Dropped,
    Unknown,
}

impl ListState {
    /// Parse from the API code.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => ListState::Finished,
            1 => ListState::InProgress,
            2 => ListState::Planned,
            3 => ListState::Dropped,
            _ => ListState::Unknown,
        }
    }
}

/// One entry on the user's anime or manga list.
#[derive(Debug, Clone, Deserialize)]
pub struct ListEntry {
    #[serde(rename = "id")]
    pub entry_id: EntryId,
    pub name: String,
    #[serde(deserialize_with = "de::number")]
    pub count: u32,
    pub medium: Medium,
    #[serde(rename = "episode", default, deserialize_with = "de::number")]
    pub progress: u32,
    #[serde(rename = "state", default, deserialize_with = "de::number")]
    state: u8,
    #[serde(default, deserialize_with = "de::text")]
    pub comment: String,
}

impl ListEntry {
    /// Get the progress state.
    pub fn state(&self) -> ListState {
        ListState::from_code(self.state)
    }
}
