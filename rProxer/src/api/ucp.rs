//! User control panel API.

use std::sync::Arc;

use super::{fetch, fetch_unit};
use crate::{
    client::Request,
    error::{Error, Result},
    models::{Bookmark, BookmarkId, EntryId, Language, ListEntry, MediaKind},
    session::SessionInner,
};

/// Items per page of bookmarks and lists.
pub const UCP_PAGE_SIZE: u32 = 100;

/// API for bookmarks and the user's lists.
#[derive(Debug, Clone)]
pub struct UcpApi {
    session: Arc<SessionInner>,
}

impl UcpApi {
    pub(crate) fn new(session: Arc<SessionInner>) -> Self {
        Self { session }
    }

    /// One page of bookmarks, of one kind or all.
    pub async fn bookmarks(&self, kind: Option<MediaKind>, page: u32) -> Result<Vec<Bookmark>> {
        let mut request = Request::api_get("ucp/reminder")
            .query("p", page)
            .query("limit", UCP_PAGE_SIZE)
            .check_login(true);
        if let Some(kind) = kind {
            request = request.query("kat", kind.param());
        }
        fetch(&self.session, request).await
    }

    /// Delete a bookmark.
    pub async fn delete_bookmark(&self, id: impl Into<BookmarkId>) -> Result<()> {
        let id: BookmarkId = id.into();
        fetch_unit(
            &self.session,
            Request::api_post("ucp/deletereminder")
                .form("id", id)
                .check_login(true),
        )
        .await
    }

    /// One page of the user's anime or manga list.
    pub async fn list(&self, kind: MediaKind, page: u32) -> Result<Vec<ListEntry>> {
        fetch(
            &self.session,
            Request::api_get("ucp/list")
                .query("kat", kind.param())
                .query("p", page)
                .query("limit", UCP_PAGE_SIZE)
                .check_login(true),
        )
        .await
    }

    /// Put an entry on the user's list as planned.
    pub async fn add_to_planned(&self, entry_id: impl Into<EntryId>) -> Result<()> {
        let entry_id: EntryId = entry_id.into();
        fetch_unit(
            &self.session,
            Request::api_post("info/setuserinfo")
                .form("id", entry_id)
                .form("type", "note")
                .check_login(true),
        )
        .await
    }

    /// Bookmark an episode or chapter.
    pub async fn add_bookmark(
        &self,
        entry_id: impl Into<EntryId>,
        number: u32,
        language: Language,
        kind: MediaKind,
    ) -> Result<()> {
        if language == Language::Unknown {
            return Err(Error::invalid("bookmark needs a known language").into());
        }
        let entry_id: EntryId = entry_id.into();
        fetch_unit(
            &self.session,
            Request::api_post("ucp/setbookmark")
                .form("id", entry_id)
                .form("episode", number)
                .form("language", language.param())
                .form("kat", kind.param())
                .check_login(true),
        )
        .await
    }
}
