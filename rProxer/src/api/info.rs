//! Anime and manga information.

use std::sync::Arc;

use super::fetch;
use crate::{
    client::Request,
    error::{Error, Result},
    models::{
        Anime, Comment, CommentSort, ContentList, Entry, EntryId, EntryInfo, EntryName, EntryTag,
        Industry, Language, Manga, MediaKind,
    },
    session::SessionInner,
};

/// API for entry information.
#[derive(Debug, Clone)]
pub struct InfoApi {
    session: Arc<SessionInner>,
}

impl InfoApi {
    pub(crate) fn new(session: Arc<SessionInner>) -> Self {
        Self { session }
    }

    /// An anime whose details are fetched on first read.
    pub fn anime(&self, id: impl Into<EntryId>) -> Anime {
        Anime::new(Entry::new(&self.session, id.into(), MediaKind::Anime))
    }

    /// A manga whose details are fetched on first read.
    pub fn manga(&self, id: impl Into<EntryId>) -> Manga {
        Manga::new(Entry::new(&self.session, id.into(), MediaKind::Manga))
    }

    /// Fetch an anime, failing if the entry is a manga.
    pub async fn load_anime(&self, id: impl Into<EntryId>) -> Result<Anime> {
        let info = self.entry(id).await?;
        if info.kind != MediaKind::Anime {
            return Err(Error::invalid(format!("entry {} is not an anime", info.id)).into());
        }
        Ok(Anime::new(Entry::from_info(&self.session, &info)))
    }

    /// Fetch a manga, failing if the entry is an anime.
    pub async fn load_manga(&self, id: impl Into<EntryId>) -> Result<Manga> {
        let info = self.entry(id).await?;
        if info.kind != MediaKind::Manga {
            return Err(Error::invalid(format!("entry {} is not a manga", info.id)).into());
        }
        Ok(Manga::new(Entry::from_info(&self.session, &info)))
    }

    /// Core data of an entry.
    pub async fn entry(&self, id: impl Into<EntryId>) -> Result<EntryInfo> {
        let id: EntryId = id.into();
        fetch(&self.session, Request::api_get("info/entry").query("id", id)).await
    }

    /// All titles of an entry.
    pub async fn names(&self, id: impl Into<EntryId>) -> Result<Vec<EntryName>> {
        let id: EntryId = id.into();
        fetch(&self.session, Request::api_get("info/names").query("id", id)).await
    }

    /// Languages an entry is available in.
    pub async fn languages(&self, id: impl Into<EntryId>) -> Result<Vec<Language>> {
        let id: EntryId = id.into();
        fetch(&self.session, Request::api_get("info/lang").query("id", id)).await
    }

    /// One page of episodes or chapters, counted from zero.
    pub async fn content(&self, id: impl Into<EntryId>, page: u32, limit: u32) -> Result<ContentList> {
        let id: EntryId = id.into();
        fetch(
            &self.session,
            Request::api_get("info/listinfo")
                .query("id", id)
                .query("p", page)
                .query("limit", limit),
        )
        .await
    }

    /// One page of comments on an entry, counted from zero.
    pub async fn comments(
        &self,
        id: impl Into<EntryId>,
        sort: CommentSort,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Comment>> {
        let id: EntryId = id.into();
        fetch(
            &self.session,
            Request::api_get("info/comments")
                .query("id", id)
                .query("sort", sort.param())
                .query("p", page)
                .query("limit", limit),
        )
        .await
    }

    /// Tags of an entry.
    pub async fn tags(&self, id: impl Into<EntryId>) -> Result<Vec<EntryTag>> {
        let id: EntryId = id.into();
        fetch(&self.session, Request::api_get("info/entrytags").query("id", id)).await
    }

    /// Publishers, studios, producers and stream partners of an entry.
    pub async fn industries(&self, id: impl Into<EntryId>) -> Result<Vec<Industry>> {
        let id: EntryId = id.into();
        fetch(&self.session, Request::api_get("info/publisher").query("id", id)).await
    }
}
