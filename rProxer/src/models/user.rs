//! User models.

use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{EntryId, Language, MediaKind, Medium, UserId};
use crate::api::{de, UserApi};
use crate::cache::{bind, LazyProperty};
use crate::error::{Error, Result};
use crate::session::SessionInner;

/// Avatar shown for users without one.
pub const DEFAULT_AVATAR: &str = "https://cdn.proxer.me/avatar/nophoto.png";

const AVATAR_BASE: &str = "https://cdn.proxer.me/avatar/";

/// Points a user collected, per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct UserPoints {
    #[serde(rename = "points_uploads", default, deserialize_with = "de::number")]
    pub uploads: u64,
    #[serde(rename = "points_anime", default, deserialize_with = "de::number")]
    pub anime: u64,
    #[serde(rename = "points_manga", default, deserialize_with = "de::number")]
    pub manga: u64,
    #[serde(rename = "points_info", default, deserialize_with = "de::number")]
    pub info: u64,
    #[serde(rename = "points_forum", default, deserialize_with = "de::number")]
    pub forum: u64,
    #[serde(rename = "points_misc", default, deserialize_with = "de::number")]
    pub misc: u64,
}

impl UserPoints {
    /// Sum of all categories.
    pub fn total(&self) -> u64 {
        self.uploads + self.anime + self.manga + self.info + self.forum + self.misc
    }
}

/// Profile data returned by `user/userinfo`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    #[serde(rename = "uid")]
    pub id: UserId,
    pub username: String,
    #[serde(default, deserialize_with = "de::text")]
    pub avatar: String,
    #[serde(default, deserialize_with = "de::text")]
    pub status: String,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub status_time: Option<i64>,
    #[serde(flatten)]
    pub points: UserPoints,
}

impl UserInfo {
    /// Full avatar URL, falling back to the placeholder.
    pub fn avatar_url(&self) -> String {
        avatar_url(&self.avatar)
    }

    /// When the status was last changed.
    pub fn status_updated(&self) -> Option<DateTime<Utc>> {
        self.status_time
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

pub(crate) fn avatar_url(avatar: &str) -> String {
    if avatar.trim().is_empty() {
        DEFAULT_AVATAR.to_owned()
    } else if avatar.starts_with("http") {
        avatar.to_owned()
    } else {
        format!("{AVATAR_BASE}{avatar}")
    }
}

/// One favourite entry of a user.
#[derive(Debug, Clone, Deserialize)]
pub struct TopTenEntry {
    #[serde(rename = "eid")]
    pub entry_id: EntryId,
    pub name: String,
    #[serde(rename = "kat")]
    pub kind: MediaKind,
    pub medium: Medium,
}

/// An episode or chapter in a user's history.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "eid")]
    pub entry_id: EntryId,
    pub name: String,
    #[serde(rename = "kat")]
    pub kind: MediaKind,
    pub medium: Medium,
    pub language: Language,
    #[serde(rename = "episode", deserialize_with = "de::number")]
    pub number: u32,
    #[serde(deserialize_with = "de::timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Items fetched per history page.
pub const HISTORY_PAGE_SIZE: u32 = 50;

/// A user with lazily fetched profile data.
#[derive(Clone)]
pub struct User {
    inner: Arc<UserInner>,
}

struct UserInner {
    id: UserId,
    session: Weak<SessionInner>,
    name: LazyProperty<String>,
    avatar: LazyProperty<String>,
    status: LazyProperty<String>,
    points: LazyProperty<UserPoints>,
    topten_anime: LazyProperty<Vec<TopTenEntry>>,
    topten_manga: LazyProperty<Vec<TopTenEntry>>,
}

impl UserInner {
    fn session(&self) -> Result<Arc<SessionInner>> {
        self.session.upgrade().ok_or_else(|| Error::Detached.into())
    }

    async fn load_info(self: Arc<Self>) -> Result<()> {
        let info = UserApi::new(self.session()?).info(self.id).await?;
        self.apply(&info);
        Ok(())
    }

    async fn load_topten(self: Arc<Self>) -> Result<()> {
        let api = UserApi::new(self.session()?);
        let anime = api.topten(self.id, MediaKind::Anime).await?;
        let manga = api.topten(self.id, MediaKind::Manga).await?;
        self.topten_anime.set_initialized(anime);
        self.topten_manga.set_initialized(manga);
        Ok(())
    }

    fn apply(&self, info: &UserInfo) {
        self.name.set_initialized(info.username.clone());
        self.avatar.set_initialized(info.avatar_url());
        self.status.set_initialized(info.status.clone());
        self.points.set_initialized(info.points);
    }
}

impl User {
    pub(crate) fn new(session: &Arc<SessionInner>, id: UserId) -> Self {
        let session = Arc::downgrade(session);
        let inner = Arc::new_cyclic(|weak: &Weak<UserInner>| {
            let info = bind(weak.clone(), UserInner::load_info);
            let topten = bind(weak.clone(), UserInner::load_topten);

            UserInner {
                id,
                session,
                name: LazyProperty::new(info.clone()).reinitializable(),
                avatar: LazyProperty::new(info.clone()).reinitializable(),
                status: LazyProperty::new(info.clone()).reinitializable(),
                points: LazyProperty::new(info).reinitializable(),
                topten_anime: LazyProperty::new(topten.clone()).reinitializable(),
                topten_manga: LazyProperty::new(topten).reinitializable(),
            }
        });
        Self { inner }
    }

    /// A user whose name is already known, e.g. from a listing.
    pub(crate) fn with_name(session: &Arc<SessionInner>, id: UserId, name: impl Into<String>) -> Self {
        let user = Self::new(session, id);
        user.inner.name.set_initialized(name.into());
        user
    }

    pub(crate) fn from_info(session: &Arc<SessionInner>, info: &UserInfo) -> Self {
        let user = Self::new(session, info.id);
        user.inner.apply(info);
        user
    }

    /// Seed the avatar from a listing.
    pub(crate) fn set_avatar(&self, avatar: &str) {
        self.inner.avatar.set_initialized(avatar_url(avatar));
    }

    /// Get the user ID.
    pub fn id(&self) -> UserId {
        self.inner.id
    }

    /// Get the username.
    pub async fn name(&self) -> Result<String> {
        self.inner.name.get().await
    }

    /// Avatar URL. The placeholder is returned when the profile can't be read.
    pub async fn avatar(&self) -> String {
        self.inner.avatar.get_or(DEFAULT_AVATAR.to_owned()).await
    }

    /// Get the status text.
    pub async fn status(&self) -> Result<String> {
        self.inner.status.get().await
    }

    /// Get the collected points.
    pub async fn points(&self) -> Result<UserPoints> {
        self.inner.points.get().await
    }

    /// Get the favourite anime.
    pub async fn topten_anime(&self) -> Result<Vec<TopTenEntry>> {
        self.inner.topten_anime.get().await
    }

    /// Get the favourite manga.
    pub async fn topten_manga(&self) -> Result<Vec<TopTenEntry>> {
        self.inner.topten_manga.get().await
    }

    /// One page of recently watched episodes and read chapters, newest first.
    pub async fn history(&self, page: u32) -> Result<Vec<HistoryEntry>> {
        UserApi::new(self.inner.session()?)
            .history(self.inner.id, page, HISTORY_PAGE_SIZE)
            .await
    }

    /// Drop cached profile data so it is fetched again.
    pub fn reload(&self) {
        self.inner.name.reset();
        self.inner.avatar.reset();
        self.inner.status.reset();
        self.inner.points.reset();
        self.inner.topten_anime.reset();
        self.inner.topten_manga.reset();
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name.get_if_initialized())
            .finish()
    }
}
