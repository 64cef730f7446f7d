//! Notification models.

use std::sync::Weak;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntryId, Language, MediaKind, NotificationId, User, UserId};
use crate::api::{de, NotificationApi};
use crate::error::{Error, Result};
use crate::session::SessionInner;

/// Category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NotificationKind {
    PrivateMessage,
    FriendRequest,
    News,
    MediaUpdate,
}

impl NotificationKind {
    /// Every kind, in the order events are raised.
    pub const ALL: [NotificationKind; 4] = [
        NotificationKind::PrivateMessage,
        NotificationKind::FriendRequest,
        NotificationKind::News,
        NotificationKind::MediaUpdate,
    ];
}

/// Unread counts by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationCounts {
    pub private_messages: u32,
    pub friend_requests: u32,
    pub news: u32,
    pub media_updates: u32,
}

impl NotificationCounts {
    /// Total unread count.
    pub fn total(&self) -> u32 {
        self.private_messages + self.friend_requests + self.news + self.media_updates
    }

    /// Check if there are any unread notifications.
    pub fn has_unread(&self) -> bool {
        self.total() > 0
    }

    /// Get the count of `kind`.
    pub fn get(&self, kind: NotificationKind) -> u32 {
        match kind {
            NotificationKind::PrivateMessage => self.private_messages,
            NotificationKind::FriendRequest => self.friend_requests,
            NotificationKind::News => self.news,
            NotificationKind::MediaUpdate => self.media_updates,
        }
    }
}

/// A news article from the notification feed.
#[derive(Debug, Clone, Deserialize)]
pub struct NewsItem {
    #[serde(rename = "nid")]
    pub id: NotificationId,
    #[serde(deserialize_with = "de::timestamp")]
    pub time: DateTime<Utc>,
    /// Forum thread with the comments.
    #[serde(rename = "thread", deserialize_with = "de::number")]
    pub thread_id: u64,
    #[serde(rename = "mid", default, deserialize_with = "de::number")]
    pub category_id: u64,
    #[serde(rename = "catname", default, deserialize_with = "de::text")]
    pub category: String,
    #[serde(rename = "uid")]
    pub author_id: UserId,
    #[serde(rename = "uname")]
    pub author: String,
    #[serde(deserialize_with = "de::text")]
    pub subject: String,
    #[serde(deserialize_with = "de::text")]
    pub description: String,
    #[serde(default, deserialize_with = "de::text")]
    pub image_id: String,
    #[serde(default, deserialize_with = "de::text")]
    pub image_style: String,
    #[serde(default, deserialize_with = "de::number")]
    pub hits: u64,
    #[serde(default, deserialize_with = "de::number")]
    pub posts: u64,
}

impl NewsItem {
    /// Get the full URL of the news image.
    pub fn image_url(&self) -> String {
        format!("https://cdn.proxer.me/news/{}_{}.png", self.id, self.image_id)
    }
}

/// New episode or chapter of something the user follows.
#[derive(Debug, Clone)]
pub struct MediaUpdate {
    pub id: NotificationId,
    pub kind: MediaKind,
    pub entry_id: EntryId,
    pub number: u32,
    pub language: Language,
    pub message: String,
    pub(crate) session: Weak<SessionInner>,
}

impl MediaUpdate {
    /// Remove the notification.
    pub async fn delete(&self) -> Result<()> {
        let session = self.session.upgrade().ok_or(Error::Detached)?;
        NotificationApi::new(session).delete(self.id).await
    }
}

impl PartialEq for MediaUpdate {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// A pending friend request.
#[derive(Debug, Clone)]
pub struct FriendRequest {
    pub user: User,
    pub date: Option<chrono::NaiveDate>,
    pub(crate) session: Weak<SessionInner>,
}

impl FriendRequest {
    /// Accept the request.
    pub async fn accept(&self) -> Result<()> {
        self.answer(true).await
    }

    /// Deny the request.
    pub async fn deny(&self) -> Result<()> {
        self.answer(false).await
    }

    async fn answer(&self, accept: bool) -> Result<()> {
        let session = self.session.upgrade().ok_or(Error::Detached)?;
        NotificationApi::new(session)
            .answer_friend_request(self.user.id(), accept)
            .await
    }
}
