//! Session events and the notification collections they point to.

use std::sync::{Arc, Weak};

use super::SessionInner;
use crate::api::{MessengerApi, NotificationApi};
use crate::cache::{bind, LazyProperty};
use crate::error::Result;
use crate::models::{
    Conference, ConferenceFilter, FriendRequest, MediaUpdate, NewsItem, NotificationKind,
};

/// News fetched into the news collection.
pub const NEWS_PAGE_SIZE: u32 = 15;

/// Something that happened to a session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The site no longer accepts the session's login.
    LoggedOut,
    /// New notifications of one kind.
    Notification(NotificationEvent),
    /// Every kind that fired during one poll, sent after the single events.
    Notifications(Vec<NotificationEvent>),
}

/// New notifications of one kind.
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub count: u32,
    pub collection: NotificationCollection,
}

/// One notification.
#[derive(Debug, Clone)]
pub enum NotificationItem {
    /// Conference with unread messages.
    Conference(Conference),
    FriendRequest(FriendRequest),
    News(NewsItem),
    MediaUpdate(MediaUpdate),
}

/// Notifications of one kind, fetched on first read.
///
/// Marked dirty whenever a poll reports new notifications of its kind, and
/// periodically by the refresh ticker.
#[derive(Clone)]
pub struct NotificationCollection {
    inner: Arc<CollectionInner>,
}

struct CollectionInner {
    kind: NotificationKind,
    items: LazyProperty<Vec<NotificationItem>>,
}

impl NotificationCollection {
    pub(crate) fn new(session: Weak<SessionInner>, kind: NotificationKind) -> Self {
        let init = bind(session, move |session: Arc<SessionInner>| async move {
            let items = fetch_items(&session, kind).await?;
            session.collection(kind).inner.items.set_initialized(items);
            Ok(())
        });

        Self {
            inner: Arc::new(CollectionInner {
                kind,
                items: LazyProperty::new(init).reinitializable(),
            }),
        }
    }

    /// Get the kind of notifications held.
    pub fn kind(&self) -> NotificationKind {
        self.inner.kind
    }

    /// The notifications, fetching them if needed.
    pub async fn items(&self) -> Result<Vec<NotificationItem>> {
        self.inner.items.get().await
    }

    /// The notifications, if already fetched.
    pub fn cached(&self) -> Option<Vec<NotificationItem>> {
        self.inner.items.get_if_initialized()
    }

    /// Fetch again on next read.
    pub fn mark_dirty(&self) {
        self.inner.items.reset();
    }

    /// Check whether the next read fetches again.
    pub fn is_dirty(&self) -> bool {
        !self.inner.items.is_initialized()
    }
}

impl std::fmt::Debug for NotificationCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationCollection")
            .field("kind", &self.inner.kind)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

/// One collection per kind.
#[derive(Debug)]
pub(crate) struct Collections {
    private_messages: NotificationCollection,
    friend_requests: NotificationCollection,
    news: NotificationCollection,
    media_updates: NotificationCollection,
}

impl Collections {
    /// Create one collection per kind.
    pub fn new(session: &Weak<SessionInner>) -> Self {
        let make = |kind| NotificationCollection::new(session.clone(), kind);
        Self {
            private_messages: make(NotificationKind::PrivateMessage),
            friend_requests: make(NotificationKind::FriendRequest),
            news: make(NotificationKind::News),
            media_updates: make(NotificationKind::MediaUpdate),
        }
    }

    /// Get the collection of `kind`.
    pub fn get(&self, kind: NotificationKind) -> &NotificationCollection {
        match kind {
            NotificationKind::PrivateMessage => &self.private_messages,
            NotificationKind::FriendRequest => &self.friend_requests,
            NotificationKind::News => &self.news,
            NotificationKind::MediaUpdate => &self.media_updates,
        }
    }

    /// Mark every collection dirty.
    pub fn mark_all_dirty(&self) {
        for kind in NotificationKind::ALL {
            self.get(kind).mark_dirty();
        }
    }
}

async fn fetch_items(session: &Arc<SessionInner>, kind: NotificationKind) -> Result<Vec<NotificationItem>> {
    Ok(match kind {
        NotificationKind::PrivateMessage => {
            let entries = MessengerApi::new(session.clone())
                .conferences(ConferenceFilter::Default, 0)
                .await?;
            entries
                .iter()
                .filter(|entry| !entry.read)
                .map(|entry| NotificationItem::Conference(Conference::from_entry(session, entry)))
                .collect()
        }
        NotificationKind::FriendRequest => NotificationApi::new(session.clone())
            .friend_requests()
            .await?
            .into_iter()
            .map(NotificationItem::FriendRequest)
            .collect(),
        NotificationKind::News => NotificationApi::new(session.clone())
            .news(0, NEWS_PAGE_SIZE)
            .await?
            .into_iter()
            .map(NotificationItem::News)
            .collect(),
        NotificationKind::MediaUpdate => NotificationApi::new(session.clone())
            .media_updates()
            .await?
            .into_iter()
            .map(NotificationItem::MediaUpdate)
            .collect(),
    })
}
