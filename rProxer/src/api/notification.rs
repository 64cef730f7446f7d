//! Notification API.

use std::sync::Arc;

use super::{fetch, fetch_unit};
use crate::{
    client::{checks, Request},
    error::Result,
    models::{FriendRequest, MediaUpdate, NewsItem, NotificationCounts, NotificationId, User, UserId},
    parser,
    session::SessionInner,
};

/// Page listing unseen episodes and chapters.
const MEDIA_UPDATES_PATH: &str = "components/com_proxer/misc/notifications_misc.php";

/// API for notification operations.
#[derive(Debug, Clone)]
pub struct NotificationApi {
    session: Arc<SessionInner>,
}

impl NotificationApi {
    pub(crate) fn new(session: Arc<SessionInner>) -> Self {
        Self { session }
    }

    /// Get unread notification counts.
    pub async fn counts(&self) -> Result<NotificationCounts> {
        Self::fetch_counts(&self.session).await
    }

    pub(crate) async fn fetch_counts(session: &SessionInner) -> Result<NotificationCounts> {
        let body = session
            .send(
                &Request::get("notifications")
                    .query("format", "raw")
                    .query("s", "count")
                    .check_login(true)
                    .without_envelope_check(),
            )
            .await?;

        Ok(parser::parse_counts(&body).unwrap_or_else(|| {
            log::debug!("ignoring notification counter {body:?}");
            NotificationCounts::default()
        }))
    }

    /// One page of news, counted from zero.
    pub async fn news(&self, page: u32, limit: u32) -> Result<Vec<NewsItem>> {
        fetch(
            &self.session,
            Request::api_get("notifications/news")
                .query("p", page)
                .query("limit", limit)
                .check_login(true),
        )
        .await
    }

    /// Episodes and chapters released since they were last seen.
    pub async fn media_updates(&self) -> Result<Vec<MediaUpdate>> {
        let body = self
            .session
            .send(
                &Request::get(MEDIA_UPDATES_PATH)
                    .check_login(true)
                    .check(checks::login_required),
            )
            .await?;

        let session = Arc::downgrade(&self.session);
        Ok(parser::parse_media_updates(&body)?
            .into_iter()
            .map(|row| MediaUpdate {
                id: row.id,
                kind: row.kind,
                entry_id: row.entry_id,
                number: row.number,
                language: row.language,
                message: row.message,
                session: session.clone(),
            })
            .collect())
    }

    /// Pending friend requests.
    pub async fn friend_requests(&self) -> Result<Vec<FriendRequest>> {
        let body = self
            .session
            .send(
                &Request::get("user/my/connections")
                    .query("format", "raw")
                    .check_login(true)
                    .check(checks::login_required),
            )
            .await?;

        let session = Arc::downgrade(&self.session);
        Ok(parser::parse_friend_requests(&body)?
            .into_iter()
            .map(|row| FriendRequest {
                user: User::with_name(&self.session, row.user_id, row.username),
                date: row.date,
                session: session.clone(),
            })
            .collect())
    }

    /// Delete a notification.
    pub async fn delete(&self, id: impl Into<NotificationId>) -> Result<()> {
        let id: NotificationId = id.into();
        fetch_unit(
            &self.session,
            Request::api_post("notifications/delete")
                .form("nid", id)
                .check_login(true),
        )
        .await
    }

    /// Accept or deny the friend request of `user_id`.
    pub async fn answer_friend_request(&self, user_id: impl Into<UserId>, accept: bool) -> Result<()> {
        let user_id: UserId = user_id.into();
        self.session
            .send(
                &Request::post("user/my")
                    .query("format", "json")
                    .query("cid", user_id)
                    .form("type", if accept { "accept" } else { "deny" })
                    .check_login(true)
                    .check(checks::json_success),
            )
            .await?;
        Ok(())
    }
}
