//! User API.

use std::sync::Arc;

use super::fetch;
use crate::{
    client::Request,
    error::{Error, Result},
    models::{HistoryEntry, MediaKind, TopTenEntry, User, UserId, UserInfo},
    session::SessionInner,
};

/// API for user operations.
#[derive(Debug, Clone)]
pub struct UserApi {
    session: Arc<SessionInner>,
}

impl UserApi {
    pub(crate) fn new(session: Arc<SessionInner>) -> Self {
        Self { session }
    }

    /// Get a user by ID. Profile data is fetched on first read.
    pub fn get(&self, user_id: impl Into<UserId>) -> User {
        User::new(&self.session, user_id.into())
    }

    /// Look up a user by name.
    pub async fn by_name(&self, username: &str) -> Result<User> {
        if username.trim().is_empty() {
            return Err(Error::invalid("username must not be empty").into());
        }
        let info: UserInfo = fetch(
            &self.session,
            Request::api_get("user/userinfo").query("username", username),
        )
        .await?;
        Ok(User::from_info(&self.session, &info))
    }

    /// Profile data of a user.
    pub async fn info(&self, user_id: impl Into<UserId>) -> Result<UserInfo> {
        let user_id: UserId = user_id.into();
        fetch(
            &self.session,
            Request::api_get("user/userinfo").query("uid", user_id),
        )
        .await
    }

    /// Favourite anime or manga of a user.
    pub async fn topten(&self, user_id: impl Into<UserId>, kind: MediaKind) -> Result<Vec<TopTenEntry>> {
        let user_id: UserId = user_id.into();
        fetch(
            &self.session,
            Request::api_get("user/topten")
                .query("uid", user_id)
                .query("category", kind.param()),
        )
        .await
    }

    /// One page of a user's history, counted from zero.
    pub async fn history(
        &self,
        user_id: impl Into<UserId>,
        page: u32,
        limit: u32,
    ) -> Result<Vec<HistoryEntry>> {
        let user_id: UserId = user_id.into();
        fetch(
            &self.session,
            Request::api_get("user/history")
                .query("uid", user_id)
                .query("p", page)
                .query("limit", limit),
        )
        .await
    }
}
