//! Messenger API.

use std::sync::Arc;

use super::{fetch, fetch_unit};
use crate::{
    client::Request,
    error::{Error, Result},
    models::{
        Conference, ConferenceEntry, ConferenceFilter, ConferenceId, ConferenceInfo, Message,
        MessageId, MessengerConstants,
    },
    session::SessionInner,
};

/// Pages fetched at most when listing every conference.
const MAX_CONFERENCE_PAGES: u32 = 100;

/// API for conferences and private messages.
#[derive(Debug, Clone)]
pub struct MessengerApi {
    session: Arc<SessionInner>,
}

impl MessengerApi {
    pub(crate) fn new(session: Arc<SessionInner>) -> Self {
        Self { session }
    }

    /// Messenger limits, fetched once per session.
    pub async fn constants(&self) -> Result<MessengerConstants> {
        self.session.messenger_constants.get().await
    }

    pub(crate) async fn fetch_constants(&self) -> Result<MessengerConstants> {
        fetch(
            &self.session,
            Request::api_get("messenger/constants").check_login(true),
        )
        .await
    }

    /// One page of conferences, counted from zero.
    pub async fn conferences(&self, filter: ConferenceFilter, page: u32) -> Result<Vec<ConferenceEntry>> {
        fetch(
            &self.session,
            Request::api_get("messenger/conferences")
                .query("type", filter.param())
                .query("p", page)
                .check_login(true),
        )
        .await
    }

    /// Every conference, walking all pages.
    pub async fn all_conferences(&self, filter: ConferenceFilter) -> Result<Vec<ConferenceEntry>> {
        let per_page = self.constants().await?.conferences_per_page.max(1) as usize;
        let mut conferences = Vec::new();

        for page in 0..MAX_CONFERENCE_PAGES {
            let batch = self.conferences(filter, page).await?;
            let received = batch.len();
            conferences.extend(batch);
            if received < per_page {
                break;
            }
        }
        Ok(conferences)
    }

    /// A conference whose details are fetched on first read.
    pub fn conference(&self, id: impl Into<ConferenceId>) -> Conference {
        Conference::new(&self.session, id.into())
    }

    /// Topic, leader and participants of a conference.
    pub async fn conference_info(&self, id: impl Into<ConferenceId>) -> Result<ConferenceInfo> {
        let id: ConferenceId = id.into();
        fetch(
            &self.session,
            Request::api_get("messenger/conferenceinfo")
                .query("conference_id", id)
                .check_login(true),
        )
        .await
    }

    /// Newest messages of a conference, or those before `before`.
    pub async fn messages(
        &self,
        id: impl Into<ConferenceId>,
        before: Option<MessageId>,
    ) -> Result<Vec<Message>> {
        let id: ConferenceId = id.into();
        fetch(
            &self.session,
            Request::api_get("messenger/messages")
                .query("conference_id", id)
                .query("message_id", before.unwrap_or_default())
                .check_login(true),
        )
        .await
    }

    /// Send a message.
    pub async fn send(&self, id: impl Into<ConferenceId>, text: &str) -> Result<()> {
        let id: ConferenceId = id.into();
        if text.trim().is_empty() {
            return Err(Error::invalid("message must not be empty").into());
        }
        if let Some(constants) = self.session.messenger_constants.get_if_initialized() {
            if text.chars().count() > constants.max_text_length as usize {
                return Err(Error::invalid(format!(
                    "message longer than {} characters",
                    constants.max_text_length
                ))
                .into());
            }
        }

        fetch_unit(
            &self.session,
            Request::api_post("messenger/setmessage")
                .form("conference_id", id)
                .form("text", text)
                .check_login(true),
        )
        .await
    }

    /// Mark a conference unread.
    pub async fn set_unread(&self, id: impl Into<ConferenceId>) -> Result<()> {
        self.conference_action("messenger/setunread", id.into()).await
    }

    /// Block or unblock a conference.
    pub async fn set_blocked(&self, id: impl Into<ConferenceId>, blocked: bool) -> Result<()> {
        let endpoint = if blocked {
            "messenger/setblock"
        } else {
            "messenger/setunblock"
        };
        self.conference_action(endpoint, id.into()).await
    }

    /// Mark or unmark a conference as favourite.
    pub async fn set_favourite(&self, id: impl Into<ConferenceId>, favourite: bool) -> Result<()> {
        let endpoint = if favourite {
            "messenger/setfavour"
        } else {
            "messenger/setunfavour"
        };
        self.conference_action(endpoint, id.into()).await
    }

    async fn conference_action(&self, endpoint: &str, id: ConferenceId) -> Result<()> {
        fetch_unit(
            &self.session,
            Request::api_post(endpoint)
                .form("conference_id", id)
                .check_login(true),
        )
        .await
    }
}
