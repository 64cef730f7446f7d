//! Messenger conferences and messages.

use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use super::{ConferenceId, MessageId, User, UserId};
use crate::api::{de, MessengerApi};
use crate::cache::{bind, LazyProperty};
use crate::error::{Error, Result};
use crate::session::SessionInner;

/// Limits of the messenger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MessengerConstants {
    /// Maximum characters per message.
    #[serde(rename = "textCount", deserialize_with = "de::number")]
    pub max_text_length: u32,
    /// Conferences per page.
    #[serde(rename = "conferenceLimit", deserialize_with = "de::number")]
    pub conferences_per_page: u32,
    /// Messages per page.
    #[serde(rename = "messagesLimit", deserialize_with = "de::number")]
    pub messages_per_page: u32,
    /// Maximum participants of a group.
    #[serde(rename = "userLimit", deserialize_with = "de::number")]
    pub max_participants: u32,
    /// Maximum characters of a group topic.
    #[serde(rename = "topicCount", deserialize_with = "de::number")]
    pub max_topic_length: u32,
}

/// Which conferences to list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConferenceFilter {
    #[default]
    Default,
    Group,
    Favourite,
    Blocked,
}

impl ConferenceFilter {
    /// Get the API parameter value.
    pub fn param(&self) -> &'static str {
        match self {
            ConferenceFilter::Default => "default",
            ConferenceFilter::Group => "group",
            ConferenceFilter::Favourite => "favour",
            ConferenceFilter::Blocked => "block",
        }
    }
}

/// A conference as listed by `messenger/conferences`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConferenceEntry {
    pub id: ConferenceId,
    #[serde(deserialize_with = "de::text")]
    pub topic: String,
    #[serde(default, deserialize_with = "de::text")]
    pub topic_custom: String,
    #[serde(rename = "count", deserialize_with = "de::number")]
    pub participants: u32,
    #[serde(rename = "group", deserialize_with = "de::truthy")]
    pub is_group: bool,
    #[serde(deserialize_with = "de::truthy")]
    pub read: bool,
    #[serde(rename = "timestamp_end", deserialize_with = "de::timestamp")]
    pub last_message: DateTime<Utc>,
    #[serde(default, deserialize_with = "de::text")]
    pub image: String,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub read_mid: Option<u64>,
}

impl ConferenceEntry {
    /// Custom topic if set, otherwise the generated one.
    pub fn title(&self) -> &str {
        if self.topic_custom.is_empty() {
            &self.topic
        } else {
            &self.topic_custom
        }
    }
}

/// Header of `messenger/conferenceinfo`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConferenceDetails {
    #[serde(deserialize_with = "de::text")]
    pub topic: String,
    #[serde(rename = "count", deserialize_with = "de::number")]
    pub participants: u32,
    #[serde(rename = "timestamp_start", deserialize_with = "de::timestamp")]
    pub started: DateTime<Utc>,
    #[serde(rename = "timestamp_end", deserialize_with = "de::timestamp")]
    pub last_message: DateTime<Utc>,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub leader: Option<u64>,
}

/// A participant of a conference.
#[derive(Debug, Clone, Deserialize)]
pub struct Participant {
    #[serde(rename = "uid")]
    pub id: UserId,
    pub username: String,
    #[serde(default, deserialize_with = "de::text")]
    pub avatar: String,
    #[serde(default, deserialize_with = "de::text")]
    pub status: String,
}

/// Full answer of `messenger/conferenceinfo`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConferenceInfo {
    pub conference: ConferenceDetails,
    #[serde(default)]
    pub users: Vec<Participant>,
}

/// What a system message records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageAction {
    NoAction,
    AddUser,
    RemoveUser,
    SetTopic,
    SetLeader,
}

impl MessageAction {
    /// Parse from the API value.
    pub fn from_param(s: &str) -> Self {
        match s {
            "addUser" => MessageAction::AddUser,
            "removeUser" => MessageAction::RemoveUser,
            "setTopic" => MessageAction::SetTopic,
            "setLeader" => MessageAction::SetLeader,
            _ => MessageAction::NoAction,
        }
    }
}

impl<'de> Deserialize<'de> for MessageAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(MessageAction::from_param(&de::text(deserializer)?))
    }
}

/// One message of a conference.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    #[serde(rename = "message_id")]
    pub id: MessageId,
    pub conference_id: ConferenceId,
    pub user_id: UserId,
    pub username: String,
    #[serde(rename = "message", deserialize_with = "de::text")]
    pub text: String,
    pub action: MessageAction,
    #[serde(rename = "timestamp", deserialize_with = "de::timestamp")]
    pub sent: DateTime<Utc>,
    #[serde(default, deserialize_with = "de::text")]
    pub device: String,
}

impl Message {
    /// Check whether this is a system message.
    pub fn is_system(&self) -> bool {
        self.action != MessageAction::NoAction
    }
}

/// A conference with lazily fetched details.
#[derive(Clone)]
pub struct Conference {
    inner: Arc<ConferenceInner>,
}

struct ConferenceInner {
    id: ConferenceId,
    session: Weak<SessionInner>,
    title: LazyProperty<String>,
    is_group: LazyProperty<bool>,
    leader: LazyProperty<Option<User>>,
    participants: LazyProperty<Vec<User>>,
}

impl ConferenceInner {
    fn session(&self) -> Result<Arc<SessionInner>> {
        self.session.upgrade().ok_or_else(|| Error::Detached.into())
    }

    async fn load_info(self: Arc<Self>) -> Result<()> {
        let session = self.session()?;
        let info = MessengerApi::new(session.clone()).conference_info(self.id).await?;

        let participants: Vec<User> = info
            .users
            .iter()
            .map(|p| {
                let user = User::with_name(&session, p.id, p.username.clone());
                user.set_avatar(&p.avatar);
                user
            })
            .collect();
        let leader = info.conference.leader.and_then(|leader| {
            participants
                .iter()
                .find(|user| user.id().get() == leader)
                .cloned()
        });

        self.title.set_initialized(info.conference.topic.clone());
        self.is_group.set_initialized(info.conference.participants > 2);
        self.leader.set_initialized(leader);
        self.participants.set_initialized(participants);
        Ok(())
    }
}

impl Conference {
    pub(crate) fn new(session: &Arc<SessionInner>, id: ConferenceId) -> Self {
        let session = Arc::downgrade(session);
        let inner = Arc::new_cyclic(|weak: &Weak<ConferenceInner>| {
            let info = bind(weak.clone(), ConferenceInner::load_info);

            ConferenceInner {
                id,
                session,
                title: LazyProperty::new(info.clone()).reinitializable(),
                is_group: LazyProperty::new(info.clone()),
                leader: LazyProperty::new(info.clone()).reinitializable(),
                participants: LazyProperty::new(info).reinitializable(),
            }
        });
        Self { inner }
    }

    pub(crate) fn from_entry(session: &Arc<SessionInner>, entry: &ConferenceEntry) -> Self {
        let conference = Self::new(session, entry.id);
        conference.inner.title.set_initialized(entry.title().to_owned());
        conference.inner.is_group.set_initialized(entry.is_group);
        conference
    }

    /// Get the conference ID.
    pub fn id(&self) -> ConferenceId {
        self.inner.id
    }

    /// Get the conference title.
    pub async fn title(&self) -> Result<String> {
        self.inner.title.get().await
    }

    /// Check whether this is a group conference.
    pub async fn is_group(&self) -> Result<bool> {
        self.inner.is_group.get().await
    }

    /// Leader of a group conference.
    pub async fn leader(&self) -> Result<Option<User>> {
        self.inner.leader.get().await
    }

    /// Get the participants.
    pub async fn participants(&self) -> Result<Vec<User>> {
        self.inner.participants.get().await
    }

    /// Newest messages, or those before `before`.
    pub async fn messages(&self, before: Option<MessageId>) -> Result<Vec<Message>> {
        MessengerApi::new(self.inner.session()?)
            .messages(self.id(), before)
            .await
    }

    /// Send a message to this conference.
    pub async fn send(&self, text: &str) -> Result<()> {
        MessengerApi::new(self.inner.session()?)
            .send(self.id(), text)
            .await
    }

    /// Forget details that may change.
    pub fn reload(&self) {
        self.inner.title.reset();
        self.inner.leader.reset();
        self.inner.participants.reset();
    }
}

impl PartialEq for Conference {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl std::fmt::Debug for Conference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conference")
            .field("id", &self.inner.id)
            .field("title", &self.inner.title.get_if_initialized())
            .finish()
    }
}
