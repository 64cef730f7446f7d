//! Rust client library for Proxer.me.

pub mod api;
pub mod cache;
pub mod client;
pub mod error;
pub mod models;
pub mod parser;
pub mod session;

// Re-export main types
pub use client::{ChallengeSolver, HttpConfig, ProxerClient, ProxerClientBuilder, Request};
pub use error::{Error, Failure, Result, ResultExt};
pub use session::{
    NotificationCollection, NotificationEvent, NotificationItem, Session, SessionConfig,
    SessionEvent,
};

// Re-export commonly used models
pub use models::{
    Anime, Bookmark, Chapter, Comment, CommentSort, Conference, ConferenceFilter, Entry, EntryId,
    EntryTag, Episode, FriendRequest, HistoryEntry, Industry, Language, Manga, MediaKind,
    MediaUpdate, Message, MessageAction, NewsItem, NotificationCounts, NotificationKind, User,
    UserId,
};

// Re-export API types
pub use api::{InfoApi, MessengerApi, NotificationApi, UcpApi, UserApi};
