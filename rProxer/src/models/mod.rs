//! Data models for Proxer entities.

mod conference;
mod ids;
mod info;
mod media;
mod notification;
mod ucp;
mod user;

pub use conference::{
    Conference, ConferenceDetails, ConferenceEntry, ConferenceFilter, ConferenceInfo, Message,
    MessageAction, MessengerConstants, Participant,
};
pub use ids::{
    BookmarkId, CommentId, ConferenceId, EntryId, IndustryId, MessageId, NotificationId, TagId,
    UserId,
};
pub use info::{Comment, CommentSort, Country, EntryTag, Industry, IndustryType};
pub use media::{
    Anime, Chapter, ContentItem, ContentList, Entry, EntryInfo, EntryName, EntryStatus, Episode,
    Fsk, Language, Manga, MediaKind, Medium, NameType, CONTENT_PAGE_SIZE,
};
pub use notification::{
    FriendRequest, MediaUpdate, NewsItem, NotificationCounts, NotificationKind,
};
pub use ucp::{Bookmark, ListEntry, ListState};
pub use user::{
    HistoryEntry, TopTenEntry, User, UserInfo, UserPoints, DEFAULT_AVATAR, HISTORY_PAGE_SIZE,
};
