//! Parsers for Proxer pages and counters.

pub mod counter;
pub mod html;

pub use counter::parse_counts;
pub use html::{parse_friend_requests, parse_media_updates, FriendRequestRow, MediaUpdateRow};
