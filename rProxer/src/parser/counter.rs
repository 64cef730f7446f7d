//! The `#` separated notification counter.
//!
//! Layout: `status#private_messages#friend_requests#media_updates#news`.
//!
//! Older clients of the site read a six field payload instead, with private
//! messages, friend requests, news and media updates at indices 2 to 5. If
//! the live counter turns out to use that layout, only the field order below
//! has to change.

use crate::models::NotificationCounts;

/// Parse a counter payload.
///
/// Returns `None` unless the status field is `0`. Missing or unreadable
/// counts are zero.
pub fn parse_counts(payload: &str) -> Option<NotificationCounts> {
    let mut fields = payload.trim().split('#');
    if fields.next()?.trim() != "0" {
        return None;
    }

    let mut next = || {
        fields
            .next()
            .and_then(|field| field.trim().parse::<u32>().ok())
            .unwrap_or(0)
    };

    let private_messages = next();
    let friend_requests = next();
    let media_updates = next();
    let news = next();

    Some(NotificationCounts {
        private_messages,
        friend_requests,
        news,
        media_updates,
    })
}
