//! Extraction of notifications from HTML pages.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{Error, Result};
use crate::models::{EntryId, Language, MediaKind, NotificationId, UserId};

lazy_static! {
    static ref UPDATE_SELECTOR: Selector = Selector::parse("a.notificationList").unwrap();
    static ref FRIEND_ROW_SELECTOR: Selector =
        Selector::parse(r#"table#box-table-a tr[id^="entry"]"#).unwrap();
    static ref CELL_SELECTOR: Selector = Selector::parse("td").unwrap();
    static ref USER_LINK_SELECTOR: Selector = Selector::parse(r#"a[href*="/user/"]"#).unwrap();
    static ref CONTENT_HREF_RE: Regex =
        Regex::new(r"/(watch|chapter|read)/(\d+)/(\d+)/(\w+)").unwrap();
    static ref DATE_RE: Regex = Regex::new(r"\d{2}\.\d{2}\.\d{4}").unwrap();
}

/// A media update as listed on the notification page.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaUpdateRow {
    pub id: NotificationId,
    pub kind: MediaKind,
    pub entry_id: EntryId,
    pub number: u32,
    pub language: Language,
    pub message: String,
}

/// A pending friend request as listed on the connections page.
#[derive(Debug, Clone, PartialEq)]
pub struct FriendRequestRow {
    pub user_id: UserId,
    pub username: String,
    pub date: Option<NaiveDate>,
}

fn text_of(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

/// Parse the media update list. Links to anything but content are skipped.
pub fn parse_media_updates(html: &str) -> Result<Vec<MediaUpdateRow>> {
    let document = Html::parse_fragment(html);
    let mut rows = Vec::new();

    for link in document.select(&UPDATE_SELECTOR) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some(caps) = CONTENT_HREF_RE.captures(href) else {
            log::debug!("skipping notification link {href}");
            continue;
        };

        let id = link
            .value()
            .id()
            .and_then(|id| id.strip_prefix("notification_"))
            .ok_or_else(|| Error::missing("notification id"))?
            .parse::<NotificationId>()
            .map_err(|e| Error::parse(format!("notification id: {e}")))?;

        let kind = match &caps[1] {
            "watch" => MediaKind::Anime,
            _ => MediaKind::Manga,
        };
        let entry_id = caps[2]
            .parse::<EntryId>()
            .map_err(|e| Error::parse(format!("entry id: {e}")))?;
        let number = caps[3]
            .parse::<u32>()
            .map_err(|e| Error::parse(format!("content number: {e}")))?;

        rows.push(MediaUpdateRow {
            id,
            kind,
            entry_id,
            number,
            language: Language::from_param(&caps[4]),
            message: text_of(&link),
        });
    }

    Ok(rows)
}

/// Parse the friend request table.
pub fn parse_friend_requests(html: &str) -> Result<Vec<FriendRequestRow>> {
    let document = Html::parse_fragment(html);
    let mut rows = Vec::new();

    for row in document.select(&FRIEND_ROW_SELECTOR) {
        let user_id = row
            .value()
            .id()
            .and_then(|id| id.strip_prefix("entry"))
            .ok_or_else(|| Error::missing("friend request user id"))?
            .parse::<UserId>()
            .map_err(|e| Error::parse(format!("friend request user id: {e}")))?;

        let username = match row.select(&USER_LINK_SELECTOR).map(|a| text_of(&a)).find(|s| !s.is_empty()) {
            Some(name) => name,
            None => row
                .select(&CELL_SELECTOR)
                .nth(2)
                .map(|cell| text_of(&cell))
                .ok_or_else(|| Error::missing("friend request username"))?,
        };

        let date = row
            .select(&CELL_SELECTOR)
            .map(|cell| text_of(&cell))
            .find_map(|text| {
                DATE_RE
                    .find(&text)
                    .and_then(|m| NaiveDate::parse_from_str(m.as_str(), "%d.%m.%Y").ok())
            });

        rows.push(FriendRequestRow {
            user_id,
            username,
            date,
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_media_updates() {
        let html = r##"<div>
            <a class="notificationList" id="notification_501" href="/watch/53/12/gersub#top">Naruto Episode 12 ist online!</a>
            <a class="notificationList" id="notification_502" href="/chapter/8/3/en#top">One Piece Kapitel 3</a>
            <a class="notificationList" id="notification_503" href="/forum/1/2">Forum</a>
        </div>"##;

        let rows = parse_media_updates(html).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            MediaUpdateRow {
                id: NotificationId(501),
                kind: MediaKind::Anime,
                entry_id: EntryId(53),
                number: 12,
                language: Language::GerSub,
                message: "Naruto Episode 12 ist online!".into(),
            }
        );
        assert_eq!(rows[1].kind, MediaKind::Manga);
        assert_eq!(rows[1].language, Language::English);
    }

    #[test]
    fn test_media_update_without_id() {
        let html = r#"<a class="notificationList" href="/watch/53/12/gersub">x</a>"#;
        assert!(parse_media_updates(html).is_err());
    }

    #[test]
    fn test_parse_friend_requests() {
        let html = r#"<table id="box-table-a">
            <tr><th>Bild</th><th>Status</th><th>Name</th><th>Datum</th></tr>
            <tr id="entry177103"><td><img src="a.png"></td><td>online</td><td><a href="/user/177103">InfiniteSoul</a></td><td>13.06.2016</td></tr>
            <tr id="entry42"><td></td><td></td><td>Someone</td><td>-</td></tr>
        </table>"#;

        let rows = parse_friend_requests(html).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].user_id, UserId(177103));
        assert_eq!(rows[0].username, "InfiniteSoul");
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2016, 6, 13));
        assert_eq!(rows[1].username, "Someone");
        assert_eq!(rows[1].date, None);
    }

    #[test]
    fn test_empty_pages() {
        assert!(parse_media_updates("<p>Keine Benachrichtigungen</p>").unwrap().is_empty());
        assert!(parse_friend_requests("").unwrap().is_empty());
    }
}
