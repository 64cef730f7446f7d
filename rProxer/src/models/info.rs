//! Comments, tags and companies of an entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::user::avatar_url;
use super::{CommentId, EntryId, IndustryId, ListState, TagId, UserId};
use crate::api::de;

/// Order of an entry's comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CommentSort {
    /// Newest first.
    Latest,
    /// Most helpful first.
    Rating,
}

impl CommentSort {
    /// Get the API parameter value.
    pub fn param(&self) -> &'static str {
        match self {
            CommentSort::Latest => "latest",
            CommentSort::Rating => "rating",
        }
    }
}

/// A user's comment on an entry.
#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    #[serde(rename = "tid")]
    pub entry_id: EntryId,
    #[serde(rename = "uid")]
    pub user_id: UserId,
    #[serde(default, deserialize_with = "de::text")]
    pub username: String,
    #[serde(default, deserialize_with = "de::text")]
    pub avatar: String,
    #[serde(rename = "comment", default, deserialize_with = "de::text")]
    pub text: String,
    /// Rating from 0 to 10, 0 when the user did not rate.
    #[serde(default, deserialize_with = "de::number")]
    pub rating: u8,
    /// Episodes or chapters the user got through.
    #[serde(rename = "episode", default, deserialize_with = "de::number")]
    pub progress: u32,
    /// Votes marking the comment helpful.
    #[serde(rename = "positive", default, deserialize_with = "de::number")]
    pub helpful: u32,
    #[serde(deserialize_with = "de::timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, deserialize_with = "de::number")]
    state: u8,
}

impl Comment {
    /// Where the entry is on the author's list.
    pub fn state(&self) -> ListState {
        ListState::from_code(self.state)
    }

    /// Full avatar URL of the author.
    pub fn avatar_url(&self) -> String {
        avatar_url(&self.avatar)
    }
}

/// A tag attached to an entry.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryTag {
    #[serde(deserialize_with = "de::number")]
    pub id: u64,
    #[serde(rename = "tid")]
    pub tag_id: TagId,
    #[serde(rename = "tag", default, deserialize_with = "de::text")]
    pub name: String,
    #[serde(default, deserialize_with = "de::text")]
    pub description: String,
    /// Confirmed by the community.
    #[serde(rename = "rate_flag", default, deserialize_with = "de::truthy")]
    pub is_rated: bool,
    #[serde(rename = "spoiler_flag", default, deserialize_with = "de::truthy")]
    pub is_spoiler: bool,
}

/// Role of a company in an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IndustryType {
    Publisher,
    Studio,
    Producer,
    StreamPartner,
    Unknown,
}

impl IndustryType {
    /// Parse from the API value.
    pub fn from_param(s: &str) -> Self {
        match s {
            "publisher" => IndustryType::Publisher,
            "studio" => IndustryType::Studio,
            "producer" => IndustryType::Producer,
            "streaming" => IndustryType::StreamPartner,
            _ => IndustryType::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for IndustryType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(IndustryType::from_param(&de::text(deserializer)?))
    }
}

/// Country a company is based in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Country {
    Germany,
    England,
    UnitedStates,
    Japan,
    Other,
}

impl Country {
    /// Parse from the API value.
    pub fn from_param(s: &str) -> Self {
        match s {
            "de" => Country::Germany,
            "en" | "gb" => Country::England,
            "us" => Country::UnitedStates,
            "jp" => Country::Japan,
            _ => Country::Other,
        }
    }
}

impl<'de> Deserialize<'de> for Country {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(Country::from_param(&de::text(deserializer)?))
    }
}

/// A publisher, studio, producer or stream partner.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Industry {
    pub id: IndustryId,
    #[serde(deserialize_with = "de::text")]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: IndustryType,
    pub country: Country,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_comment() {
        let comment: Comment = serde_json::from_str(
            r#"{"id":"17","tid":"53","type":"","state":"0","data":"","comment":"Sehr gut","rating":"9","episode":"220","positive":"4","timestamp":"1466000000","username":"InfiniteSoul","uid":"177103","avatar":"177103_abc.jpg"}"#,
        )
        .unwrap();

        assert_eq!(comment.id, CommentId(17));
        assert_eq!(comment.entry_id, EntryId(53));
        assert_eq!(comment.user_id, UserId(177103));
        assert_eq!(comment.text, "Sehr gut");
        assert_eq!(comment.rating, 9);
        assert_eq!(comment.helpful, 4);
        assert_eq!(comment.state(), ListState::Finished);
        assert_eq!(comment.timestamp.timestamp(), 1466000000);
        assert!(comment.avatar_url().ends_with("177103_abc.jpg"));
    }

    #[test]
    fn test_entry_tag() {
        let tag: EntryTag = serde_json::from_str(
            r#"{"id":"1","tid":"22","timestamp":"1466000000","rate_flag":"1","spoiler_flag":"0","tag":"Ninja","description":"Ninjas kommen vor"}"#,
        )
        .unwrap();

        assert_eq!(tag.tag_id, TagId(22));
        assert_eq!(tag.name, "Ninja");
        assert!(tag.is_rated);
        assert!(!tag.is_spoiler);
    }

    #[test]
    fn test_industry() {
        let industries: Vec<Industry> = serde_json::from_str(
            r#"[{"id":"3","type":"studio","name":"Pierrot","country":"jp"},{"id":4,"type":"streaming","name":"Crunchyroll","country":"us"},{"id":5,"type":"talent","name":"?","country":"misc"}]"#,
        )
        .unwrap();

        assert_eq!(industries[0].kind, IndustryType::Studio);
        assert_eq!(industries[0].country, Country::Japan);
        assert_eq!(industries[1].kind, IndustryType::StreamPartner);
        assert_eq!(industries[2].kind, IndustryType::Unknown);
        assert_eq!(industries[2].country, Country::Other);
    }
}
