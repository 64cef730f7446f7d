//! Anime and manga entries, their content and descriptive enums.

use std::ops::Deref;
use std::sync::{Arc, Weak};

use serde::{Deserialize, Deserializer, Serialize};

use super::{Comment, CommentSort, EntryId, EntryTag, Industry};
use crate::api::{de, InfoApi, UcpApi};
use crate::cache::{bind, LazyProperty};
use crate::error::{Error, Result};
use crate::session::SessionInner;

/// Anime or manga.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Anime,
    Manga,
}

impl MediaKind {
    /// Get the API parameter value.
    pub fn param(&self) -> &'static str {
        match self {
            MediaKind::Anime => "anime",
            MediaKind::Manga => "manga",
        }
    }
}

/// Publication format of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Medium {
    AnimeSeries,
    Movie,
    Ova,
    Hentai,
    MangaSeries,
    OneShot,
    Doujin,
    HManga,
    Unknown,
}

impl Medium {
    /// Parse from the API value.
    pub fn from_param(s: &str) -> Self {
        match s {
            "animeseries" => Medium::AnimeSeries,
            "movie" => Medium::Movie,
            "ova" => Medium::Ova,
            "hentai" => Medium::Hentai,
            "mangaseries" => Medium::MangaSeries,
            "oneshot" => Medium::OneShot,
            "doujin" => Medium::Doujin,
            "hmanga" => Medium::HManga,
            _ => Medium::Unknown,
        }
    }

    /// Get whether this medium is anime or manga.
    pub fn kind(&self) -> Option<MediaKind> {
        match self {
            Medium::AnimeSeries | Medium::Movie | Medium::Ova | Medium::Hentai => {
                Some(MediaKind::Anime)
            }
            Medium::MangaSeries | Medium::OneShot | Medium::Doujin | Medium::HManga => {
                Some(MediaKind::Manga)
            }
            Medium::Unknown => None,
        }
    }
}

impl<'de> Deserialize<'de> for Medium {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(Medium::from_param(&de::text(deserializer)?))
    }
}

/// Language (and sub/dub) content is available in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Language {
    German,
    English,
    GerSub,
    GerDub,
    EngSub,
    EngDub,
    Unknown,
}

impl Language {
    /// Parse from the API value.
    pub fn from_param(s: &str) -> Self {
        match s {
            "de" => Language::German,
            "en" => Language::English,
            "gersub" => Language::GerSub,
            "gerdub" => Language::GerDub,
            "engsub" => Language::EngSub,
            "engdub" => Language::EngDub,
            _ => Language::Unknown,
        }
    }

    /// Get the API parameter value.
    pub fn param(&self) -> &'static str {
        match self {
            Language::German => "de",
            Language::English => "en",
            Language::GerSub => "gersub",
            Language::GerDub => "gerdub",
            Language::EngSub => "engsub",
            Language::EngDub => "engdub",
            Language::Unknown => "",
        }
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(Language::from_param(&de::text(deserializer)?))
    }
}

/// Release state of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EntryStatus {
    PreAiring,
    Finished,
    Airing,
    Cancelled,
    CancelledSub,
    Unknown,
}

impl EntryStatus {
    /// Parse from the API code.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => EntryStatus::PreAiring,
            1 => EntryStatus::Finished,
            2 => EntryStatus::Airing,
            3 => EntryStatus::Cancelled,
            4 => EntryStatus::CancelledSub,
            _ => EntryStatus::Unknown,
        }
    }
}

/// Age rating and content descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Fsk {
    Fsk0,
    Fsk6,
    Fsk12,
    Fsk16,
    Fsk18,
    BadLanguage,
    Violence,
    Fear,
    Sex,
}

impl Fsk {
    /// Parse from the API value.
    pub fn from_param(s: &str) -> Option<Self> {
        Some(match s {
            "fsk0" => Fsk::Fsk0,
            "fsk6" => Fsk::Fsk6,
            "fsk12" => Fsk::Fsk12,
            "fsk16" => Fsk::Fsk16,
            "fsk18" => Fsk::Fsk18,
            "bad_language" => Fsk::BadLanguage,
            "violence" => Fsk::Violence,
            "fear" => Fsk::Fear,
            "sex" => Fsk::Sex,
            _ => return None,
        })
    }

    /// Parse a space separated list, skipping unknown values.
    pub fn parse_list(s: &str) -> Vec<Fsk> {
        s.split_whitespace().filter_map(Fsk::from_param).collect()
    }
}

fn fsk_list<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<Fsk>, D::Error> {
    Ok(Fsk::parse_list(&de::text(deserializer)?))
}

/// Which title a name is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NameType {
    Original,
    English,
    German,
    Japanese,
    Synonym,
    Unknown,
}

impl<'de> Deserialize<'de> for NameType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match de::text(deserializer)?.as_str() {
            "name" => NameType::Original,
            "nameeng" => NameType::English,
            "nameger" => NameType::German,
            "namejap" => NameType::Japanese,
            "syn" => NameType::Synonym,
            _ => NameType::Unknown,
        })
    }
}

/// Core data of an entry.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryInfo {
    pub id: EntryId,
    pub name: String,
    #[serde(default, deserialize_with = "de::words")]
    pub genre: Vec<String>,
    #[serde(default, deserialize_with = "fsk_list")]
    pub fsk: Vec<Fsk>,
    #[serde(default)]
    pub description: String,
    pub medium: Medium,
    #[serde(deserialize_with = "de::number")]
    pub count: u32,
    #[serde(deserialize_with = "de::number")]
    pub state: u8,
    #[serde(default, deserialize_with = "de::number")]
    pub rate_sum: u64,
    #[serde(default, deserialize_with = "de::number")]
    pub rate_count: u64,
    #[serde(default, deserialize_with = "de::number")]
    pub clicks: u64,
    #[serde(rename = "kat")]
    pub kind: MediaKind,
    #[serde(default, deserialize_with = "de::truthy")]
    pub license: bool,
}

impl EntryInfo {
    /// Get the release state.
    pub fn status(&self) -> EntryStatus {
        EntryStatus::from_code(self.state)
    }

    /// Average rating, if anyone rated.
    pub fn rating(&self) -> Option<f64> {
        (self.rate_count > 0).then(|| self.rate_sum as f64 / self.rate_count as f64)
    }
}

/// One title of an entry.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryName {
    #[serde(rename = "type")]
    pub kind: NameType,
    pub name: String,
}

/// One page of an entry's episode or chapter list.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentList {
    #[serde(deserialize_with = "de::number")]
    pub start: u32,
    #[serde(deserialize_with = "de::number")]
    pub end: u32,
    #[serde(rename = "lang", default)]
    pub languages: Vec<Language>,
    #[serde(rename = "episodes", default)]
    pub items: Vec<ContentItem>,
}

/// One episode or chapter in one language.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "no", deserialize_with = "de::number")]
    pub number: u32,
    #[serde(rename = "typ")]
    pub language: Language,
    #[serde(default, deserialize_with = "de::text")]
    pub title: String,
}

/// Items fetched per content list page.
pub const CONTENT_PAGE_SIZE: u32 = 50;

/// An anime or manga with lazily fetched details.
#[derive(Clone)]
pub struct Entry {
    inner: Arc<EntryInner>,
}

struct EntryInner {
    id: EntryId,
    kind: MediaKind,
    session: Weak<SessionInner>,
    name: LazyProperty<String>,
    english_title: LazyProperty<Option<String>>,
    german_title: LazyProperty<Option<String>>,
    japanese_title: LazyProperty<Option<String>>,
    synonym: LazyProperty<Option<String>>,
    description: LazyProperty<String>,
    genres: LazyProperty<Vec<String>>,
    fsk: LazyProperty<Vec<Fsk>>,
    status: LazyProperty<EntryStatus>,
    content_count: LazyProperty<u32>,
    is_licensed: LazyProperty<bool>,
    medium: LazyProperty<Medium>,
    languages: LazyProperty<Vec<Language>>,
    tags: LazyProperty<Vec<EntryTag>>,
    industries: LazyProperty<Vec<Industry>>,
}

impl EntryInner {
    fn session(&self) -> Result<Arc<SessionInner>> {
        self.session.upgrade().ok_or_else(|| Error::Detached.into())
    }

    async fn load_info(self: Arc<Self>) -> Result<()> {
        let info = InfoApi::new(self.session()?).entry(self.id).await?;
        self.apply_info(&info);
        Ok(())
    }

    async fn load_names(self: Arc<Self>) -> Result<()> {
        let names = InfoApi::new(self.session()?).names(self.id).await?;
        let find = |kind: NameType| {
            names
                .iter()
                .find(|n| n.kind == kind)
                .map(|n| n.name.clone())
        };

        if let Some(name) = find(NameType::Original) {
            self.name.set_initialized(name);
        }
        self.english_title.set_initialized(find(NameType::English));
        self.german_title.set_initialized(find(NameType::German));
        self.japanese_title.set_initialized(find(NameType::Japanese));
        self.synonym.set_initialized(find(NameType::Synonym));
        Ok(())
    }

    async fn load_languages(self: Arc<Self>) -> Result<()> {
        let languages = InfoApi::new(self.session()?).languages(self.id).await?;
        self.languages.set_initialized(languages);
        Ok(())
    }

    async fn load_tags(self: Arc<Self>) -> Result<()> {
        let tags = InfoApi::new(self.session()?).tags(self.id).await?;
        self.tags.set_initialized(tags);
        Ok(())
    }

    async fn load_industries(self: Arc<Self>) -> Result<()> {
        let industries = InfoApi::new(self.session()?).industries(self.id).await?;
        self.industries.set_initialized(industries);
        Ok(())
    }

    fn apply_info(&self, info: &EntryInfo) {
        self.name.set_initialized(info.name.clone());
        self.description.set_initialized(info.description.clone());
        self.genres.set_initialized(info.genre.clone());
        self.fsk.set_initialized(info.fsk.clone());
        self.status.set_initialized(info.status());
        self.content_count.set_initialized(info.count);
        self.is_licensed.set_initialized(info.license);
        self.medium.set_initialized(info.medium);
    }
}

impl Entry {
    pub(crate) fn new(session: &Arc<SessionInner>, id: EntryId, kind: MediaKind) -> Self {
        let session = Arc::downgrade(session);
        let inner = Arc::new_cyclic(|weak: &Weak<EntryInner>| {
            let info = bind(weak.clone(), EntryInner::load_info);
            let names = bind(weak.clone(), EntryInner::load_names);
            let languages = bind(weak.clone(), EntryInner::load_languages);
            let tags = bind(weak.clone(), EntryInner::load_tags);
            let industries = bind(weak.clone(), EntryInner::load_industries);

            EntryInner {
                id,
                kind,
                session,
                name: LazyProperty::new(info.clone()).reinitializable(),
                english_title: LazyProperty::new(names.clone()),
                german_title: LazyProperty::new(names.clone()),
                japanese_title: LazyProperty::new(names.clone()),
                synonym: LazyProperty::new(names).reinitializable(),
                description: LazyProperty::new(info.clone()),
                genres: LazyProperty::new(info.clone()),
                fsk: LazyProperty::new(info.clone()),
                status: LazyProperty::new(info.clone()),
                content_count: LazyProperty::new(info.clone()),
                is_licensed: LazyProperty::new(info.clone()),
                medium: LazyProperty::new(info),
                languages: LazyProperty::new(languages),
                tags: LazyProperty::new(tags),
                industries: LazyProperty::new(industries),
            }
        });
        Self { inner }
    }

    /// Create an entry whose core data is already known.
    pub(crate) fn from_info(session: &Arc<SessionInner>, info: &EntryInfo) -> Self {
        let entry = Self::new(session, info.id, info.kind);
        entry.inner.apply_info(info);
        entry
    }

    /// Get the entry ID.
    pub fn id(&self) -> EntryId {
        self.inner.id
    }

    /// Get whether this is an anime or a manga.
    pub fn kind(&self) -> MediaKind {
        self.inner.kind
    }

    /// Seed the name from a listing.
    pub fn set_name(&self, name: impl Into<String>) {
        self.inner.name.set_initialized(name.into());
    }

    /// Get the original title.
    pub async fn name(&self) -> Result<String> {
        self.inner.name.get().await
    }

    /// Get the English title, if any.
    pub async fn english_title(&self) -> Result<Option<String>> {
        self.inner.english_title.get().await
    }

    /// Get the German title, if any.
    pub async fn german_title(&self) -> Result<Option<String>> {
        self.inner.german_title.get().await
    }

    /// Get the Japanese title, if any.
    pub async fn japanese_title(&self) -> Result<Option<String>> {
        self.inner.japanese_title.get().await
    }

    /// Get the alternative title, if any.
    pub async fn synonym(&self) -> Result<Option<String>> {
        self.inner.synonym.get().await
    }

    /// Get the description.
    pub async fn description(&self) -> Result<String> {
        self.inner.description.get().await
    }

    /// Get the genres.
    pub async fn genres(&self) -> Result<Vec<String>> {
        self.inner.genres.get().await
    }

    /// Get the age rating and content descriptors.
    pub async fn fsk(&self) -> Result<Vec<Fsk>> {
        self.inner.fsk.get().await
    }

    /// Get the release state.
    pub async fn status(&self) -> Result<EntryStatus> {
        self.inner.status.get().await
    }

    /// Number of episodes or chapters.
    pub async fn content_count(&self) -> Result<u32> {
        self.inner.content_count.get().await
    }

    /// Check whether the entry is licensed.
    pub async fn is_licensed(&self) -> Result<bool> {
        self.inner.is_licensed.get().await
    }

    /// Get the publication format.
    pub async fn medium(&self) -> Result<Medium> {
        self.inner.medium.get().await
    }

    /// Languages the content is available in.
    pub async fn languages(&self) -> Result<Vec<Language>> {
        self.inner.languages.get().await
    }

    /// Get the tags.
    pub async fn tags(&self) -> Result<Vec<EntryTag>> {
        self.inner.tags.get().await
    }

    /// Publishers, studios, producers and stream partners.
    pub async fn industries(&self) -> Result<Vec<Industry>> {
        self.inner.industries.get().await
    }

    /// One page of comments, counted from zero. Never cached.
    pub async fn comments(&self, sort: CommentSort, page: u32, limit: u32) -> Result<Vec<Comment>> {
        InfoApi::new(self.inner.session()?)
            .comments(self.id(), sort, page, limit)
            .await
    }

    /// Put the entry on the user's list as planned.
    pub async fn add_to_planned(&self) -> Result<()> {
        UcpApi::new(self.inner.session()?).add_to_planned(self.id()).await
    }

    /// Forget titles that may change, so they are fetched again.
    pub fn reload_names(&self) {
        self.inner.name.reset();
        self.inner.synonym.reset();
    }

    /// All content items, walking every list page.
    pub async fn content(&self) -> Result<Vec<ContentItem>> {
        let api = InfoApi::new(self.inner.session()?);
        let mut items = Vec::new();
        let mut page = 0;
        loop {
            let list = api.content(self.id(), page, CONTENT_PAGE_SIZE).await?;
            let received = list.items.len() as u32;
            items.extend(list.items);
            if received < CONTENT_PAGE_SIZE || list.end <= items.len() as u32 {
                break;
            }
            page += 1;
        }
        Ok(items)
    }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("name", &self.inner.name.get_if_initialized())
            .finish()
    }
}

/// An anime.
#[derive(Debug, Clone)]
pub struct Anime(Entry);

impl Anime {
    pub(crate) fn new(entry: Entry) -> Self {
        Anime(entry)
    }

    /// Episodes available in `language`.
    pub async fn episodes(&self, language: Language) -> Result<Vec<Episode>> {
        Ok(self
            .0
            .content()
            .await?
            .into_iter()
            .filter(|item| item.language == language)
            .map(|item| Episode {
                anime: self.clone(),
                number: item.number,
                language: item.language,
            })
            .collect())
    }
}

impl Deref for Anime {
    type Target = Entry;

    fn deref(&self) -> &Entry {
        &self.0
    }
}

/// A manga.
#[derive(Debug, Clone)]
pub struct Manga(Entry);

impl Manga {
    pub(crate) fn new(entry: Entry) -> Self {
        Manga(entry)
    }

    /// Chapters available in `language`.
    pub async fn chapters(&self, language: Language) -> Result<Vec<Chapter>> {
        Ok(self
            .0
            .content()
            .await?
            .into_iter()
            .filter(|item| item.language == language)
            .map(|item| Chapter {
                manga: self.clone(),
                number: item.number,
                language: item.language,
                title: (!item.title.is_empty()).then_some(item.title),
            })
            .collect())
    }
}

impl Deref for Manga {
    type Target = Entry;

    fn deref(&self) -> &Entry {
        &self.0
    }
}

/// One episode of an anime.
#[derive(Debug, Clone)]
pub struct Episode {
    pub anime: Anime,
    pub number: u32,
    pub language: Language,
}

impl Episode {
    /// Path of the streaming page, relative to the site root.
    pub fn watch_path(&self) -> String {
        format!("watch/{}/{}/{}", self.anime.id(), self.number, self.language.param())
    }

    /// Bookmark this episode.
    pub async fn add_to_bookmarks(&self) -> Result<()> {
        UcpApi::new(self.anime.inner.session()?)
            .add_bookmark(self.anime.id(), self.number, self.language, MediaKind::Anime)
            .await
    }
}

/// One chapter of a manga.
#[derive(Debug, Clone)]
pub struct Chapter {
    pub manga: Manga,
    pub number: u32,
    pub language: Language,
    pub title: Option<String>,
}

impl Chapter {
    /// Path of the reader page, relative to the site root.
    pub fn read_path(&self) -> String {
        format!("read/{}/{}/{}", self.manga.id(), self.number, self.language.param())
    }

    /// Bookmark this chapter.
    pub async fn add_to_bookmarks(&self) -> Result<()> {
        UcpApi::new(self.manga.inner.session()?)
            .add_bookmark(self.manga.id(), self.number, self.language, MediaKind::Manga)
            .await
    }
}
