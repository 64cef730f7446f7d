//! Session scenarios against a stub site.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use reqwest::cookie::Jar;
use reqwest::StatusCode;
use rproxer::client::{HttpTransport, Identity, RawRequest, RawResponse, TransportFactory};
use rproxer::models::{CommentSort, Country, IndustryType, Language};
use rproxer::{
    Error, NotificationKind, ProxerClient, Request, SessionConfig, SessionEvent,
};
use tokio::sync::broadcast::error::TryRecvError;

const USERNAME: &str = "InfiniteSoul";
const PASSWORD: &str = "correct";

#[derive(Default)]
struct StubSite {
    logged_in: AtomicBool,
    login_broken: AtomicBool,
    counter: Mutex<String>,
    log: Mutex<Vec<String>>,
}

impl StubSite {
    fn calls(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    fn calls_to(&self, path: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|logged| logged.as_str() == path)
            .count()
    }

    fn set_counter(&self, payload: &str) {
        *self.counter.lock().unwrap() = payload.to_owned();
    }

    fn respond(&self, request: &RawRequest, jar: Option<&Jar>) -> (u16, String) {
        let query = |key: &str| {
            request
                .url
                .query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
        };
        let form = |key: &str| {
            request
                .form
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };

        match (request.method.as_str(), request.url.path()) {
            ("POST", "/login") => {
                if self.login_broken.load(Ordering::SeqCst) {
                    return (500, "Internal Server Error".into());
                }
                if form("username").as_deref() == Some(USERNAME)
                    && form("password").as_deref() == Some(PASSWORD)
                {
                    self.logged_in.store(true, Ordering::SeqCst);
                    if let Some(jar) = jar {
                        jar.add_cookie_str("joomla_user_state=logged_in; Path=/", &request.url);
                    }
                    (200, r#"{"error":0,"uid":"177103"}"#.into())
                } else {
                    (200, r#"{"error":1,"message":"Falsche Zugangsdaten"}"#.into())
                }
            }
            ("GET", "/login") => {
                if query("action").as_deref() == Some("logout") {
                    self.logged_in.store(false, Ordering::SeqCst);
                    (200, r#"{"error":0}"#.into())
                } else if self.logged_in.load(Ordering::SeqCst) {
                    (200, r#"{"error":0,"uid":"177103"}"#.into())
                } else {
                    (200, r#"{"error":1,"message":"Nicht eingeloggt"}"#.into())
                }
            }
            ("GET", "/notifications") => {
                if !self.logged_in.load(Ordering::SeqCst) {
                    return (200, "Bitte logge dich ein.".into());
                }
                (200, self.counter.lock().unwrap().clone())
            }
            ("GET", "/api/v1/info/entry") => (
                200,
                format!(
                    r#"{{"error":0,"message":"ok","data":{{"id":"{}","name":"Naruto","genre":"Action","fsk":"fsk12","description":"Ninja","medium":"animeseries","count":"220","state":"1","rate_sum":"0","rate_count":"0","clicks":"1","kat":"anime","license":"0"}}}}"#,
                    query("id").unwrap_or_default()
                ),
            ),
            ("GET", "/api/v1/info/comments") => {
                let (id, text) = if query("sort").as_deref() == Some("rating") {
                    (2, "Hilfreich")
                } else {
                    (3, "Neu")
                };
                (
                    200,
                    format!(
                        r#"{{"error":0,"message":"ok","data":[{{"id":"{id}","tid":"53","state":"0","comment":"{text}","rating":"8","episode":"220","positive":"1","timestamp":"1466000000","username":"{USERNAME}","uid":"177103","avatar":""}}]}}"#
                    ),
                )
            }
            ("GET", "/api/v1/info/entrytags") => (
                200,
                r#"{"error":0,"message":"ok","data":[{"id":"1","tid":"22","rate_flag":"1","spoiler_flag":"0","tag":"Ninja","description":""}]}"#.into(),
            ),
            ("GET", "/api/v1/info/publisher") => (
                200,
                r#"{"error":0,"message":"ok","data":[{"id":"3","type":"studio","name":"Pierrot","country":"jp"}]}"#.into(),
            ),
            ("GET", "/api/v1/user/history") => (
                200,
                r#"{"error":0,"message":"ok","data":[{"eid":"53","name":"Naruto","language":"gersub","medium":"animeseries","kat":"anime","episode":"12","timestamp":"1466000000"}]}"#.into(),
            ),
            ("POST", "/api/v1/info/setuserinfo") => {
                if self.logged_in.load(Ordering::SeqCst) && form("type").as_deref() == Some("note") {
                    (200, r#"{"error":0,"message":"ok"}"#.into())
                } else {
                    (200, r#"{"error":1,"message":"Fehler"}"#.into())
                }
            }
            ("POST", "/api/v1/ucp/setbookmark") => {
                if form("episode").as_deref() == Some("12")
                    && form("language").as_deref() == Some("gersub")
                    && form("kat").as_deref() == Some("anime")
                {
                    (200, r#"{"error":0,"message":"ok"}"#.into())
                } else {
                    (200, r#"{"error":1,"message":"Fehler"}"#.into())
                }
            }
            ("POST", "/user/my") => {
                if form("type").as_deref() == Some("accept") {
                    (200, r#"{"error":0,"msg":"ok"}"#.into())
                } else {
                    (200, r#"{"error":1,"msg":"Fehler"}"#.into())
                }
            }
            _ => (404, "not found".into()),
        }
    }
}

struct StubTransport {
    site: Arc<StubSite>,
    jar: Option<Arc<Jar>>,
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn execute(&self, request: RawRequest) -> rproxer::Result<RawResponse> {
        self.site
            .log
            .lock()
            .unwrap()
            .push(request.url.path().to_owned());
        tokio::time::sleep(Duration::from_millis(5)).await;

        let (status, body) = self.site.respond(&request, self.jar.as_deref());
        Ok(RawResponse::new(StatusCode::from_u16(status).unwrap(), body))
    }
}

fn stub_client(site: &Arc<StubSite>) -> ProxerClient {
    let site = site.clone();
    let factory: TransportFactory = Arc::new(
        move |_identity: &Identity, jar: Option<Arc<Jar>>| -> rproxer::Result<Arc<dyn HttpTransport>> {
            Ok(Arc::new(StubTransport {
                site: site.clone(),
                jar,
            }))
        },
    );

    ProxerClient::builder()
        .transport_factory(factory)
        .session_config(SessionConfig::default())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_login_with_correct_password() {
    let site = Arc::new(StubSite::default());
    let client = stub_client(&site);
    let session = client.session().unwrap();

    assert_eq!(session.login(USERNAME, PASSWORD).await.unwrap(), true);
    assert!(session.is_logged_in());
    assert!(session.has_cookies());
    assert_eq!(session.user_id().map(|id| id.get()), Some(177103));
    assert_eq!(session.me().unwrap().name().await.unwrap(), USERNAME);

    // already logged in: no second request
    assert_eq!(session.login(USERNAME, PASSWORD).await.unwrap(), false);
    assert_eq!(site.calls(), 1);
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let site = Arc::new(StubSite::default());
    let client = stub_client(&site);
    let session = client.session().unwrap();

    assert_eq!(session.login(USERNAME, "wrong").await.unwrap(), false);
    assert!(!session.is_logged_in());
    assert!(!session.has_cookies());
}

#[tokio::test]
async fn test_login_with_empty_arguments() {
    let site = Arc::new(StubSite::default());
    let session = stub_client(&site).session().unwrap();

    assert_eq!(session.login("", PASSWORD).await.unwrap(), false);
    assert_eq!(session.login(USERNAME, "").await.unwrap(), false);
    assert_eq!(site.calls(), 0);
}

#[tokio::test]
async fn test_check_login_short_circuits_without_network() {
    let site = Arc::new(StubSite::default());
    let session = stub_client(&site).session().unwrap();

    let failure = session
        .request(Request::get("notifications").check_login(true).anonymous())
        .await
        .unwrap_err();

    assert!(matches!(failure.first(), Some(Error::NotLoggedIn)));
    assert_eq!(site.calls(), 0);
}

#[tokio::test]
async fn test_counter_fires_only_media_updates() {
    let site = Arc::new(StubSite::default());
    let session = stub_client(&site).session().unwrap();
    assert!(session.login(USERNAME, PASSWORD).await.unwrap());

    let mut events = session.subscribe();
    site.set_counter("0#0#0#3#0");
    let counts = session.poll_notifications().await.unwrap();
    assert_eq!(counts.media_updates, 3);
    assert_eq!(counts.total(), 3);

    match events.try_recv().unwrap() {
        SessionEvent::Notification(event) => {
            assert_eq!(event.kind, NotificationKind::MediaUpdate);
            assert_eq!(event.count, 3);
            assert_eq!(event.collection.kind(), NotificationKind::MediaUpdate);
            assert!(event.collection.is_dirty());
        }
        other => panic!("unexpected event: {other:?}"),
    }
    match events.try_recv().unwrap() {
        SessionEvent::Notifications(batch) => {
            assert_eq!(batch.len(), 1);
            assert_eq!(batch[0].kind, NotificationKind::MediaUpdate);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_events_follow_kind_order() {
    let site = Arc::new(StubSite::default());
    let session = stub_client(&site).session().unwrap();
    assert!(session.login(USERNAME, PASSWORD).await.unwrap());

    let mut events = session.subscribe();
    site.set_counter("0#1#2#3#4");
    session.poll_notifications().await.unwrap();

    let mut kinds = Vec::new();
    while let Ok(SessionEvent::Notification(event)) = events.try_recv() {
        kinds.push((event.kind, event.count));
    }
    assert_eq!(
        kinds,
        vec![
            (NotificationKind::PrivateMessage, 1),
            (NotificationKind::FriendRequest, 2),
            (NotificationKind::News, 4),
            (NotificationKind::MediaUpdate, 3),
        ]
    );
}

#[tokio::test]
async fn test_bad_counter_status_is_ignored() {
    let site = Arc::new(StubSite::default());
    let session = stub_client(&site).session().unwrap();
    assert!(session.login(USERNAME, PASSWORD).await.unwrap());

    let mut events = session.subscribe();
    site.set_counter("1#5#5#5#5");
    let counts = session.poll_notifications().await.unwrap();

    assert!(!counts.has_unread());
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_init_notifications_requires_login() {
    let site = Arc::new(StubSite::default());
    let session = stub_client(&site).session().unwrap();

    let failure = session.init_notifications().await.unwrap_err();
    assert!(failure.is_not_logged_in());
    assert_eq!(site.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_notification_ticker_polls_periodically() {
    let site = Arc::new(StubSite::default());
    let session = stub_client(&site).session().unwrap();
    assert!(session.login(USERNAME, PASSWORD).await.unwrap());
    site.set_counter("0#0#0#0#0");

    session.init_notifications().await.unwrap();
    assert_eq!(site.calls_to("/notifications"), 1);

    tokio::time::sleep(Duration::from_secs(15 * 60 + 1)).await;
    assert_eq!(site.calls_to("/notifications"), 2);

    tokio::time::sleep(Duration::from_secs(15 * 60)).await;
    assert_eq!(site.calls_to("/notifications"), 3);
}

#[tokio::test]
async fn test_lost_login_emits_logged_out() {
    let site = Arc::new(StubSite::default());
    let session = stub_client(&site).session().unwrap();
    assert!(session.login(USERNAME, PASSWORD).await.unwrap());
    let mut events = session.subscribe();

    site.logged_in.store(false, Ordering::SeqCst);
    assert_eq!(session.check_login().await.unwrap(), false);

    assert!(!session.is_logged_in());
    assert!(matches!(events.try_recv(), Ok(SessionEvent::LoggedOut)));
    assert!(session.init_notifications().await.is_err());
}

#[tokio::test]
async fn test_stored_credentials_log_in_again() {
    let site = Arc::new(StubSite::default());
    let client = stub_client(&site);
    let session = client.session_with_credentials(USERNAME, PASSWORD).unwrap();
    site.set_counter("0#0#0#0#0");

    // logged out: the request logs in first, then goes through
    let counts = session.notification_api().counts().await.unwrap();
    assert!(!counts.has_unread());
    assert!(session.is_logged_in());
    assert_eq!(site.calls_to("/login"), 1);
    assert_eq!(site.calls_to("/notifications"), 1);
}

#[tokio::test]
async fn test_failed_relogin_still_emits_logged_out() {
    let site = Arc::new(StubSite::default());
    let client = stub_client(&site);
    let session = client.session_with_credentials(USERNAME, PASSWORD).unwrap();
    assert!(session.login(USERNAME, PASSWORD).await.unwrap());
    let mut events = session.subscribe();

    site.logged_in.store(false, Ordering::SeqCst);
    site.login_broken.store(true, Ordering::SeqCst);
    let failure = session.check_login().await.unwrap_err();

    assert!(matches!(
        failure.first(),
        Some(Error::WrongResponse { status: Some(500), .. })
    ));
    assert!(!session.is_logged_in());
    assert_eq!(session.user_id(), None);
    assert!(matches!(events.try_recv(), Ok(SessionEvent::LoggedOut)));

    // the transition is reported once
    assert_eq!(session.check_login().await.unwrap(), false);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_failed_relogin_keeps_both_causes() {
    let site = Arc::new(StubSite::default());
    let client = stub_client(&site);
    let session = client.session_with_credentials(USERNAME, PASSWORD).unwrap();
    site.login_broken.store(true, Ordering::SeqCst);

    let failure = session.notification_api().counts().await.unwrap_err();
    assert!(failure.is_not_logged_in());
    assert!(failure.contains(|cause| matches!(cause, Error::WrongResponse { status: Some(500), .. })));
    assert_eq!(site.calls_to("/notifications"), 0);
    assert_eq!(site.calls_to("/login"), 1);
}

#[tokio::test]
async fn test_logout_stops_session() {
    let site = Arc::new(StubSite::default());
    let session = stub_client(&site).session().unwrap();
    assert!(session.login(USERNAME, PASSWORD).await.unwrap());
    let mut events = session.subscribe();

    session.logout().await.unwrap();
    assert!(!session.is_logged_in());
    assert_eq!(session.user_id(), None);
    assert!(matches!(events.try_recv(), Ok(SessionEvent::LoggedOut)));
}

#[tokio::test]
async fn test_entity_properties_are_fetched_once() {
    let site = Arc::new(StubSite::default());
    let session = stub_client(&site).session().unwrap();
    let anime = session.info().anime(53u64);

    let (first, second) = tokio::join!(anime.name(), anime.name());
    assert_eq!(first.unwrap(), "Naruto");
    assert_eq!(second.unwrap(), "Naruto");
    assert_eq!(site.calls_to("/api/v1/info/entry"), 1);

    // populated by the same fetch
    assert_eq!(anime.genres().await.unwrap(), vec!["Action"]);
    assert_eq!(anime.content_count().await.unwrap(), 220);
    assert_eq!(anime.description().await.unwrap(), "Ninja");
    assert_eq!(site.calls_to("/api/v1/info/entry"), 1);
}

#[tokio::test]
async fn test_answer_friend_request() {
    let site = Arc::new(StubSite::default());
    let session = stub_client(&site).session().unwrap();
    assert!(session.login(USERNAME, PASSWORD).await.unwrap());

    let api = session.notification_api();
    api.answer_friend_request(42u64, true).await.unwrap();

    let failure = api.answer_friend_request(42u64, false).await.unwrap_err();
    assert!(failure.is_empty());
}

#[tokio::test]
async fn test_dropping_session_releases_transport() {
    let site = Arc::new(StubSite::default());
    let client = stub_client(&site);
    let session = client.session().unwrap();
    let id = session.id();

    assert!(client.registry().contains(&Identity::Session(id)));
    drop(session);
    assert!(!client.registry().contains(&Identity::Session(id)));
}

#[tokio::test]
async fn test_entry_comments_tags_and_industries() {
    let site = Arc::new(StubSite::default());
    let session = stub_client(&site).session().unwrap();
    let anime = session.info().anime(53u64);

    let latest = anime.comments(CommentSort::Latest, 0, 10).await.unwrap();
    assert_eq!(latest[0].text, "Neu");
    let best = anime.comments(CommentSort::Rating, 0, 10).await.unwrap();
    assert_eq!(best[0].text, "Hilfreich");
    assert_eq!(best[0].username, USERNAME);

    let tags = anime.tags().await.unwrap();
    assert_eq!(tags[0].name, "Ninja");
    anime.tags().await.unwrap();
    assert_eq!(site.calls_to("/api/v1/info/entrytags"), 1);

    let industries = anime.industries().await.unwrap();
    assert_eq!(industries[0].name, "Pierrot");
    assert_eq!(industries[0].kind, IndustryType::Studio);
    assert_eq!(industries[0].country, Country::Japan);
}

#[tokio::test]
async fn test_user_history() {
    let site = Arc::new(StubSite::default());
    let session = stub_client(&site).session().unwrap();

    let history = session.users().get(177103u64).history(0).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].name, "Naruto");
    assert_eq!(history[0].number, 12);
    assert_eq!(history[0].language, Language::GerSub);
}

#[tokio::test]
async fn test_add_to_planned_and_bookmarks() {
    let site = Arc::new(StubSite::default());
    let session = stub_client(&site).session().unwrap();
    let anime = session.info().anime(53u64);
    let episode = rproxer::Episode {
        anime: anime.clone(),
        number: 12,
        language: Language::GerSub,
    };

    // both need a login
    assert!(anime.add_to_planned().await.unwrap_err().is_not_logged_in());
    assert!(episode.add_to_bookmarks().await.unwrap_err().is_not_logged_in());
    assert_eq!(site.calls(), 0);

    assert!(session.login(USERNAME, PASSWORD).await.unwrap());
    anime.add_to_planned().await.unwrap();
    episode.add_to_bookmarks().await.unwrap();

    let unknown = rproxer::Episode {
        language: Language::Unknown,
        ..episode
    };
    let failure = unknown.add_to_bookmarks().await.unwrap_err();
    assert!(matches!(failure.first(), Some(Error::InvalidArgument(_))));
    assert_eq!(site.calls_to("/api/v1/ucp/setbookmark"), 1);
}
