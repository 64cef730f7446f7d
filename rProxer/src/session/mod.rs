//! Sessions: login state, cookies, background tickers and notification events.

mod events;
mod ticker;

pub use events::{
    NotificationCollection, NotificationEvent, NotificationItem, SessionEvent, NEWS_PAGE_SIZE,
};
pub use ticker::Ticker;

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use reqwest::cookie::{CookieStore, Jar};
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::api::{de, InfoApi, MessengerApi, NotificationApi, UcpApi, UserApi};
use crate::cache::{bind, LazyProperty};
use crate::client::{ClientInner, HttpTransport, Identity, Request};
use crate::error::{Error, Result};
use crate::models::{MessengerConstants, NotificationCounts, NotificationKind, User, UserId};
use events::Collections;

/// Events buffered per subscriber before the oldest are dropped.
const EVENT_CAPACITY: usize = 64;

/// Intervals of a session's background tickers.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Wait before the first login check.
    pub login_check_delay: Duration,
    pub login_check_interval: Duration,
    pub notification_interval: Duration,
    /// Wait before collections are first marked dirty.
    pub refresh_delay: Duration,
    pub refresh_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            login_check_delay: Duration::from_secs(45 * 60),
            login_check_interval: Duration::from_secs(30 * 60),
            notification_interval: Duration::from_secs(15 * 60),
            refresh_delay: Duration::from_millis(1),
            refresh_interval: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginAnswer {
    #[serde(rename = "error", deserialize_with = "de::inverted")]
    success: bool,
    #[serde(default, deserialize_with = "de::opt_number")]
    uid: Option<u64>,
    #[serde(default)]
    message: String,
}

#[derive(Clone)]
struct Credentials {
    username: String,
    password: String,
}

#[derive(Debug, Clone)]
struct Account {
    id: UserId,
    name: Option<String>,
}

/// Internal session state.
pub(crate) struct SessionInner {
    id: u64,
    me: Weak<SessionInner>,
    client: Arc<ClientInner>,
    jar: Arc<Jar>,
    transport: Arc<dyn HttpTransport>,
    logged_in: AtomicBool,
    account: RwLock<Option<Account>>,
    credentials: Mutex<Option<Credentials>>,
    events: broadcast::Sender<SessionEvent>,
    login_ticker: Ticker,
    poll_ticker: Ticker,
    refresh_ticker: Ticker,
    collections: Collections,
    pub(crate) messenger_constants: LazyProperty<MessengerConstants>,
}

impl SessionInner {
    /// Check the login flag.
    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    /// Get the logged in user's ID.
    pub fn user_id(&self) -> Option<UserId> {
        self.account.read().as_ref().map(|account| account.id)
    }

    /// Get the notification collection of `kind`.
    pub fn collection(&self, kind: NotificationKind) -> &NotificationCollection {
        self.collections.get(kind)
    }

    /// Send a request. A session with stored credentials logs in again once
    /// when the site reports it logged out.
    pub async fn send(&self, request: &Request) -> Result<String> {
        match self.execute(request).await {
            Err(failure) if failure.is_not_logged_in() && !request.is_anonymous() => {
                let was_logged_in = self.is_logged_in();
                match self.recover_login(was_logged_in).await {
                    Ok(true) => {
                        log::debug!("retrying {} after login", request.path());
                        self.execute(request).await
                    }
                    Ok(false) => Err(failure),
                    Err(cause) => Err(failure.merge(cause)),
                }
            }
            result => result,
        }
    }

    async fn execute(&self, request: &Request) -> Result<String> {
        let transport = if request.is_anonymous() {
            self.client.anonymous_transport()?
        } else {
            self.transport.clone()
        };
        self.client
            .executor(transport.as_ref())
            .execute(request, self.is_logged_in())
            .await
    }

    fn has_credentials(&self) -> bool {
        self.credentials.lock().is_some()
    }

    /// Log in unless already logged in.
    pub async fn login(&self, username: &str, password: &str) -> Result<bool> {
        if self.is_logged_in() || username.is_empty() || password.is_empty() {
            return Ok(false);
        }
        self.login_with(username, password).await
    }

    async fn login_with(&self, username: &str, password: &str) -> Result<bool> {
        let request = Request::post("login")
            .query("format", "json")
            .query("action", "login")
            .form("username", username)
            .form("password", password)
            .without_envelope_check();

        let answer: LoginAnswer = serde_json::from_str(&self.execute(&request).await?)?;
        if !answer.success {
            log::info!("login of {username} refused: {}", answer.message);
            self.logged_in.store(false, Ordering::SeqCst);
            return Ok(false);
        }

        *self.account.write() = Some(Account {
            id: answer.uid.map(UserId).unwrap_or_default(),
            name: Some(username.to_owned()),
        });
        self.logged_in.store(true, Ordering::SeqCst);
        self.start_login_check();
        log::info!("logged in as {username}");
        Ok(true)
    }

    /// Log in again with stored credentials.
    pub async fn relogin(&self) -> Result<bool> {
        let credentials = self.credentials.lock().clone();
        let Some(credentials) = credentials else {
            return Ok(false);
        };
        self.logged_in.store(false, Ordering::SeqCst);
        self.login_with(&credentials.username, &credentials.password)
            .await
    }

    /// Ask the site whether the login is still valid.
    pub async fn check_login(&self) -> Result<bool> {
        let request = Request::get("login")
            .query("format", "json")
            .query("action", "login")
            .without_envelope_check();
        let answer: LoginAnswer = serde_json::from_str(&self.execute(&request).await?)?;

        let was_logged_in = self.logged_in.swap(answer.success, Ordering::SeqCst);
        if answer.success {
            if let Some(uid) = answer.uid {
                self.set_user_id(UserId(uid));
            }
            return Ok(true);
        }

        if was_logged_in {
            return self.recover_login(true).await;
        }
        Ok(false)
    }

    /// Log in again with stored credentials after the site dropped the login.
    ///
    /// Unless that succeeds, a session that was logged in is marked logged
    /// out, including when the new login fails with an error.
    async fn recover_login(&self, was_logged_in: bool) -> Result<bool> {
        let result = if self.has_credentials() {
            self.relogin().await
        } else {
            Ok(false)
        };
        if was_logged_in && !matches!(result, Ok(true)) {
            self.set_logged_out();
        }
        result
    }

    /// Log out and stop all tickers.
    pub async fn logout(&self) -> Result<()> {
        if self.is_logged_in() {
            let request = Request::get("login")
                .query("format", "json")
                .query("action", "logout")
                .without_envelope_check();
            self.execute(&request).await?;
        }
        self.credentials.lock().take();
        self.set_logged_out();
        Ok(())
    }

    fn set_user_id(&self, id: UserId) {
        if let Some(account) = self.account.write().as_mut() {
            account.id = id;
        }
    }

    fn set_logged_out(&self) {
        self.logged_in.store(false, Ordering::SeqCst);
        self.account.write().take();
        self.stop_tickers();
        log::info!("session {} logged out", self.id);
        self.events.send(SessionEvent::LoggedOut).ok();
    }

    fn stop_tickers(&self) {
        self.login_ticker.stop();
        self.poll_ticker.stop();
        self.refresh_ticker.stop();
    }

    fn start_login_check(&self) {
        let config = &self.client.session_config;
        let session = self.me.clone();
        self.login_ticker.start(
            config.login_check_delay,
            config.login_check_interval,
            move || {
                let session = session.clone();
                async move {
                    let Some(session) = session.upgrade() else {
                        return ControlFlow::Break(());
                    };
                    match session.check_login().await {
                        Ok(true) => ControlFlow::Continue(()),
                        Ok(false) => ControlFlow::Break(()),
                        Err(failure) => {
                            log::warn!("login check failed: {failure}");
                            ControlFlow::Continue(())
                        }
                    }
                }
            },
        );
    }

    /// Poll once, then start the poll and refresh tickers.
    pub async fn init_notifications(&self) -> Result<()> {
        if !self.is_logged_in() {
            return Err(Error::NotLoggedIn.into());
        }
        self.poll_notifications().await?;

        let config = &self.client.session_config;
        let session = self.me.clone();
        self.poll_ticker.start(
            config.notification_interval,
            config.notification_interval,
            move || {
                let session = session.clone();
                async move {
                    let Some(session) = session.upgrade() else {
                        return ControlFlow::Break(());
                    };
                    if !session.is_logged_in() {
                        return ControlFlow::Break(());
                    }
                    if let Err(failure) = session.poll_notifications().await {
                        log::warn!("notification poll failed: {failure}");
                    }
                    ControlFlow::Continue(())
                }
            },
        );

        let session = self.me.clone();
        self.refresh_ticker.start(config.refresh_delay, config.refresh_interval, move || {
            let session = session.upgrade();
            async move {
                match session {
                    Some(session) => {
                        session.collections.mark_all_dirty();
                        ControlFlow::Continue(())
                    }
                    None => ControlFlow::Break(()),
                }
            }
        });
        Ok(())
    }

    /// Fetch the counters once and raise events for every kind with news.
    pub async fn poll_notifications(&self) -> Result<NotificationCounts> {
        let counts = NotificationApi::fetch_counts(self).await?;
        self.raise(&counts);
        Ok(counts)
    }

    fn raise(&self, counts: &NotificationCounts) {
        let mut batch = Vec::new();
        for kind in NotificationKind::ALL {
            let count = counts.get(kind);
            if count == 0 {
                continue;
            }
            let collection = self.collection(kind).clone();
            collection.mark_dirty();

            let event = NotificationEvent {
                kind,
                count,
                collection,
            };
            log::debug!("{count} new notifications of kind {kind:?}");
            self.events.send(SessionEvent::Notification(event.clone())).ok();
            batch.push(event);
        }

        if !batch.is_empty() {
            self.events.send(SessionEvent::Notifications(batch)).ok();
        }
    }

    fn has_cookies(&self) -> bool {
        self.client
            .config
            .resolve_url("")
            .map(|url| self.jar.cookies(&url).is_some())
            .unwrap_or(false)
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.stop_tickers();
        self.client.registry.remove(&Identity::Session(self.id));
    }
}

impl std::fmt::Debug for SessionInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("logged_in", &self.is_logged_in())
            .field("account", &*self.account.read())
            .field("credentials", &self.credentials.lock().as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A logged in or anonymous visitor of the site.
///
/// Each session owns its cookie jar. Handles are cheap to clone; background
/// tickers stop and the session's transport is released when the last handle
/// is dropped.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub(crate) fn new(client: Arc<ClientInner>, credentials: Option<(String, String)>) -> Result<Self> {
        let id = client.next_session_id();
        let jar = Arc::new(Jar::default());
        let transport = client
            .registry
            .get_or_create(Identity::Session(id), Some(jar.clone()))?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let inner = Arc::new_cyclic(|me: &Weak<SessionInner>| {
            let constants = bind(me.clone(), |session: Arc<SessionInner>| async move {
                let constants = MessengerApi::new(session.clone()).fetch_constants().await?;
                session.messenger_constants.set_initialized(constants);
                Ok(())
            });

            SessionInner {
                id,
                me: me.clone(),
                client,
                jar,
                transport,
                logged_in: AtomicBool::new(false),
                account: RwLock::new(None),
                credentials: Mutex::new(
                    credentials.map(|(username, password)| Credentials { username, password }),
                ),
                events,
                login_ticker: Ticker::new("login check"),
                poll_ticker: Ticker::new("notification poll"),
                refresh_ticker: Ticker::new("property refresh"),
                collections: Collections::new(me),
                messenger_constants: LazyProperty::new(constants),
            }
        });
        log::debug!("created session {id}");
        Ok(Self { inner })
    }

    /// Log in. `Ok(false)` when already logged in, when either argument is
    /// empty, or when the site refuses the credentials.
    pub async fn login(&self, username: &str, password: &str) -> Result<bool> {
        self.inner.login(username, password).await
    }

    /// Store credentials used to log in again when the site drops the login.
    pub fn with_credentials(&self, username: impl Into<String>, password: impl Into<String>) {
        *self.inner.credentials.lock() = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
    }

    /// Log in again with stored credentials. `Ok(false)` without any.
    pub async fn relogin(&self) -> Result<bool> {
        self.inner.relogin().await
    }

    /// Ask the site whether the login is still valid.
    pub async fn check_login(&self) -> Result<bool> {
        self.inner.check_login().await
    }

    /// Log out, forget stored credentials and stop all tickers.
    pub async fn logout(&self) -> Result<()> {
        self.inner.logout().await
    }

    /// Poll notifications once, then keep polling in the background.
    pub async fn init_notifications(&self) -> Result<()> {
        self.inner.init_notifications().await
    }

    /// Poll notifications once.
    pub async fn poll_notifications(&self) -> Result<NotificationCounts> {
        self.inner.poll_notifications().await
    }

    /// Mark every notification collection dirty and check the login.
    pub async fn force_property_reload(&self) -> Result<bool> {
        self.inner.collections.mark_all_dirty();
        self.inner.check_login().await
    }

    /// Receive events raised from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Send a request with this session's cookies.
    pub async fn request(&self, request: Request) -> Result<String> {
        self.inner.send(&request).await
    }

    /// Get the notification collection of `kind`.
    pub fn notifications(&self, kind: NotificationKind) -> NotificationCollection {
        self.inner.collection(kind).clone()
    }

    /// Check the login flag.
    pub fn is_logged_in(&self) -> bool {
        self.inner.is_logged_in()
    }

    /// Get the logged in user's ID.
    pub fn user_id(&self) -> Option<UserId> {
        self.inner.user_id()
    }

    /// The logged in user.
    pub fn me(&self) -> Result<User> {
        let account = self
            .inner
            .account
            .read()
            .clone()
            .ok_or(Error::NotLoggedIn)?;
        Ok(match account.name {
            Some(name) => User::with_name(&self.inner, account.id, name),
            None => User::new(&self.inner, account.id),
        })
    }

    /// Whether the site has set any cookies.
    pub fn has_cookies(&self) -> bool {
        self.inner.has_cookies()
    }

    /// Get the session ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Get the user API.
    pub fn users(&self) -> UserApi {
        UserApi::new(self.inner.clone())
    }

    /// Get the entry info API.
    pub fn info(&self) -> InfoApi {
        InfoApi::new(self.inner.clone())
    }

    /// Get the messenger API.
    pub fn messenger(&self) -> MessengerApi {
        MessengerApi::new(self.inner.clone())
    }

    /// Get the notification API.
    pub fn notification_api(&self) -> NotificationApi {
        NotificationApi::new(self.inner.clone())
    }

    /// Get the control panel API.
    pub fn ucp(&self) -> UcpApi {
        UcpApi::new(self.inner.clone())
    }
}
