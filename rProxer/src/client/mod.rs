//! HTTP client and configuration.

mod challenge;
mod http;
mod request;
mod transport;
mod validate;

pub use challenge::{answer_url, ChallengeSolver, CHALLENGE_ANSWER_PATH};
pub use http::{HttpConfig, HttpExecutor, API_KEY_HEADER, DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
pub use request::{checks, ContentCheck, Request, API_PATH};
pub use transport::{
    reqwest_factory, ClientRegistry, HttpTransport, Identity, RawRequest, RawResponse,
    ReqwestTransport, TransportFactory,
};
pub use validate::{check_error_envelope, decode_body, run_checks, NO_ACCESS_SENTINEL};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::session::{Session, SessionConfig};

/// Builder for creating ProxerClient.
pub struct ProxerClientBuilder {
    http_config: HttpConfig,
    session_config: SessionConfig,
    factory: Option<TransportFactory>,
    solver: Option<Arc<dyn ChallengeSolver>>,
}

impl std::fmt::Debug for ProxerClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxerClientBuilder")
            .field("http_config", &self.http_config)
            .field("session_config", &self.session_config)
            .field("factory", &self.factory.as_ref().map(|_| "..."))
            .field("solver", &self.solver.as_ref().map(|_| "..."))
            .finish()
    }
}

impl Default for ProxerClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxerClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            http_config: HttpConfig::default(),
            session_config: SessionConfig::default(),
            factory: None,
            solver: None,
        }
    }

    /// Set base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.http_config.base_url = url.into();
        self
    }

    /// Set the key for the versioned API.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.http_config.api_key = Some(key.into());
        self
    }

    /// Set custom user agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.http_config.custom_user_agent = Some(ua.into());
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.http_config.timeout = timeout;
        self
    }

    /// Enable or disable answering anti-bot challenges.
    pub fn solve_challenges(mut self, enabled: bool) -> Self {
        self.http_config.solve_challenges = enabled;
        self
    }

    /// Set the wait before a challenge answer is sent.
    pub fn challenge_delay(mut self, delay: Duration) -> Self {
        self.http_config.challenge_delay = delay;
        self
    }

    /// Set how many challenges a single request may answer.
    pub fn max_challenge_attempts(mut self, attempts: u32) -> Self {
        self.http_config.max_challenge_attempts = attempts;
        self
    }

    /// Set the challenge solver.
    pub fn challenge_solver(mut self, solver: Arc<dyn ChallengeSolver>) -> Self {
        self.solver = Some(solver);
        self
    }

    /// Replace how transports are created for each identity.
    pub fn transport_factory(mut self, factory: TransportFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Set ticker intervals for sessions.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Build ProxerClient.
    pub fn build(self) -> Result<ProxerClient> {
        self.http_config.resolve_url("")?;
        let factory = self
            .factory
            .unwrap_or_else(|| reqwest_factory(self.http_config.clone()));

        Ok(ProxerClient {
            inner: Arc::new(ClientInner {
                config: self.http_config,
                session_config: self.session_config,
                registry: ClientRegistry::new(factory),
                solver: self.solver,
                next_session: AtomicU64::new(1),
            }),
        })
    }
}

/// Internal client state.
pub(crate) struct ClientInner {
    pub config: HttpConfig,
    pub session_config: SessionConfig,
    pub registry: ClientRegistry,
    pub solver: Option<Arc<dyn ChallengeSolver>>,
    next_session: AtomicU64,
}

impl ClientInner {
    /// Create HTTP executor.
    pub fn executor<'a>(&'a self, transport: &'a dyn HttpTransport) -> HttpExecutor<'a> {
        HttpExecutor::new(transport, &self.config, self.solver.as_deref())
    }

    /// Transport without cookies.
    pub fn anonymous_transport(&self) -> Result<Arc<dyn HttpTransport>> {
        self.registry.get_or_create(Identity::Anonymous, None)
    }

    /// Get a fresh session ID.
    pub fn next_session_id(&self) -> u64 {
        self.next_session.fetch_add(1, Ordering::Relaxed)
    }

    /// Execute a request without any session.
    pub async fn send_anonymous(&self, request: &Request) -> Result<String> {
        let transport = self.anonymous_transport()?;
        self.executor(transport.as_ref()).execute(request, false).await
    }
}

/// Proxer client. Hands out sessions that share its configuration.
#[derive(Clone)]
pub struct ProxerClient {
    pub(crate) inner: Arc<ClientInner>,
}

impl ProxerClient {
    /// Create a new client builder.
    pub fn builder() -> ProxerClientBuilder {
        ProxerClientBuilder::new()
    }

    /// Start a new, logged out session.
    pub fn session(&self) -> Result<Session> {
        Session::new(self.inner.clone(), None)
    }

    /// Start a session that can log itself in again when the site logs it out.
    pub fn session_with_credentials(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Session> {
        Session::new(self.inner.clone(), Some((username.into(), password.into())))
    }

    /// Execute a request without cookies or session.
    pub async fn send(&self, request: Request) -> Result<String> {
        self.inner.send_anonymous(&request).await
    }

    /// Get the HTTP configuration.
    pub fn config(&self) -> &HttpConfig {
        &self.inner.config
    }

    /// Get the transport registry.
    pub fn registry(&self) -> &ClientRegistry {
        &self.inner.registry
    }
}

impl std::fmt::Debug for ProxerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxerClient")
            .field("base_url", &self.inner.config.base_url)
            .field("registry", &self.inner.registry)
            .finish()
    }
}
