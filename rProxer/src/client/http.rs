//! HTTP client configuration and request execution.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use url::Url;

use super::challenge::{answer_url, ChallengeSolver};
use super::request::Request;
use super::transport::{HttpTransport, RawRequest};
use super::validate::{check_error_envelope, decode_body, run_checks};
use crate::error::{Error, Failure, Result};

/// Default Proxer base URL.
pub const DEFAULT_BASE_URL: &str = "https://proxer.me/";

/// User agent sent unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Header carrying the key for the versioned API.
pub const API_KEY_HEADER: &str = "proxer-api-key";

/// HTTP client configuration.
#[derive(Clone)]
pub struct HttpConfig {
    /// Base URL for relative paths.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Custom user agent.
    pub custom_user_agent: Option<String>,
    /// Answer anti-bot challenges instead of failing.
    pub solve_challenges: bool,
    /// Wait between solving a challenge and answering it.
    pub challenge_delay: Duration,
    /// How many challenges one request may answer.
    pub max_challenge_attempts: u32,
    /// Key for the versioned API.
    pub api_key: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: Duration::from_millis(5000),
            custom_user_agent: None,
            solve_challenges: true,
            challenge_delay: Duration::from_secs(4),
            max_challenge_attempts: 3,
            api_key: None,
        }
    }
}

impl fmt::Debug for HttpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("custom_user_agent", &self.custom_user_agent)
            .field("solve_challenges", &self.solve_challenges)
            .field("challenge_delay", &self.challenge_delay)
            .field("max_challenge_attempts", &self.max_challenge_attempts)
            .field("api_key", &self.api_key.as_ref().map(|_| "..."))
            .finish()
    }
}

impl HttpConfig {
    /// Get the user agent to send.
    pub fn user_agent(&self) -> &str {
        self.custom_user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    /// Resolve a relative path to a full URL.
    pub fn resolve_url(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(Url::parse(path)?);
        }

        Ok(Url::parse(&self.base_url)?.join(path)?)
    }
}

/// HTTP request executor.
pub struct HttpExecutor<'a> {
    transport: &'a dyn HttpTransport,
    config: &'a HttpConfig,
    solver: Option<&'a dyn ChallengeSolver>,
}

impl<'a> HttpExecutor<'a> {
    /// Create a new executor.
    pub fn new(
        transport: &'a dyn HttpTransport,
        config: &'a HttpConfig,
        solver: Option<&'a dyn ChallengeSolver>,
    ) -> Self {
        Self {
            transport,
            config,
            solver,
        }
    }

    /// Run `request` through the whole pipeline and return the checked body.
    pub async fn execute(&self, request: &Request, logged_in: bool) -> Result<String> {
        if request.check_login && !logged_in {
            return Err(Error::NotLoggedIn.into());
        }

        let raw = self.build_request(request)?;
        let body = self.fetch(raw).await?;
        let body = if request.decode { decode_body(&body) } else { body };

        run_checks(&body, &request.checks)?;
        if request.envelope_check {
            check_error_envelope(&body)?;
        }
        Ok(body)
    }

    /// Resolve the URL and attach query, form and headers.
    fn build_request(&self, request: &Request) -> Result<RawRequest> {
        let mut url = self.config.resolve_url(&request.path)?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(
                request
                    .query
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str())),
            );
        }

        let mut raw = RawRequest {
            method: request.method.clone(),
            url,
            headers: request.headers.clone(),
            form: Vec::new(),
        };
        if raw.method == reqwest::Method::POST {
            raw.form = request.form.clone();
        }
        if request.api {
            if let Some(key) = &self.config.api_key {
                raw.headers.push((API_KEY_HEADER.to_owned(), key.clone()));
            }
        }
        Ok(raw)
    }

    /// Send until a usable body arrives, answering challenges on the way.
    async fn fetch(&self, raw: RawRequest) -> Result<String> {
        let mut attempts = 0;
        loop {
            log::debug!("{} {}", raw.method, raw.url);
            let response = self.transport.execute(raw.clone()).await?;
            let text = response.text();

            match response.status {
                StatusCode::OK if !text.is_empty() => return Ok(text),
                StatusCode::SERVICE_UNAVAILABLE if !text.is_empty() => {
                    if !self.config.solve_challenges {
                        return Err(Error::Challenge.into());
                    }
                    if attempts >= self.config.max_challenge_attempts {
                        log::warn!("giving up on challenge for {} after {attempts} attempts", raw.url);
                        return Err(Error::ChallengeRetriesExhausted { attempts }.into());
                    }
                    attempts += 1;
                    self.answer_challenge(&text, &raw.url).await?;
                }
                status => {
                    return Err(Error::wrong_response(Some(status.as_u16()), text).into());
                }
            }
        }
    }

    /// Solve the challenge page, wait, then post the answer.
    async fn answer_challenge(&self, page: &str, url: &Url) -> Result<()> {
        let solver = self.solver.ok_or(Error::Challenge)?;
        let token = match solver.solve(&decode_body(page), url).await {
            Ok(token) => token,
            Err(failure) => {
                log::warn!("challenge for {url} not solved: {failure}");
                return Err(Error::Challenge.into());
            }
        };

        tokio::time::sleep(self.config.challenge_delay).await;

        let answer = RawRequest::post(answer_url(url, &token)?, Vec::new());
        match self.transport.execute(answer).await {
            Ok(response) if response.status == StatusCode::OK => Ok(()),
            Ok(response) => {
                log::warn!("challenge answer rejected with {}", response.status);
                Err(Error::Challenge.into())
            }
            Err(failure) if failure.contains(|e| matches!(e, Error::Timeout)) => {
                Err(Failure::new(Error::Timeout))
            }
            Err(_) => Err(Error::Challenge.into()),
        }
    }
}
