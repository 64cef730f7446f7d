//! Network transport and the per-identity transport registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::cookie::Jar;
use reqwest::{Client, Method, StatusCode};
use url::Url;

use super::http::HttpConfig;
use crate::error::Result;

/// A fully resolved request handed to a transport.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
}

impl RawRequest {
    /// Create a GET request.
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: Vec::new(),
            form: Vec::new(),
        }
    }

    /// Create a form POST request.
    pub fn post(url: Url, form: Vec<(String, String)>) -> Self {
        Self {
            method: Method::POST,
            url,
            headers: Vec::new(),
            form,
        }
    }
}

/// What came back from the wire, undecoded.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Create a response.
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Body as UTF-8 text, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends raw requests. Cookies are the transport's concern.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: RawRequest) -> Result<RawResponse>;
}

/// Transport backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a client honouring the timeout and user agent of `config`.
    ///
    /// When a jar is given, every request reads from and writes to it.
    pub fn new(config: &HttpConfig, jar: Option<Arc<Jar>>) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent())
            .gzip(true);
        if let Some(jar) = jar {
            builder = builder.cookie_provider(jar);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: RawRequest) -> Result<RawResponse> {
        let mut builder = self.client.request(request.method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.form.is_empty() {
            builder = builder.form(&request.form);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        Ok(RawResponse::new(status, body.to_vec()))
    }
}

/// On whose behalf a transport sends requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identity {
    /// No cookies at all.
    Anonymous,
    /// A session, keyed by its id.
    Session(u64),
}

/// Creates the transport for an identity, given the identity's cookie jar.
pub type TransportFactory =
    Arc<dyn Fn(&Identity, Option<Arc<Jar>>) -> Result<Arc<dyn HttpTransport>> + Send + Sync>;

/// Factory producing [`ReqwestTransport`]s for `config`.
pub fn reqwest_factory(config: HttpConfig) -> TransportFactory {
    Arc::new(
        move |_identity: &Identity, jar: Option<Arc<Jar>>| -> Result<Arc<dyn HttpTransport>> {
            Ok(Arc::new(ReqwestTransport::new(&config, jar)?))
        },
    )
}

/// Memo of one transport per identity, owned by a client.
pub struct ClientRegistry {
    factory: TransportFactory,
    transports: RwLock<HashMap<Identity, Arc<dyn HttpTransport>>>,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new(factory: TransportFactory) -> Self {
        Self {
            factory,
            transports: RwLock::new(HashMap::new()),
        }
    }

    /// Get the transport for `identity`, creating it on first use.
    ///
    /// `jar` is only consulted when the transport is created.
    pub fn get_or_create(
        &self,
        identity: Identity,
        jar: Option<Arc<Jar>>,
    ) -> Result<Arc<dyn HttpTransport>> {
        if let Some(transport) = self.transports.read().get(&identity) {
            return Ok(transport.clone());
        }

        let mut transports = self.transports.write();
        if let Some(transport) = transports.get(&identity) {
            return Ok(transport.clone());
        }
        let transport = (self.factory)(&identity, jar)?;
        transports.insert(identity, transport.clone());
        Ok(transport)
    }

    /// Forget the transport of `identity`.
    pub fn remove(&self, identity: &Identity) {
        self.transports.write().remove(identity);
    }

    /// Check whether `identity` has a transport.
    pub fn contains(&self, identity: &Identity) -> bool {
        self.transports.read().contains_key(identity)
    }

    /// Get the number of transports.
    pub fn len(&self) -> usize {
        self.transports.read().len()
    }

    /// Check whether no transport exists.
    pub fn is_empty(&self) -> bool {
        self.transports.read().is_empty()
    }
}

impl fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("identities", &self.transports.read().keys().collect::<Vec<_>>())
            .finish()
    }
}
