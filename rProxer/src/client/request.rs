//! Requests understood by the HTTP pipeline.

use std::fmt;
use std::sync::Arc;

use reqwest::Method;

use crate::error::Result;

/// Path prefix of the versioned JSON API.
pub const API_PATH: &str = "api/v1/";

/// Inspects a decoded body before it is handed back.
pub type ContentCheck = Arc<dyn Fn(&str) -> Result<()> + Send + Sync>;

/// One logical call against the site.
#[derive(Clone)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) form: Vec<(String, String)>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) check_login: bool,
    pub(crate) anonymous: bool,
    pub(crate) envelope_check: bool,
    pub(crate) decode: bool,
    pub(crate) api: bool,
    pub(crate) checks: Vec<ContentCheck>,
}

impl Request {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            form: Vec::new(),
            headers: Vec::new(),
            check_login: false,
            anonymous: false,
            envelope_check: true,
            decode: true,
            api: false,
            checks: Vec::new(),
        }
    }

    /// GET a page, relative to the base URL or absolute.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// POST a form to a page.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// GET a versioned API endpoint such as `info/entry`.
    pub fn api_get(endpoint: &str) -> Self {
        let mut request = Self::get(format!("{API_PATH}{endpoint}"));
        request.api = true;
        request
    }

    /// POST to a versioned API endpoint.
    pub fn api_post(endpoint: &str) -> Self {
        let mut request = Self::post(format!("{API_PATH}{endpoint}"));
        request.api = true;
        request
    }

    /// Add a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Add a form field; only sent with POST.
    pub fn form(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.form.push((key.into(), value.to_string()));
        self
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Fail with `NotLoggedIn` up front when the session is logged out.
    ///
    /// The session's login flag decides, whether or not the request would
    /// carry cookies. A cookie jar left over from an expired login does not
    /// let the request through.
    pub fn check_login(mut self, check: bool) -> Self {
        self.check_login = check;
        self
    }

    /// Send without the session's cookies.
    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    /// Return the body without entity decoding or newline stripping.
    pub fn raw_body(mut self) -> Self {
        self.decode = false;
        self
    }

    /// Skip detection of error envelopes; the caller inspects the body itself.
    pub fn without_envelope_check(mut self) -> Self {
        self.envelope_check = false;
        self
    }

    /// Run `check` on the decoded body. Checks run in insertion order.
    pub fn check<F>(mut self, check: F) -> Self
    where
        F: Fn(&str) -> Result<()> + Send + Sync + 'static,
    {
        self.checks.push(Arc::new(check));
        self
    }

    /// Get the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the path or URL.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Check whether the request goes without cookies.
    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    /// Check whether the request needs a login.
    pub fn requires_login(&self) -> bool {
        self.check_login
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("form", &self.form.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .field("check_login", &self.check_login)
            .field("anonymous", &self.anonymous)
            .field("checks", &self.checks.len())
            .finish()
    }
}

/// Common content checks.
pub mod checks {
    use crate::error::{Error, Failure, Result};

    /// Page shown instead of content to guests.
    pub const LOGIN_SENTINEL: &str = "Bitte logge dich ein.";

    /// Fails with `NotLoggedIn` when the page asks for a login.
    pub fn login_required(body: &str) -> Result<()> {
        if body.contains(LOGIN_SENTINEL) {
            return Err(Error::NotLoggedIn.into());
        }
        Ok(())
    }

    /// Accepts only legacy JSON answers reporting success.
    ///
    /// Anything else fails without a cause, like the site gives none.
    pub fn json_success(body: &str) -> Result<()> {
        if body.starts_with("{\"error\":0") {
            Ok(())
        } else {
            Err(Failure::empty())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_api_request_path() {
        let request = Request::api_get("info/entry").query("id", 41);
        assert_eq!(request.path(), "api/v1/info/entry");
        assert!(request.api);
        assert_eq!(request.query, vec![("id".to_owned(), "41".to_owned())]);
    }

    #[test]
    fn test_defaults() {
        let request = Request::post("login").form("username", "a");
        assert_eq!(request.method(), &Method::POST);
        assert!(request.envelope_check);
        assert!(request.decode);
        assert!(!request.requires_login());
        assert!(!request.is_anonymous());
    }

    #[test]
    fn test_checks() {
        assert!(checks::login_required("<h3>Bitte logge dich ein.</h3>")
            .unwrap_err()
            .is_not_logged_in());
        assert!(checks::login_required("<div>ok</div>").is_ok());

        assert!(checks::json_success("{\"error\":0,\"msg\":\"ok\"}").is_ok());
        assert!(checks::json_success("{\"error\":1}").unwrap_err().is_empty());
    }
}
