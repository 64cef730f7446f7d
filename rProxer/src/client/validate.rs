//! Post-processing of successful responses.

use std::panic::{self, AssertUnwindSafe};

use serde::Deserialize;

use super::request::ContentCheck;
use crate::api::de;
use crate::error::{Error, Failure, Result};

/// Page shown when the account may not see the requested content.
pub const NO_ACCESS_SENTINEL: &str = "Du hast keine Berechtigung um diese Seite zu betreten.";

/// Decode HTML entities and strip line breaks.
pub fn decode_body(raw: &str) -> String {
    html_escape::decode_html_entities(raw).replace(|c: char| c == '\n' || c == '\r', "")
}

/// Run content checks in order; the first failure wins.
///
/// A panicking check yields a failure without causes.
pub fn run_checks(body: &str, checks: &[ContentCheck]) -> Result<()> {
    for check in checks {
        match panic::catch_unwind(AssertUnwindSafe(|| check(body))) {
            Ok(Ok(())) => {}
            Ok(Err(failure)) => return Err(failure),
            Err(_) => {
                log::warn!("content check panicked");
                return Err(Failure::empty());
            }
        }
    }
    Ok(())
}

#[derive(Deserialize)]
struct ErrorProbe {
    #[serde(deserialize_with = "de::truthy")]
    error: bool,
    #[serde(default, alias = "msg")]
    message: Option<String>,
    #[serde(default, deserialize_with = "de::opt_number")]
    code: Option<i64>,
}

/// Detect error envelopes and the no-access page.
pub fn check_error_envelope(body: &str) -> Result<()> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('{') {
        if let Ok(probe) = serde_json::from_str::<ErrorProbe>(trimmed) {
            if probe.error {
                return Err(Error::api(probe.code, probe.message.unwrap_or_default()).into());
            }
        }
    }

    if body.contains(NO_ACCESS_SENTINEL) {
        return Err(Error::NoAccess.into());
    }
    Ok(())
}
