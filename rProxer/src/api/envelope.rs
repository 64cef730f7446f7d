//! The `{"error", "message", "data"}` envelope of the versioned API.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::de;
use crate::error::{Error, Result};

/// Response envelope. `error` is sent inverted: `0` means success.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(rename = "error", deserialize_with = "de::inverted")]
    pub success: bool,
    #[serde(default, alias = "msg")]
    pub message: String,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub code: Option<i64>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Take the payload, turning error envelopes into failures.
    pub fn into_result(self) -> Result<T> {
        if !self.success {
            return Err(Error::api(self.code, self.message).into());
        }
        self.data
            .ok_or_else(|| Error::wrong_response(None, "envelope without data").into())
    }

    /// Check success for endpoints that send no payload.
    pub fn into_unit(self) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(Error::api(self.code, self.message).into())
        }
    }
}

/// Parse an envelope and return its payload.
pub fn parse_data<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str::<ApiResponse<T>>(body)?.into_result()
}

/// Parse an envelope that carries no payload.
pub fn parse_unit(body: &str) -> Result<()> {
    serde_json::from_str::<ApiResponse<serde_json::Value>>(body)?.into_unit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_envelope() {
        let failure = parse_data::<Vec<u32>>(r#"{"error":1,"message":"bad","data":null}"#).unwrap_err();
        match failure.first() {
            Some(Error::Api { message, .. }) => assert_eq!(message, "bad"),
            other => panic!("unexpected cause: {other:?}"),
        }
    }

    #[test]
    fn test_success_envelope() {
        let data: Vec<u32> = parse_data(r#"{"error":0,"message":"ok","data":[1,2]}"#).unwrap();
        assert_eq!(data, vec![1, 2]);

        assert!(parse_unit(r#"{"error":0,"message":"deleted"}"#).is_ok());
    }

    #[test]
    fn test_missing_data() {
        let failure = parse_data::<u32>(r#"{"error":0,"message":"ok"}"#).unwrap_err();
        assert!(matches!(failure.first(), Some(Error::WrongResponse { .. })));
    }

    #[test]
    fn test_not_json() {
        let failure = parse_data::<u32>("<html></html>").unwrap_err();
        assert!(matches!(failure.first(), Some(Error::Json(_))));
    }
}
