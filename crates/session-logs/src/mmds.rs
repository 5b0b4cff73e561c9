// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Client for the local metadata service (MMDS).
//!
//! Two calls are made per write: a `PUT` that issues a short-lived token and
//! a `GET` on the root path that returns the session options as JSON.

use crate::config::Config;
use crate::error::{FetchError, ForwarderError, OptionsParseError};
use reqwest::header::{HeaderValue, ACCEPT};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

pub const TOKEN_TTL_HEADER: &str = "X-metadata-token-ttl-seconds";
pub const TOKEN_HEADER: &str = "X-metadata-token";

/// Identification of the session a batch of logs belongs to, and where to
/// ship it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionOptions {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    #[serde(rename = "codeSnippetID")]
    pub code_snippet_id: String,
    pub address: String,
}

#[derive(Deserialize)]
struct RawSessionOptions {
    #[serde(rename = "sessionID", default)]
    session_id: Option<String>,
    #[serde(rename = "codeSnippetID", default)]
    code_snippet_id: Option<String>,
    #[serde(default)]
    address: Option<String>,
}

impl SessionOptions {
    /// Parses an MMDS response body, requiring every field to be present and
    /// non-empty.
    pub fn from_json(body: &[u8]) -> Result<Self, OptionsParseError> {
        let raw: RawSessionOptions = serde_json::from_slice(body)?;

        let address = required(raw.address, "address")?;
        let code_snippet_id = required(raw.code_snippet_id, "codeSnippetID")?;
        let session_id = required(raw.session_id, "sessionID")?;

        Ok(Self {
            session_id,
            code_snippet_id,
            address,
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, OptionsParseError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(OptionsParseError::MissingField(field)),
    }
}

#[derive(Debug, Clone)]
pub struct MmdsClient {
    client: reqwest::Client,
    token_url: String,
    options_url: String,
    token_ttl: Duration,
}

impl MmdsClient {
    #[must_use]
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        MmdsClient {
            client,
            token_url: config.token_url(),
            options_url: config.options_url(),
            token_ttl: config.token_ttl,
        }
    }

    pub async fn fetch_token(&self) -> Result<String, FetchError> {
        info!("SESSION LOGS | Retrieving MMDS token");

        let response = self
            .client
            .put(&self.token_url)
            .header(TOKEN_TTL_HEADER, self.token_ttl.as_secs().to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        info!("SESSION LOGS | Reading MMDS token response body");
        let token = response.text().await?;
        if token.is_empty() {
            return Err(FetchError::EmptyToken);
        }

        Ok(token)
    }

    pub async fn fetch_options(&self, token: &str) -> Result<SessionOptions, ForwarderError> {
        debug!("SESSION LOGS | Retrieving MMDS opts");

        let body = self
            .fetch_options_body(token)
            .await
            .map_err(|source| ForwarderError::OptionsFetch {
                token: token.to_string(),
                source,
            })?;

        debug!("SESSION LOGS | Unmarshalling MMDS opts body");
        let options = SessionOptions::from_json(&body)?;
        debug!("SESSION LOGS | MMDS opts body unmarshalled");

        Ok(options)
    }

    async fn fetch_options_body(&self, token: &str) -> Result<Vec<u8>, FetchError> {
        let token = HeaderValue::from_str(token)?;

        let response = self
            .client
            .get(&self.options_url)
            .header(TOKEN_HEADER, token)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        debug!("SESSION LOGS | Reading MMDS opts response body");
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_complete() {
        let body = br#"{"sessionID":"s1","codeSnippetID":"c1","address":"http://x/y"}"#;
        let options = SessionOptions::from_json(body).expect("options should parse");
        assert_eq!(
            options,
            SessionOptions {
                session_id: "s1".to_string(),
                code_snippet_id: "c1".to_string(),
                address: "http://x/y".to_string(),
            }
        );
    }

    #[test]
    fn test_from_json_ignores_unknown_fields() {
        let body = br#"{"sessionID":"s1","codeSnippetID":"c1","address":"http://x/y","env":"prod"}"#;
        assert!(SessionOptions::from_json(body).is_ok());
    }

    #[test]
    fn test_from_json_missing_fields_in_order() {
        let err = SessionOptions::from_json(b"{}").unwrap_err();
        assert!(matches!(err, OptionsParseError::MissingField("address")));

        let err = SessionOptions::from_json(br#"{"address":"http://x/y"}"#).unwrap_err();
        assert!(matches!(err, OptionsParseError::MissingField("codeSnippetID")));

        let err =
            SessionOptions::from_json(br#"{"address":"http://x/y","codeSnippetID":"c1"}"#)
                .unwrap_err();
        assert!(matches!(err, OptionsParseError::MissingField("sessionID")));
    }

    #[test]
    fn test_from_json_empty_and_null_fields_are_missing() {
        let err = SessionOptions::from_json(
            br#"{"sessionID":"","codeSnippetID":"c1","address":"http://x/y"}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "no 'sessionID' in mmds opts");

        let err = SessionOptions::from_json(
            br#"{"sessionID":"s1","codeSnippetID":null,"address":"http://x/y"}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "no 'codeSnippetID' in mmds opts");
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(matches!(
            SessionOptions::from_json(b"not json"),
            Err(OptionsParseError::Json(_))
        ));
        assert!(matches!(
            SessionOptions::from_json(br#"["s1","c1","http://x/y"]"#),
            Err(OptionsParseError::Json(_))
        ));
        assert!(matches!(
            SessionOptions::from_json(br#"{"sessionID":1,"codeSnippetID":"c1","address":"a"}"#),
            Err(OptionsParseError::Json(_))
        ));
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let options = SessionOptions {
            session_id: "s1".to_string(),
            code_snippet_id: "c1".to_string(),
            address: "http://x/y".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&options).expect("options serialize"),
            r#"{"sessionID":"s1","codeSnippetID":"c1","address":"http://x/y"}"#
        );
    }
}
