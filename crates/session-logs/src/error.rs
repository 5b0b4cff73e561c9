// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::header::InvalidHeaderValue;
use reqwest::StatusCode;
use std::fmt;

/// Step of a write that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Token,
    Options,
    Merge,
    Delivery,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Token => "token",
            Stage::Options => "options",
            Stage::Merge => "merge",
            Stage::Delivery => "delivery",
        };
        f.write_str(name)
    }
}

/// Failure of a single HTTP exchange.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status code {0}")]
    Status(StatusCode),

    #[error("mmds token is an empty string")]
    EmptyToken,

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
}

#[derive(Debug, thiserror::Error)]
pub enum OptionsParseError {
    #[error("mmds opts are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no '{0}' in mmds opts")]
    MissingField(&'static str),
}

/// Errors returned by [`crate::SessionLogForwarder::write`].
#[derive(Debug, thiserror::Error)]
pub enum ForwarderError {
    #[error("error getting mmds token: {0}")]
    TokenFetch(#[source] FetchError),

    #[error("error getting session logging options from mmds (token {token}): {source}")]
    OptionsFetch {
        token: String,
        #[source]
        source: FetchError,
    },

    #[error("error parsing session logging options from mmds: {0}")]
    OptionsParse(#[from] OptionsParseError),

    #[error("error parsing logs as a JSON object: {0}")]
    PayloadParse(#[source] serde_json::Error),

    #[error("error serializing logs with session logging options: {0}")]
    PayloadSerialize(#[source] serde_json::Error),

    #[error("error sending session logs to {address}: {source}")]
    Delivery {
        address: String,
        #[source]
        source: FetchError,
    },

    #[error("write cancelled during {stage} stage")]
    Cancelled { stage: Stage },
}

impl ForwarderError {
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::TokenFetch(_) => Stage::Token,
            Self::OptionsFetch { .. } | Self::OptionsParse(_) => Stage::Options,
            Self::PayloadParse(_) | Self::PayloadSerialize(_) => Stage::Merge,
            Self::Delivery { .. } => Stage::Delivery,
            Self::Cancelled { stage } => *stage,
        }
    }
}
