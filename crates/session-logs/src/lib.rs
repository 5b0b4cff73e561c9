// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Session log forwarding.
//!
//! Every batch of JSON logs handed to [`SessionLogForwarder::write`] goes
//! through the same straight-line sequence:
//!
//! ```text
//!   PUT  /latest/api/token      (MMDS)  -> token
//!   GET  /                      (MMDS)  -> { sessionID, codeSnippetID, address }
//!   merge sessionID + codeSnippetID into the log object
//!   POST <address>                      -> delivered
//! ```
//!
//! Nothing is cached between calls and the first failing step aborts the
//! write. Retry policy, if any, belongs to the caller.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod error;
pub mod forwarder;
pub mod http;
pub mod logger;
pub mod mmds;
pub mod payload;
pub mod sink;

pub use config::Config;
pub use error::{FetchError, ForwarderError, OptionsParseError, Stage};
pub use forwarder::SessionLogForwarder;
pub use mmds::SessionOptions;
