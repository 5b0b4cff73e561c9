// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Human-readable formatter for the forwarder's own diagnostics.
//!
//! Shipped session logs go out as JSON through [`crate::sink`]; this
//! formatter is for what the forwarder itself writes to stderr, so its lines
//! can be told apart from the application's output.
//!
//! # Format
//!
//! ```text
//! SESSION_LOGS | LEVEL | [span_name{span_fields}:] message {event_fields}
//! ```
//!
//! # Examples
//!
//! ```text
//! SESSION_LOGS | INFO | SESSION LOGS | Retrieving MMDS token
//! SESSION_LOGS | ERROR | stage=token SESSION LOGS | error getting mmds token: mmds token is an empty string
//! SESSION_LOGS | WARN | SESSION LOGS | Session logs endpoint responded with 500 Internal Server Error
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use session_logs::logger::Formatter;
//!
//! let subscriber = tracing_subscriber::fmt::Subscriber::builder()
//!     .with_writer(std::io::stderr)
//!     .event_format(Formatter)
//!     .finish();
//!
//! tracing::subscriber::set_global_default(subscriber)?;
//! ```
//!
//! Spans are printed outermost first, each followed by its recorded fields
//! when it has any.

use std::fmt;
use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::registry::LookupSpan;

/// Prefixes every event with `SESSION_LOGS` and its level.
#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(&mut writer, "SESSION_LOGS | {} | ", metadata.level())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;

                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}
