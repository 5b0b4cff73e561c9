// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bridge between `tracing` and the forwarder.
//!
//! [`SessionLogSink`] is a blocking `io::Write` that a JSON `fmt` layer can
//! write to. Each formatted event is queued as-is and a [`SessionLogWorker`]
//! ships the queue one event at a time.
//!
//! ```rust,ignore
//! let (sink, worker) = session_logs::sink::channel(SessionLogForwarder::new(&config));
//! tokio::spawn(worker.run(cancel.clone()));
//!
//! tracing_subscriber::registry()
//!     .with(session_logs::sink::session_layer(sink))
//!     .init();
//! ```

use crate::forwarder::SessionLogForwarder;
use std::io;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_core::Subscriber;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Targets whose events must never reach the sink, since shipping them
/// would emit more of them.
const FORWARDING_TARGETS: [&str; 8] = [
    "session_logs",
    "reqwest",
    "hyper",
    "hyper_util",
    "h2",
    "rustls",
    "tokio",
    "mio",
];

#[derive(Debug, Clone)]
pub struct SessionLogSink {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl io::Write for SessionLogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx.send(buf.to_vec()).map_err(|_| {
            io::Error::new(io::ErrorKind::BrokenPipe, "session log worker stopped")
        })?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for SessionLogSink {
    type Writer = SessionLogSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

pub struct SessionLogWorker {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    forwarder: SessionLogForwarder,
}

#[must_use]
pub fn channel(forwarder: SessionLogForwarder) -> (SessionLogSink, SessionLogWorker) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SessionLogSink { tx }, SessionLogWorker { rx, forwarder })
}

impl SessionLogWorker {
    /// Ships queued events until `cancel` fires or every sink is dropped and
    /// the queue is empty. A failed event is dropped; the forwarder has
    /// already logged why.
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            let logs = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                logs = self.rx.recv() => match logs {
                    Some(logs) => logs,
                    None => break,
                },
            };

            if let Err(e) = self.forwarder.write_with_cancel(&logs, &cancel).await {
                debug!("SESSION LOGS | Dropping {} bytes of logs: {}", logs.len(), e);
            }
        }
        debug!("SESSION LOGS | Worker stopped");
    }
}

/// JSON `fmt` layer writing one object per event to `sink`.
pub fn session_layer<S>(sink: SessionLogSink) -> impl Layer<S> + Send + Sync + 'static
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_writer(sink)
        .with_filter(filter_fn(|metadata| {
            !is_forwarding_target(metadata.target())
        }))
}

fn is_forwarding_target(target: &str) -> bool {
    FORWARDING_TARGETS.iter().any(|prefix| {
        target == *prefix
            || target
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with("::"))
    })
}
