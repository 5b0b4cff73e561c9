// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::io::{self, BufRead, Write};
use std::thread;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use session_logs::{
    config::{Config, DEFAULT_LOG_LEVEL},
    logger::Formatter,
    sink,
    SessionLogForwarder,
};

#[tokio::main]
pub async fn main() {
    let config = Config::from_env();

    let log_level = config
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_writer(std::io::stderr)
        .event_format(Formatter)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match config {
        Ok(c) => c,
        Err(e) => {
            error!("Error reading session log forwarder configuration: {e}");
            return;
        }
    };

    info!(
        "Forwarding stdin to session logs using MMDS at {}",
        config.mmds_address
    );

    let (sink, worker) = sink::channel(SessionLogForwarder::new(&config));
    let cancel = CancellationToken::new();
    let mut worker_handle = tokio::spawn(worker.run(cancel.clone()));

    // Blocking stdin reads stay off the runtime so an interrupt can end the
    // process without waiting for the next line.
    if let Err(e) = thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || forward_lines(io::stdin().lock(), sink))
    {
        error!("Unable to start stdin reader: {e}");
        cancel.cancel();
    }

    tokio::select! {
        result = &mut worker_handle => {
            if let Err(e) = result {
                error!("Session log worker failed: {e}");
            }
            debug!("stdin closed, queued logs drained");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping session log forwarder");
            cancel.cancel();
            if let Err(e) = worker_handle.await {
                error!("Session log worker failed: {e}");
            }
        }
    }
}

/// Queues each non-empty line of `reader` on `sink` until EOF, a read error,
/// or the sink closing.
fn forward_lines<R: BufRead, W: Write>(reader: R, mut sink: W) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Error reading stdin: {e}");
                return;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Err(e) = sink.write_all(line.as_bytes()) {
            error!("Unable to queue logs: {e}");
            return;
        }
    }
}
