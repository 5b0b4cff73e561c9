// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Enriches a JSON log batch with session metadata and ships it.
//!
//! A write is four steps, each aborting the rest on failure:
//!
//! 1. fetch an MMDS token
//! 2. fetch the session options with that token
//! 3. merge `sessionID` and `codeSnippetID` into the log object
//! 4. POST the merged object to the address found in the options
//!
//! Nothing survives a write except the pooled HTTP client, so a single
//! forwarder can be cloned and used from many tasks at once.

use crate::config::Config;
use crate::error::{FetchError, ForwarderError, Stage};
use crate::http::get_client;
use crate::mmds::MmdsClient;
use crate::payload::merge_session_options;
use reqwest::header::CONTENT_TYPE;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct SessionLogForwarder {
    client: reqwest::Client,
    mmds: MmdsClient,
    strict_delivery_status: bool,
}

impl SessionLogForwarder {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_client(get_client(config), config)
    }

    /// Builds a forwarder around an existing client. The client's own
    /// timeout applies to every request.
    #[must_use]
    pub fn with_client(client: reqwest::Client, config: &Config) -> Self {
        SessionLogForwarder {
            mmds: MmdsClient::new(client.clone(), config),
            client,
            strict_delivery_status: config.strict_delivery_status,
        }
    }

    /// Ships one JSON log object and returns the number of bytes sent, which
    /// includes the injected session fields.
    pub async fn write(&self, logs: &[u8]) -> Result<usize, ForwarderError> {
        self.write_inner(logs, None).await
    }

    /// Like [`write`](Self::write), but gives up as soon as `cancel` fires.
    pub async fn write_with_cancel(
        &self,
        logs: &[u8],
        cancel: &CancellationToken,
    ) -> Result<usize, ForwarderError> {
        self.write_inner(logs, Some(cancel)).await
    }

    async fn write_inner(
        &self,
        logs: &[u8],
        cancel: Option<&CancellationToken>,
    ) -> Result<usize, ForwarderError> {
        let result = self.run(logs, cancel).await;
        if let Err(e) = &result {
            error!(stage = %e.stage(), "SESSION LOGS | {}", e);
        }
        result
    }

    async fn run(
        &self,
        logs: &[u8],
        cancel: Option<&CancellationToken>,
    ) -> Result<usize, ForwarderError> {
        let token = guard(Stage::Token, cancel, async {
            self.mmds
                .fetch_token()
                .await
                .map_err(ForwarderError::TokenFetch)
        })
        .await?;

        let options = guard(Stage::Options, cancel, self.mmds.fetch_options(&token)).await?;

        info!(
            session_id = %options.session_id,
            code_snippet_id = %options.code_snippet_id,
            address = %options.address,
            "SESSION LOGS | Logs identification"
        );

        let payload = guard(Stage::Merge, cancel, async {
            merge_session_options(logs, &options)
        })
        .await?;
        let sent = payload.len();

        guard(Stage::Delivery, cancel, async {
            self.send_session_logs(payload, &options.address)
                .await
                .map_err(|source| ForwarderError::Delivery {
                    address: options.address.clone(),
                    source,
                })
        })
        .await?;

        Ok(sent)
    }

    async fn send_session_logs(&self, logs: Vec<u8>, address: &str) -> Result<(), FetchError> {
        info!("SESSION LOGS | Sending session logs");

        let response = self
            .client
            .post(address)
            .header(CONTENT_TYPE, "application/json")
            .body(logs)
            .send()
            .await?;

        let status = response.status();
        // Drain so the connection can go back to the pool.
        response.bytes().await?;

        if !status.is_success() {
            if self.strict_delivery_status {
                return Err(FetchError::Status(status));
            }
            warn!(
                "SESSION LOGS | Session logs endpoint responded with {}",
                status
            );
        }

        info!("SESSION LOGS | Session logs sent");
        Ok(())
    }
}

async fn guard<T, F>(
    stage: Stage,
    cancel: Option<&CancellationToken>,
    step: F,
) -> Result<T, ForwarderError>
where
    F: Future<Output = Result<T, ForwarderError>>,
{
    let Some(cancel) = cancel else {
        return step.await;
    };

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ForwarderError::Cancelled { stage }),
        result = step => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[tokio::test]
    async fn test_guard_without_cancel_runs_step() {
        let result = guard(Stage::Merge, None, async { Ok::<_, ForwarderError>(7) }).await;
        assert_eq!(result.expect("step runs"), 7);
    }

    #[tokio::test]
    async fn test_guard_prefers_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = guard(Stage::Options, Some(&cancel), async {
            Ok::<_, ForwarderError>(7)
        })
        .await;
        assert!(matches!(
            result,
            Err(ForwarderError::Cancelled {
                stage: Stage::Options
            })
        ));
    }

    #[tokio::test]
    async fn test_guard_passes_step_errors_through() {
        let cancel = CancellationToken::new();
        let result: Result<(), _> = guard(Stage::Token, Some(&cancel), async {
            Err(ForwarderError::TokenFetch(FetchError::EmptyToken))
        })
        .await;
        assert!(matches!(
            result,
            Err(ForwarderError::TokenFetch(FetchError::EmptyToken))
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failed_write_is_logged_with_stage() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("PUT", "/latest/api/token")
            .with_status(200)
            .with_body("")
            .create_async()
            .await;

        let forwarder = SessionLogForwarder::new(&Config {
            mmds_address: server.host_with_port(),
            ..Default::default()
        });
        assert!(forwarder.write(b"{}").await.is_err());

        assert!(logs_contain(
            "SESSION LOGS | error getting mmds token: mmds token is an empty string"
        ));
        assert!(logs_contain("stage=token"));
    }

    #[test]
    fn test_forwarder_is_shareable() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<SessionLogForwarder>();
    }
}
