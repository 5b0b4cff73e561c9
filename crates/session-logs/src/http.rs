// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP client construction.
//!
//! One `reqwest::Client` is built per forwarder and shared by every write,
//! so concurrent writes reuse the same connection pool.
//!
//! # Client settings
//!
//! - **Timeout**: `Config::timeout` bounds each of the three requests of a
//!   write (token, options, delivery) independently
//! - **No proxy**: the metadata service is on a link-local address, so
//!   `HTTP_PROXY`/`HTTPS_PROXY` from the environment are ignored
//! - **Pooling**: idle connections are kept for 270s with a 120s TCP
//!   keep-alive
//! - **HTTP/1**: MMDS does not speak h2c, so prior-knowledge HTTP/2 is never
//!   forced; TLS delivery endpoints may still negotiate HTTP/2 through ALPN
//!
//! # TLS
//!
//! rustls is always used. With the `fips` feature the builder is handed a
//! preconfigured rustls config that must come from a FIPS crypto provider
//! and the native root store; building fails otherwise and [`get_client`]
//! falls back to a plain client, logging why.
//!
//! ```rust,ignore
//! let client = session_logs::http::get_client(&config);
//! let forwarder = SessionLogForwarder::with_client(client, &config);
//! ```

use crate::config::Config;
use core::time::Duration;
use reqwest::ClientBuilder;
use std::error::Error;
use tracing::error;
#[cfg(feature = "fips")]
use tracing::debug;

/// Builds the shared client, falling back to a default client (still with
/// the configured timeout) when the full builder fails.
#[must_use]
pub fn get_client(config: &Config) -> reqwest::Client {
    match build_client(config) {
        Ok(client) => client,
        Err(e) => {
            error!(
                "SESSION LOGS | Unable to build HTTP client: {}, falling back to reqwest defaults",
                e
            );
            match reqwest::Client::builder()
                .timeout(config.timeout)
                .no_proxy()
                .build()
            {
                Ok(client) => client,
                Err(inner) => {
                    error!(
                        "SESSION LOGS | Failed to build fallback HTTP client: {}",
                        inner
                    );
                    reqwest::Client::new()
                }
            }
        }
    }
}

fn build_client(config: &Config) -> Result<reqwest::Client, Box<dyn Error>> {
    let client = create_reqwest_client_builder()?
        .timeout(config.timeout)
        .no_proxy()
        .pool_idle_timeout(Some(Duration::from_secs(270)))
        .tcp_keepalive(Some(Duration::from_secs(120)));

    Ok(client.build()?)
}

/// Creates a reqwest client builder with rustls TLS.
#[cfg(not(feature = "fips"))]
pub fn create_reqwest_client_builder() -> Result<ClientBuilder, Box<dyn Error>> {
    Ok(reqwest::Client::builder().use_rustls_tls())
}

/// Creates a reqwest client builder with a FIPS-compliant TLS configuration.
///
/// The process must install a FIPS crypto provider before the first client is
/// built, e.g. `rustls::crypto::default_fips_provider().install_default()`.
#[cfg(feature = "fips")]
pub fn create_reqwest_client_builder() -> Result<ClientBuilder, Box<dyn Error>> {
    let provider =
        rustls::crypto::CryptoProvider::get_default().ok_or("No crypto provider configured")?;

    if !provider.fips() {
        return Err("Crypto provider is not FIPS-compliant".into());
    }

    let mut root_cert_store = rustls::RootCertStore::empty();
    let native_certs = rustls_native_certs::load_native_certs();
    let mut valid_count = 0;
    for cert in native_certs.certs {
        match root_cert_store.add(cert) {
            Ok(()) => valid_count += 1,
            Err(err) => {
                debug!("Failed to parse certificate: {:?}", err);
            }
        }
    }
    if valid_count == 0 {
        return Err("No valid certificates found in native root store".into());
    }

    let versions = rustls::ALL_VERSIONS.to_vec();
    let tls_config = rustls::ClientConfig::builder_with_provider(provider.clone())
        .with_protocol_versions(&versions)
        .map_err(|_| "Failed to set protocol versions")?
        .with_root_certificates(root_cert_store)
        .with_no_client_auth();

    if !tls_config.fips() {
        return Err("The final TLS configuration is not FIPS-compliant".into());
    }
    debug!("Client builder is configured with FIPS.");

    Ok(reqwest::Client::builder().use_preconfigured_tls(tls_config))
}
