//! Connectivity checks.

use crate::address::HttpHost;
use crate::error::{ElasticsearchError, Result};
use std::time::Duration;
use tracing::debug;

/// Attempts made by [`assert_connection_possible`].
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

const RETRY_PAUSE: Duration = Duration::from_millis(250);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Fail unless `GET /` on `address` answers with a success status.
pub async fn assert_connection_possible(address: &HttpHost) -> Result<()> {
    assert_connection_possible_with(address, DEFAULT_MAX_ATTEMPTS).await
}

/// Like [`assert_connection_possible`], trying up to `max_attempts` times
/// (at least once) with a short pause between attempts.
///
/// # Errors
///
/// [`ElasticsearchError::ConnectionRefused`] once every attempt failed; its
/// message reads `Couldn't connect to Elasticsearch at [<address>]`.
pub async fn assert_connection_possible_with(address: &HttpHost, max_attempts: u32) -> Result<()> {
    let url = address.url()?;
    let client = reqwest::Client::builder()
        .connect_timeout(PROBE_TIMEOUT)
        .timeout(PROBE_TIMEOUT)
        .build()?;

    let attempts = max_attempts.max(1);
    for attempt in 1..=attempts {
        match client.get(url.clone()).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Connected to {} on attempt {}", address, attempt);
                return Ok(());
            }
            Ok(response) => {
                debug!(
                    "Attempt {}/{} on {}: status {}",
                    attempt,
                    attempts,
                    address,
                    response.status()
                );
            }
            Err(e) => {
                debug!("Attempt {}/{} on {}: {}", attempt, attempts, address, e);
            }
        }

        if attempt < attempts {
            tokio::time::sleep(RETRY_PAUSE).await;
        }
    }

    Err(ElasticsearchError::ConnectionRefused {
        address: address.to_string(),
    })
}
