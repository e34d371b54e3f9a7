//! HTTP retry helper for transient errors.
//!
//! Every Frost request goes through [`send_json`]. Connection failures,
//! timeouts, HTTP 429 and HTTP 5xx are retried with exponential backoff
//! (2s, 4s, 8s, ...) up to a bounded number of attempts. Other 4xx
//! responses are permanent and fail immediately.
//!
//! ```ignore
//! let body = retry::send_json(|| client.get(&url).query(&params), 4).await?;
//! ```

use std::time::Duration;

use crate::WeatherError;

/// Maximum length of the response body preview included in errors.
const BODY_PREVIEW_LEN: usize = 300;

/// Sends an HTTP request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`], since builders are consumed by
/// `.send()`.
///
/// # Errors
///
/// * [`WeatherError::Http`] if the request fails after all retries
/// * [`WeatherError::Service`] on a non-retryable status or when retries
///   are exhausted on 429/5xx
/// * [`WeatherError::Json`] if the body is not valid JSON
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(build_request: F, max_retries: u32) -> Result<serde_json::Value, WeatherError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request, max_retries).await?;
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

/// Core retry loop. Returns the successful [`reqwest::Response`].
#[allow(clippy::future_not_send)]
async fn send_inner<F>(
    build_request: &F,
    max_retries: u32,
) -> Result<reqwest::Response, WeatherError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_error: Option<WeatherError> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = backoff_delay(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    last_error = Some(WeatherError::Http(e));
                    continue;
                }
                return Err(WeatherError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                if is_retryable_status(status) {
                    if attempt < max_retries {
                        log::warn!("  HTTP {status} (retryable)");
                        last_error = Some(WeatherError::Service {
                            message: format!("HTTP {status}"),
                        });
                        continue;
                    }
                    return Err(WeatherError::Service {
                        message: format!("HTTP {status} after {max_retries} retries"),
                    });
                }

                if status.is_client_error() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(WeatherError::Service {
                        message: format!("HTTP {status}: {}", error_reason(&body)),
                    });
                }

                return Ok(response);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| WeatherError::Service {
        message: "request failed after all retries".to_string(),
    }))
}

/// Exponential backoff delay before retry number `attempt` (1-based).
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(6))
}

/// Returns `true` for statuses worth retrying (429 and 5xx).
fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

/// Extracts the human-readable reason from a Frost error body
/// (`{"error": {"message": ..., "reason": ...}}`), falling back to a
/// truncated preview of the raw body.
fn error_reason(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            let error = v.get("error")?;
            let reason = error
                .get("reason")
                .or_else(|| error.get("message"))?
                .as_str()?;
            Some(reason.to_string())
        })
        .unwrap_or_else(|| body.chars().take(BODY_PREVIEW_LEN).collect())
}
