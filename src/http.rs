use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};

/// Timeouts and retry budget for fetching a remote manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub attempts: usize,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            read_timeout: Duration::from_secs(10),
            attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

fn should_retry_http_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

pub(crate) fn is_remote(source: &str) -> bool {
    let lower = source.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// GET `url` as text, retrying 408/429/5xx responses and transport errors.
pub(crate) fn get_text_with_retries(url: &str, policy: &RetryPolicy) -> Result<String> {
    let attempts = policy.attempts.max(1);
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(policy.connect_timeout)
        .timeout_read(policy.read_timeout)
        .timeout_write(policy.read_timeout)
        .build();

    for attempt in 1..=attempts {
        match agent
            .get(url)
            .set("Accept", "application/json")
            .call()
        {
            Ok(response) => {
                return response
                    .into_string()
                    .map_err(|err| anyhow!("GET {url}: response decode failed: {err}"));
            }
            Err(ureq::Error::Status(status, response)) => {
                let response_body = response.into_string().ok().unwrap_or_default();
                let body = response_body.trim();
                let status_error = if body.is_empty() {
                    format!("HTTP status {status}")
                } else {
                    let truncated = body.chars().take(240).collect::<String>();
                    format!("HTTP status {status} ({truncated})")
                };

                if !should_retry_http_status(status) {
                    bail!("GET {url}: {status_error}");
                }
                if attempt == attempts {
                    bail!("GET {url} failed after {attempts} attempt(s): {status_error}");
                }
                tracing::debug!(attempt, status, url, "retrying manifest fetch");
            }
            Err(ureq::Error::Transport(err)) => {
                if attempt == attempts {
                    bail!("GET {url} failed after {attempts} attempt(s): transport error: {err}");
                }
                tracing::debug!(attempt, %err, url, "retrying manifest fetch");
            }
        }
        thread::sleep(policy.retry_delay);
    }

    bail!("GET {url}: exhausted attempts without a concrete error")
}
