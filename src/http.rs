//! HTTP access for registry lookups
//!
//! Registry clients depend on the `JsonFetch` trait rather than on `ureq`
//! directly so they can be exercised against canned responses.

use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Request to {url} failed with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Failed to parse response from {url}: {source}")]
    Parse {
        url: String,
        source: serde_json::Error,
    },
}

impl HttpError {
    /// HTTP status of the failed response, if the server answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}

/// Something that can GET a URL and hand back the response body
pub trait JsonFetch: Send + Sync {
    fn get(&self, url: &str) -> Result<String, HttpError>;
}

/// GET `url` and deserialize the body as `T`
///
/// An empty body is `Ok(None)`. A body that does not match `T` is a
/// `HttpError::Parse`.
pub fn fetch_json<T: DeserializeOwned>(
    http: &dyn JsonFetch,
    url: &str,
) -> Result<Option<T>, HttpError> {
    let body = http.get(url)?;
    if body.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&body)
        .map(Some)
        .map_err(|source| HttpError::Parse {
            url: url.to_string(),
            source,
        })
}

/// Join a base URL and a path without doubling or dropping the slash
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// `JsonFetch` over a shared `ureq` agent
pub struct UreqFetcher {
    agent: ureq::Agent,
    user_agent: String,
}

impl UreqFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        Self {
            agent,
            user_agent: user_agent.to_string(),
        }
    }
}

impl JsonFetch for UreqFetcher {
    fn get(&self, url: &str) -> Result<String, HttpError> {
        tracing::trace!(url, "GET");

        let response = self
            .agent
            .get(url)
            .header("User-Agent", self.user_agent.as_str())
            .header("Accept", "application/json")
            .call()
            .map_err(|e| match e {
                ureq::Error::StatusCode(status) => HttpError::Status {
                    url: url.to_string(),
                    status,
                },
                other => HttpError::Transport {
                    url: url.to_string(),
                    message: other.to_string(),
                },
            })?;

        response
            .into_body()
            .read_to_string()
            .map_err(|e| HttpError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}
