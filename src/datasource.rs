//! Error classification shared by registry datasources

use crate::http::HttpError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasourceError {
    /// Worth retrying later: network trouble, rate limiting, server errors
    #[error("Temporary failure looking up '{package}': {source}")]
    Transient { package: String, source: HttpError },

    /// Retrying will not help: bad response shape, client errors
    #[error("Lookup of '{package}' failed: {source}")]
    Permanent { package: String, source: HttpError },
}

impl DatasourceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, DatasourceError::Transient { .. })
    }
}

/// Classify a lookup failure that is not a plain "not found"
pub fn handle_generic_error(package: &str, err: HttpError) -> DatasourceError {
    let transient = match &err {
        HttpError::Transport { .. } => true,
        HttpError::Status { status, .. } => *status == 429 || *status >= 500,
        HttpError::Parse { .. } => false,
    };

    let package = package.to_string();
    if transient {
        DatasourceError::Transient {
            package,
            source: err,
        }
    } else {
        DatasourceError::Permanent {
            package,
            source: err,
        }
    }
}
