//! HTTP error responses
//!
//! Every failure is written as a single plain-text body. The status code
//! depends on the error and, for datasource failures, on the endpoint:
//! `/query` reports them as 500 while the other endpoints report 400.
//! Existing clients rely on both codes, so the split is kept as-is.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use simplejson_core::SimpleJsonError;
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

/// Protocol endpoints that can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Query,
    Annotations,
    Search,
    TagKeys,
    TagValues,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Query => "/query",
            Endpoint::Annotations => "/annotations",
            Endpoint::Search => "/search",
            Endpoint::TagKeys => "/tag-keys",
            Endpoint::TagValues => "/tag-values",
        }
    }

    fn datasource_failure_status(&self) -> StatusCode {
        match self {
            Endpoint::Query => StatusCode::INTERNAL_SERVER_ERROR,
            Endpoint::Annotations | Endpoint::Search | Endpoint::TagKeys | Endpoint::TagValues => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A request failure on a specific endpoint
#[derive(Debug, Error)]
#[error("{endpoint}: {source}")]
pub struct ApiError {
    pub endpoint: Endpoint,
    #[source]
    pub source: SimpleJsonError,
}

impl ApiError {
    pub fn new(endpoint: Endpoint, source: SimpleJsonError) -> Self {
        Self { endpoint, source }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        if self.source.is_client_error() {
            return StatusCode::BAD_REQUEST;
        }
        match &self.source {
            SimpleJsonError::Datasource(_) => self.endpoint.datasource_failure_status(),
            SimpleJsonError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(
                endpoint = %self.endpoint,
                category = self.source.category(),
                "Request failed: {}",
                self.source
            );
        } else {
            warn!(
                endpoint = %self.endpoint,
                category = self.source.category(),
                "Rejected request: {}",
                self.source
            );
        }

        (status, self.source.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(endpoint: Endpoint, err: SimpleJsonError) -> StatusCode {
        ApiError::new(endpoint, err).status_code()
    }

    #[test]
    fn test_datasource_failures_differ_by_endpoint() {
        assert_eq!(
            status(Endpoint::Query, SimpleJsonError::datasource("down")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        for endpoint in [
            Endpoint::Annotations,
            Endpoint::Search,
            Endpoint::TagKeys,
            Endpoint::TagValues,
        ] {
            assert_eq!(
                status(endpoint, SimpleJsonError::datasource("down")),
                StatusCode::BAD_REQUEST
            );
        }
    }

    #[test]
    fn test_client_and_table_errors() {
        assert_eq!(
            status(Endpoint::Query, SimpleJsonError::decode("bad body")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(Endpoint::Query, SimpleJsonError::UnknownTargetKind("bogus".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(
                Endpoint::Query,
                SimpleJsonError::ColumnLengthMismatch {
                    column: "Value".into(),
                    expected: 3,
                    actual: 2
                }
            ),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(Endpoint::Search, SimpleJsonError::NotImplemented("search")),
            StatusCode::NOT_IMPLEMENTED
        );
    }
}
