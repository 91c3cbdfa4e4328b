//! HTTP basic auth for the protocol endpoints
//!
//! When credentials are configured, every protocol request must carry a
//! matching `Authorization: Basic ...` header. The check runs as route
//! middleware, before the request body is read. `OPTIONS` requests are let
//! through unchecked.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::warn;

use crate::config::BasicAuthConfig;
use crate::AppState;

/// Challenge sent with every 401
pub const WWW_AUTHENTICATE_CHALLENGE: &str = r#"Basic realm="simplejson""#;

/// Middleware rejecting requests without the configured credentials
pub async fn require_basic_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let Some(expected) = state.config.basic_auth.as_ref() else {
        return next.run(request).await;
    };

    if credentials_match(request.headers().get(header::AUTHORIZATION), expected) {
        next.run(request).await
    } else {
        warn!("Rejected unauthenticated request to {}", request.uri().path());
        unauthorized()
    }
}

/// Check an `Authorization` header against the expected credentials
pub fn credentials_match(header: Option<&HeaderValue>, expected: &BasicAuthConfig) -> bool {
    let Some(value) = header.and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let Some((scheme, encoded)) = value.split_once(' ') else {
        return false;
    };
    if !scheme.eq_ignore_ascii_case("basic") {
        return false;
    }

    let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
        return false;
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return false;
    };

    match decoded.split_once(':') {
        Some((username, password)) => {
            username == expected.username && password == expected.password
        }
        None => false,
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, WWW_AUTHENTICATE_CHALLENGE)],
        "401 Unauthorized\n",
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(raw: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Basic {}", STANDARD.encode(raw))).unwrap()
    }

    #[test]
    fn test_matching_credentials() {
        let expected = BasicAuthConfig::new("grafana", "s3cret");
        assert!(credentials_match(Some(&basic("grafana:s3cret")), &expected));
    }

    #[test]
    fn test_password_may_contain_colons() {
        let expected = BasicAuthConfig::new("grafana", "a:b:c");
        assert!(credentials_match(Some(&basic("grafana:a:b:c")), &expected));
    }

    #[test]
    fn test_rejects_bad_credentials() {
        let expected = BasicAuthConfig::new("grafana", "s3cret");

        assert!(!credentials_match(None, &expected));
        assert!(!credentials_match(Some(&basic("grafana:wrong")), &expected));
        assert!(!credentials_match(Some(&basic("grafana")), &expected));
        assert!(!credentials_match(
            Some(&HeaderValue::from_static("Basic !!notbase64!!")),
            &expected
        ));
        assert!(!credentials_match(
            Some(&HeaderValue::from_static("Bearer abc")),
            &expected
        ));
    }
}
