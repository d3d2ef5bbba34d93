//! Default rejection responses and rate limit headers.

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::ratelimit::Decision;

/// Whole seconds until the caller's window resets.
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// `429 {"error": "Rate limit exceeded"}`
pub fn rate_limit_exceeded() -> Response {
    error_response(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded")
}

/// `400 {"error": "Header value is missing"}`
pub fn header_missing() -> Response {
    error_response(StatusCode::BAD_REQUEST, "Header value is missing")
}

/// `400 {"error": "Header value does not match required pattern"}`
pub fn header_mismatch() -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        "Header value does not match required pattern",
    )
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Add `X-RateLimit-Remaining` to a response.
pub fn add_remaining_header(response: &mut Response, decision: &Decision) {
    response.headers_mut().insert(
        HeaderName::from_static(X_RATELIMIT_REMAINING),
        HeaderValue::from(decision.reset_after.as_secs()),
    );
}

/// Add `Retry-After` to a rejection unless the rejection set its own.
pub fn add_retry_after(response: &mut Response, decision: &Decision) {
    let retry_after = decision.reset_after.as_secs().max(1);
    response
        .headers_mut()
        .entry(header::RETRY_AFTER)
        .or_insert_with(|| HeaderValue::from(retry_after));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn decision(reset_after: Duration) -> Decision {
        Decision {
            allowed: false,
            count: 4,
            limit: 3,
            reset_after,
        }
    }

    #[test]
    fn test_default_statuses() {
        assert_eq!(rate_limit_exceeded().status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(header_missing().status(), StatusCode::BAD_REQUEST);
        assert_eq!(header_mismatch().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_remaining_header_truncates() {
        let mut response = rate_limit_exceeded();
        add_remaining_header(&mut response, &decision(Duration::from_millis(59_900)));
        assert_eq!(response.headers()[X_RATELIMIT_REMAINING], "59");
    }

    #[test]
    fn test_retry_after_has_floor_and_keeps_existing() {
        let mut response = rate_limit_exceeded();
        add_retry_after(&mut response, &decision(Duration::from_millis(200)));
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");

        add_retry_after(&mut response, &decision(Duration::from_secs(30)));
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    }
}
