//! Maps a failed response's remote error code to an `ApiError` kind.

use crate::error::{ApiError, ErrorDetails};
use crate::types::ErrorBody;

pub const RATE_LIMIT_CODE: i64 = 2300;
pub const PERMISSION_CODES: std::ops::RangeInclusive<i64> = 1100..=1108;
/// Precondition failure on an auto-dispatch operation.
pub const AUTO_DISPATCH_PRECONDITION_CODE: i64 = 2218;
pub const SERVICE_CODE_FLOOR: i64 = 2500;

/// Classify an error payload. First match wins.
pub fn classify(status: u16, body: ErrorBody) -> ApiError {
    let details = ErrorDetails {
        status,
        code: body.error,
        message: body.message,
        cause: body.cause,
        request: body.request,
    };
    match details.code {
        RATE_LIMIT_CODE => ApiError::RateLimit(details),
        code if PERMISSION_CODES.contains(&code) => ApiError::Permission(details),
        AUTO_DISPATCH_PRECONDITION_CODE => ApiError::Service(details),
        code if code >= SERVICE_CODE_FLOOR => ApiError::Service(details),
        _ => ApiError::Http(details),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(code: i64) -> ErrorBody {
        ErrorBody {
            error: code,
            message: format!("error {code}"),
            cause: Some(json!({"field": "notes"})),
            request: Some("f3c1e0d2-1111-2222-3333-444455556666".to_string()),
        }
    }

    #[test]
    fn rate_limit() {
        assert!(matches!(classify(429, body(2300)), ApiError::RateLimit(_)));
    }

    #[test]
    fn permission_range_is_inclusive() {
        for code in [1100, 1104, 1108] {
            assert!(matches!(classify(403, body(code)), ApiError::Permission(_)), "{code}");
        }
        assert!(matches!(classify(400, body(1099)), ApiError::Http(_)));
        assert!(matches!(classify(400, body(1109)), ApiError::Http(_)));
    }

    #[test]
    fn service_codes() {
        assert!(matches!(classify(400, body(2218)), ApiError::Service(_)));
        assert!(matches!(classify(500, body(2500)), ApiError::Service(_)));
        assert!(matches!(classify(500, body(2600)), ApiError::Service(_)));
        assert!(matches!(classify(400, body(2499)), ApiError::Http(_)));
    }

    #[test]
    fn details_are_carried_through() {
        let err = classify(404, body(1402));
        let details = err.details().unwrap();
        assert_eq!(details.status, 404);
        assert_eq!(details.code, 1402);
        assert_eq!(details.message, "error 1402");
        assert_eq!(details.cause, Some(json!({"field": "notes"})));
        assert_eq!(details.request.as_deref(), Some("f3c1e0d2-1111-2222-3333-444455556666"));
    }
}
