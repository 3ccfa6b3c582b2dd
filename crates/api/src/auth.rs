//! Caller identity.
//!
//! Authentication happens upstream; the gateway forwards the verified user
//! identifier in the `X-User-Id` header.

use axum::http::HeaderMap;
use common::UserId;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Extracts the authenticated user from the request headers.
pub fn user_id(headers: &HeaderMap) -> Result<UserId, ApiError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    raw.to_str()
        .ok()
        .and_then(|v| v.parse::<UserId>().ok())
        .filter(|id| id.get() > 0)
        .ok_or_else(|| ApiError::Unauthorized("Invalid user identity".to_string()))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_valid_header() {
        assert_eq!(user_id(&headers(" 42 ")).unwrap(), UserId::new(42));
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            user_id(&HeaderMap::new()),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_malformed_or_non_positive() {
        for value in ["abc", "0", "-3", "1.5"] {
            assert!(
                matches!(user_id(&headers(value)), Err(ApiError::Unauthorized(_))),
                "{value}"
            );
        }
    }
}
