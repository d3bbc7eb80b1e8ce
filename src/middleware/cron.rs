use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};

use crate::config;
use crate::error::ApiError;

/// Gate for the /internal/cron routes. The external scheduler authenticates
/// with a static bearer secret; an unconfigured secret fails closed.
pub async fn cron_secret_middleware(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    check_cron_auth(&headers, &config::config().security.cron_secret)?;
    Ok(next.run(request).await)
}

fn check_cron_auth(headers: &HeaderMap, expected: &str) -> Result<(), ApiError> {
    if expected.is_empty() {
        return Err(ApiError::service_unavailable(
            "Cron trigger secret not configured",
        ));
    }

    let presented = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::unauthorized("Missing cron trigger secret"))?;

    if presented != expected {
        tracing::warn!("Cron trigger rejected: wrong secret");
        return Err(ApiError::unauthorized("Invalid cron trigger secret"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn accepts_matching_secret() {
        let headers = headers_with("Bearer s3cret");
        assert!(check_cron_auth(&headers, "s3cret").is_ok());
    }

    #[test]
    fn rejects_wrong_secret_with_401() {
        let headers = headers_with("Bearer nope");
        let err = check_cron_auth(&headers, "s3cret").unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn rejects_missing_header_with_401() {
        let err = check_cron_auth(&HeaderMap::new(), "s3cret").unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn unconfigured_secret_fails_closed_with_503() {
        let headers = headers_with("Bearer anything");
        let err = check_cron_auth(&headers, "").unwrap_err();
        assert_eq!(err.status_code(), 503);
    }
}
