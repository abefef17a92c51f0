use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:8000";

const PREFLIGHT_MAX_AGE_SECS: u64 = 86400;

/// CORS for the JSON API. `origins_str` is a comma separated origin list,
/// normally `Config::cors_allowed_origins`.
pub fn create_cors_layer(origins_str: &str) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origins(origins_str))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([header::CONTENT_LENGTH, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(PREFLIGHT_MAX_AGE_SECS))
}

fn parse_origins(origins_str: &str) -> Vec<HeaderValue> {
    origins_str
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => {
                tracing::debug!(origin, "CORS: allowing origin");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(origin, error = %e, "CORS: ignoring invalid origin");
                None
            }
        })
        .collect()
}

fn allowed_origins(origins_str: &str) -> AllowOrigin {
    let origins = parse_origins(origins_str);
    if origins.is_empty() {
        tracing::warn!("CORS: no valid origins configured, allowing any origin");
        AllowOrigin::any()
    } else {
        tracing::info!(count = origins.len(), "CORS: configured allowed origins");
        AllowOrigin::list(origins)
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use axum::body::Body;
    use axum::http::{Request, Response};
    use tower::{service_fn, Layer, ServiceExt};

    use super::*;

    async fn allow_origin_for(origins_str: &str, origin: &'static str) -> Option<HeaderValue> {
        let inner = service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>(Response::new(Body::empty()))
        });
        let service = create_cors_layer(origins_str).layer(inner);
        let request = Request::builder()
            .uri("/api/events")
            .header(header::ORIGIN, origin)
            .body(Body::empty())
            .unwrap();
        let response = service.oneshot(request).await.unwrap();
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .cloned()
    }

    #[test]
    fn test_default_origins_are_valid() {
        assert_eq!(parse_origins(DEFAULT_ALLOWED_ORIGINS).len(), 2);
    }

    #[test]
    fn test_parse_origins_skips_blanks_and_garbage() {
        let origins = parse_origins(" https://tickets.example.com , ,bad\norigin");
        assert_eq!(origins, vec![HeaderValue::from_static("https://tickets.example.com")]);
    }

    #[tokio::test]
    async fn test_configured_origin_is_allowed() {
        let allowed = allow_origin_for("https://tickets.example.com", "https://tickets.example.com")
            .await;
        assert_eq!(
            allowed,
            Some(HeaderValue::from_static("https://tickets.example.com"))
        );
    }

    #[tokio::test]
    async fn test_unlisted_origin_is_not_allowed() {
        let allowed = allow_origin_for("https://tickets.example.com", "https://evil.example").await;
        assert!(allowed.is_none());
    }
}
