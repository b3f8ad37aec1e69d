use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

const PREFLIGHT_MAX_AGE_SECS: u64 = 86400;

/// Strict allow-list built from `CORS_ALLOWED_ORIGINS`; an origin outside it
/// gets no CORS headers at all.
pub fn create_cors_layer(raw_origins: &str) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins(raw_origins)))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([
            header::CONTENT_LENGTH,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(PREFLIGHT_MAX_AGE_SECS))
}

fn parse_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.trim_end_matches('/').parse::<HeaderValue>() {
            Ok(value) => {
                tracing::debug!("CORS: Allowing origin: {}", origin);
                Some(value)
            }
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect()
}

fn allowed_origins(raw: &str) -> Vec<HeaderValue> {
    let origins = parse_origins(raw);
    if origins.is_empty() {
        tracing::warn!("CORS: No valid origins configured, falling back to local defaults");
        return parse_origins(DEFAULT_ALLOWED_ORIGINS);
    }
    tracing::info!("CORS: Configured with {} allowed origin(s)", origins.len());
    origins
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_falls_back_to_defaults() {
        let origins = allowed_origins(" , ");
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "http://localhost:3000");
    }

    #[test]
    fn test_trailing_slash_is_normalized() {
        let origins = allowed_origins("https://events.example.com/");
        assert_eq!(origins, vec![HeaderValue::from_static("https://events.example.com")]);
    }

    #[test]
    fn test_create_cors_layer() {
        let _layer = create_cors_layer("https://events.example.com,http://localhost:3000");
    }
}
