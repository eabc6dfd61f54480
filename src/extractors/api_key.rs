//! Extract the API key from the `X-API-KEY` header.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Optional, trimmed API key; empty values count as missing.
#[derive(Clone, Debug)]
pub struct ApiKey(pub Option<String>);

impl ApiKey {
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        let value = headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        ApiKey(value)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ApiKey
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
