//! Extract the authenticated owner from the request (X-Owner-ID header set by the upstream authenticator).

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Header name for the owner id. Default: `X-Owner-ID`.
pub const OWNER_ID_HEADER: &str = "X-Owner-ID";

/// Optional owner id; operations that need one reject its absence with `Unauthorized`.
#[derive(Clone, Debug)]
pub struct OwnerId(pub Option<String>);

impl OwnerId {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(OWNER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Ok(OwnerId(value))
    }
}
