//! Identity as asserted by the upstream auth layer.
//!
//! Session handling lives in front of this service; by the time a request
//! arrives the gateway has replaced any client-sent identity headers with
//! its own `X-Auth-User` / `X-Auth-Role`.

use {
    super::api_errors::ApiError,
    crate::domain::error::OrderError,
    axum::{extract::FromRequestParts, http::request::Parts},
};

pub const USER_HEADER: &str = "x-auth-user";
pub const ROLE_HEADER: &str = "x-auth-role";

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Any authenticated user.
#[derive(Debug, Clone)]
pub struct Buyer {
    pub id: String,
}

impl<S: Send + Sync> FromRequestParts<S> for Buyer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, USER_HEADER)
            .ok_or_else(|| OrderError::Unauthorized("authentication required".into()))?;
        Ok(Self { id: id.to_string() })
    }
}

/// Authenticated user holding the `staff` or `admin` role.
#[derive(Debug, Clone)]
pub struct Staff {
    pub id: String,
}

impl Staff {
    pub fn actor(&self) -> String {
        format!("staff:{}", self.id)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Staff {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, USER_HEADER)
            .ok_or_else(|| OrderError::Unauthorized("authentication required".into()))?;
        match header(parts, ROLE_HEADER) {
            Some(role) if role.eq_ignore_ascii_case("staff") || role.eq_ignore_ascii_case("admin") => {
                Ok(Self { id: id.to_string() })
            }
            _ => {
                tracing::warn!(user = %id, "staff endpoint denied");
                Err(OrderError::Forbidden("staff role required".into()).into())
            }
        }
    }
}
