//! Caller identity forwarded by the upstream gateway.
//!
//! The gateway authenticates the caller and sets `x-user-id`, `x-user-role`
//! and, for franchise users, `x-team-id`. Handlers take [`Principal`] where
//! any signed-in caller may act and [`Admin`] where only the auctioneer may.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use serde::Serialize;

use crate::error::AppError;
use crate::types::Role;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ROLE_HEADER: &str = "x-user-role";
pub const TEAM_ID_HEADER: &str = "x-team-id";

#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
    /// Set for team users only.
    pub team_id: Option<i64>,
}

/// A principal with the admin role.
#[derive(Debug, Clone)]
pub struct Admin(pub Principal);

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl Principal {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let user_id = header(headers, USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("missing user identity".into()))?
            .to_string();
        let role = header(headers, ROLE_HEADER)
            .ok_or_else(|| AppError::Unauthorized("missing user role".into()))?
            .parse::<Role>()
            .map_err(AppError::Unauthorized)?;
        let team_id = match header(headers, TEAM_ID_HEADER) {
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map_err(|_| AppError::Unauthorized(format!("invalid team id {raw:?}")))?,
            ),
            None => None,
        };
        if role == Role::Team && team_id.is_none() {
            return Err(AppError::Unauthorized("team user without a team".into()));
        }
        Ok(Self { user_id, role, team_id })
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Principal::from_headers(&parts.headers)
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Admin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let principal = Principal::from_request_parts(parts, state).await?;
        if principal.role != Role::Admin {
            return Err(AppError::Forbidden("admin access required".into()));
        }
        Ok(Admin(principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn team_user_carries_team_id() {
        let p = Principal::from_headers(&headers(&[
            (USER_ID_HEADER, "u-7"),
            (ROLE_HEADER, "participant"),
            (TEAM_ID_HEADER, "3"),
        ]))
        .unwrap();
        assert_eq!(p.role, Role::Team);
        assert_eq!(p.team_id, Some(3));
    }

    #[test]
    fn missing_or_bad_identity_is_unauthorized() {
        assert!(matches!(
            Principal::from_headers(&HeaderMap::new()),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            Principal::from_headers(&headers(&[(USER_ID_HEADER, "u"), (ROLE_HEADER, "root")])),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            Principal::from_headers(&headers(&[(USER_ID_HEADER, "u"), (ROLE_HEADER, "team")])),
            Err(AppError::Unauthorized(_))
        ));
    }
}
