//! Caller identity extracted from request headers.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use common::{CustomerId, Role};

use crate::error::ApiError;

/// Header carrying the authenticated username.
pub const USERNAME_HEADER: &str = "x-username";

/// Header carrying the authenticated user's role.
pub const ROLE_HEADER: &str = "x-user-role";

/// The user on whose behalf a request runs.
///
/// Session handling lives in front of this service; the gateway forwards the
/// username and role as headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub username: CustomerId,
    pub role: Role,
}

impl Caller {
    /// Returns the caller's username if they are a customer.
    pub fn require_customer(&self) -> Result<&CustomerId, ApiError> {
        match self.role {
            Role::Customer => Ok(&self.username),
            other => Err(ApiError::Unauthorized(format!(
                "user with role {other} is not a customer"
            ))),
        }
    }

    /// Fails unless the caller is an admin or a manager.
    pub fn require_admin_or_manager(&self) -> Result<(), ApiError> {
        if self.role.is_admin_or_manager() {
            Ok(())
        } else {
            Err(ApiError::Unauthorized(
                "user is not an admin or manager".to_string(),
            ))
        }
    }

    fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let username = header(USERNAME_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("unauthenticated".to_string()))?;
        let role = header(ROLE_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("missing user role".to_string()))?
            .parse::<Role>()
            .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

        Ok(Self {
            username: CustomerId::new(username),
            role,
        })
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn extracts_username_and_role() {
        let caller = Caller::from_headers(&headers(&[
            (USERNAME_HEADER, "alice"),
            (ROLE_HEADER, "Customer"),
        ]))
        .unwrap();

        assert_eq!(caller.username.as_str(), "alice");
        assert_eq!(caller.role, Role::Customer);
        assert!(caller.require_customer().is_ok());
        assert!(caller.require_admin_or_manager().is_err());
    }

    #[test]
    fn missing_username_is_unauthorized() {
        let err = Caller::from_headers(&headers(&[(ROLE_HEADER, "Customer")])).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn unknown_role_is_unauthorized() {
        let err = Caller::from_headers(&headers(&[
            (USERNAME_HEADER, "alice"),
            (ROLE_HEADER, "Guest"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn manager_is_not_a_customer() {
        let caller = Caller::from_headers(&headers(&[
            (USERNAME_HEADER, "bob"),
            (ROLE_HEADER, "Manager"),
        ]))
        .unwrap();

        assert!(caller.require_customer().is_err());
        assert!(caller.require_admin_or_manager().is_ok());
    }
}
