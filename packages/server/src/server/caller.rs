use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, HeaderMap};
use std::convert::Infallible;

use seshu::SeshuError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLES_HEADER: &str = "x-user-roles";
pub const SUPER_ADMIN_ROLE: &str = "super_admin";

/// Operator identity forwarded by the front end.
///
/// A missing or empty `x-user-id` header means an anonymous caller; routes
/// that need an owner reject those with `SeshuError::Auth`.
#[derive(Clone, Debug, Default)]
pub struct Caller {
    pub user_id: String,
    pub roles: Vec<String>,
}

impl Caller {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            user_id: header_value(headers, USER_ID_HEADER).trim().to_string(),
            roles: header_value(headers, USER_ROLES_HEADER)
                .split(',')
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_empty()
    }

    pub fn is_super_admin(&self) -> bool {
        !self.is_anonymous() && self.roles.iter().any(|r| r == SUPER_ADMIN_ROLE)
    }

    /// The caller's id, or `Auth` for anonymous callers.
    pub fn require_identity(&self) -> Result<&str, SeshuError> {
        if self.is_anonymous() {
            return Err(SeshuError::Auth);
        }
        Ok(&self.user_id)
    }

    pub fn require_super_admin(&self) -> Result<&str, SeshuError> {
        let id = self.require_identity()?;
        if !self.is_super_admin() {
            tracing::debug!(user_id = %id, "Super admin role required");
            return Err(SeshuError::Auth);
        }
        Ok(id)
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, value.parse().unwrap());
        }
        map
    }

    #[test]
    fn test_missing_headers_are_anonymous() {
        let caller = Caller::from_headers(&HeaderMap::new());
        assert!(caller.is_anonymous());
        assert!(matches!(caller.require_identity(), Err(SeshuError::Auth)));
    }

    #[test]
    fn test_whitespace_id_is_anonymous() {
        let caller = Caller::from_headers(&headers(&[(USER_ID_HEADER, "   ")]));
        assert!(caller.is_anonymous());
    }

    #[test]
    fn test_roles_are_comma_separated() {
        let caller = Caller::from_headers(&headers(&[
            (USER_ID_HEADER, "user-1"),
            (USER_ROLES_HEADER, "editor, super_admin ,"),
        ]));
        assert_eq!(caller.roles, vec!["editor", "super_admin"]);
        assert!(caller.is_super_admin());
        assert_eq!(caller.require_super_admin().unwrap(), "user-1");
    }

    #[test]
    fn test_role_without_identity_is_not_admin() {
        let caller = Caller::from_headers(&headers(&[(USER_ROLES_HEADER, "super_admin")]));
        assert!(!caller.is_super_admin());
    }
}
