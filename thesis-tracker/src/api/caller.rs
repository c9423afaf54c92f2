//! Caller identity forwarded by the upstream gateway
//!
//! The gateway authenticates the user and passes `X-User-Id` and
//! `X-User-Role`. Requests without a usable identity are rejected with 401.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use thesis_common::models::UserRole;
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: Uuid,
    pub role: UserRole,
}

impl Caller {
    /// 403 unless the caller has `role`
    pub fn require(&self, role: UserRole) -> Result<(), ApiError> {
        self.require_any(&[role])
    }

    pub fn require_any(&self, roles: &[UserRole]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "role {} may not perform this action",
                self.role
            )))
        }
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", name)))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized(format!("malformed {} header", name)))
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = Uuid::parse_str(header(parts, USER_ID_HEADER)?.trim())
            .map_err(|_| ApiError::Unauthorized("invalid user id".to_string()))?;
        let role = header(parts, USER_ROLE_HEADER)?
            .trim()
            .parse::<UserRole>()
            .map_err(|_| ApiError::Unauthorized("invalid user role".to_string()))?;

        Ok(Caller { id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(req: Request<()>) -> Result<Caller, ApiError> {
        let (mut parts, _) = req.into_parts();
        Caller::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_extracts_identity() {
        let id = Uuid::new_v4();
        let req = Request::builder()
            .header(USER_ID_HEADER, id.to_string())
            .header(USER_ROLE_HEADER, "Lecture")
            .body(())
            .unwrap();

        let caller = extract(req).await.unwrap();
        assert_eq!(caller.id, id);
        assert_eq!(caller.role, UserRole::Lecture);
    }

    #[tokio::test]
    async fn test_missing_or_bad_identity_is_unauthorized() {
        let req = Request::builder().body(()).unwrap();
        assert!(matches!(extract(req).await, Err(ApiError::Unauthorized(_))));

        let req = Request::builder()
            .header(USER_ID_HEADER, Uuid::new_v4().to_string())
            .header(USER_ROLE_HEADER, "Dean")
            .body(())
            .unwrap();
        assert!(matches!(extract(req).await, Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_require_role() {
        let caller = Caller {
            id: Uuid::new_v4(),
            role: UserRole::Student,
        };
        assert!(caller.require(UserRole::Student).is_ok());
        assert!(matches!(
            caller.require(UserRole::Admin),
            Err(ApiError::Forbidden(_))
        ));
        assert!(caller
            .require_any(&[UserRole::Student, UserRole::Lecture])
            .is_ok());
    }
}
