use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::errors::AppError;

/// The authenticated caller, resolved once per request and threaded through
/// every handler as a typed value. The upstream gateway authenticates the
/// session and forwards the subject in `x-user-id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthPrincipal {
    pub user_id: Uuid,
}

impl AuthPrincipal {
    /// Owner check used by every caller-scoped endpoint.
    pub fn ensure_owns(&self, user_id: Uuid) -> Result<(), AppError> {
        if self.user_id != user_id {
            return Err(AppError::Forbidden);
        }
        Ok(())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("x-user-id")
            .ok_or(AppError::Unauthorized)?;
        let raw = header.to_str().map_err(|_| AppError::Unauthorized)?;
        let user_id = Uuid::parse_str(raw).map_err(|_| AppError::Unauthorized)?;
        Ok(AuthPrincipal { user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ownership_check() {
        let id = Uuid::new_v4();
        let principal = AuthPrincipal { user_id: id };
        assert!(principal.ensure_owns(id).is_ok());
        assert!(matches!(
            principal.ensure_owns(Uuid::new_v4()),
            Err(AppError::Forbidden)
        ));
    }
}
