//! Identity extractors.
//!
//! The session gateway in front of this server authenticates callers and
//! forwards the verified user id in [`USER_ID_HEADER`]. The id is trusted as
//! given; the extractors only resolve it to a stored user.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::models::User;
use crate::state::AppState;
use crate::store::Store;
use crate::utils::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Any registered caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// A caller whose role is `ADMIN`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

fn user_id_from(parts: &Parts) -> Result<Uuid, AppError> {
    let raw = parts
        .headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| AppError::AuthError("Missing user identity".to_string()))?;
    raw.to_str()
        .ok()
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or_else(|| AppError::AuthError("Malformed user identity".to_string()))
}

#[async_trait]
impl<S: Store> FromRequestParts<AppState<S>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let user_id = user_id_from(parts)?;
        let user = state
            .ledger
            .store()
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::AuthError("Unknown user".to_string()))?;
        Ok(AuthUser(user))
    }
}

#[async_trait]
impl<S: Store> FromRequestParts<AppState<S>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.is_admin() {
            return Err(AppError::Forbidden(
                "Administrator role required".to_string(),
            ));
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(USER_ID_HEADER, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_user_id_header_is_parsed() {
        let id = Uuid::new_v4();
        assert_eq!(user_id_from(&parts_with(Some(&id.to_string()))).unwrap(), id);
    }

    #[test]
    fn test_missing_or_malformed_identity_is_unauthorized() {
        assert!(matches!(
            user_id_from(&parts_with(None)),
            Err(AppError::AuthError(_))
        ));
        assert!(matches!(
            user_id_from(&parts_with(Some("not-a-uuid"))),
            Err(AppError::AuthError(_))
        ));
    }
}
