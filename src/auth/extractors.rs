use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::jwt::{AuthUser, JwtKeys};
use crate::error::AppError;

/// Legacy identity header. Optional; the token decides who is acting.
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// The user whose files a request operates on.
///
/// Identity always comes from the validated token. Clients that still send
/// `X-User-Email` must send the token's own address, otherwise the request is
/// refused rather than silently acting on another account.
#[derive(Debug, Clone)]
pub struct ActingUser {
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;

        if let Some(claimed) = parts.headers.get(USER_EMAIL_HEADER) {
            let claimed = claimed
                .to_str()
                .map_err(|_| AppError::validation("User email header is not valid text"))?
                .trim();
            if !claimed.eq_ignore_ascii_case(&user.email) {
                warn!(token_email = %user.email, claimed_email = %claimed, "identity header mismatch");
                return Err(AppError::Forbidden(
                    "User email header does not match token".into(),
                ));
            }
        }

        Ok(ActingUser { email: user.email })
    }
}
