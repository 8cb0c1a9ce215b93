use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::db::AppState;
use crate::error::AppError;
use crate::util::extract_bearer_token;

/// Credential-verification seam for the administrative endpoints.
///
/// The handlers only ever see this trait, so the shared secret can be
/// replaced by per-operator keys or rotated credentials without touching
/// business logic.
pub trait AdminAuthorizer: Send + Sync {
    fn authorize(&self, credential: &str) -> bool;
}

/// A single static shared secret, compared in constant time.
pub struct SharedSecretAuthorizer {
    secret: String,
}

impl SharedSecretAuthorizer {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl AdminAuthorizer for SharedSecretAuthorizer {
    fn authorize(&self, credential: &str) -> bool {
        use subtle::ConstantTimeEq;
        credential
            .as_bytes()
            .ct_eq(self.secret.as_bytes())
            .into()
    }
}

/// Reject missing or mismatched admin credentials before any store access.
pub async fn admin_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("Missing admin credentials".into()))?;

    if !state.admin_auth.authorize(token) {
        return Err(AppError::Unauthorized("Invalid admin credentials".into()));
    }

    Ok(next.run(request).await)
}
