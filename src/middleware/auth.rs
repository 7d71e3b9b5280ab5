//! Session authentication middleware.
//!
//! Every protected route passes through here: the bearer session token is
//! taken from the Authorization header, hashed, and matched against an
//! unexpired session joined with its user; the verified (user, tier,
//! lifetime) tuple rides the request as an extension. Anything else is a
//! 401.
//!
//! Downstream code trusts the injected [`AuthContext`] for the duration of
//! one request and performs no further identity checks.

use crate::{error::AppError, state::AppState};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Billing tier of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Runs on platform keys, pays with credits
    Free,
    /// Brings their own provider keys
    Byok,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Byok => "byok",
        }
    }

    /// Anything other than an explicit "byok" is treated as free.
    fn from_db(value: &str) -> Self {
        if value == "byok" { Tier::Byok } else { Tier::Free }
    }
}

/// The verified identity tuple for one request.
///
/// Inserted into the request's extension map by the middleware; handlers
/// pull it out with `Extension<AuthContext>`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// ID of the authenticated user
    ///
    /// Used to filter database queries (e.g., only show this user's jobs)
    pub user_id: Uuid,

    /// Billing tier, controlling credential resolution and billing
    pub tier: Tier,

    /// Whether the user holds the one-time BYOK lifetime purchase
    pub is_lifetime: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct SessionUser {
    id: Uuid,
    tier: String,
    is_lifetime: bool,
}

/// Session authentication middleware function.
///
/// # Flow
///
/// 1. Take the `Authorization: Bearer <token>` header
/// 2. Hash the token with SHA-256
/// 3. Look up an unexpired session with that hash, joined to its user
/// 4. Found: attach `AuthContext`, continue to the handler
/// 5. Not found: 401
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    // Raw tokens never touch the database; only hashes are stored and
    // compared.
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let token_hash = hex::encode(hasher.finalize());

    let session_user = sqlx::query_as::<_, SessionUser>(
        r#"
        SELECT u.id, u.tier, u.is_lifetime
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token_hash = $1 AND s.expires_at > NOW()
        "#,
    )
    .bind(&token_hash)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::InvalidToken)?;

    let auth_context = AuthContext {
        user_id: session_user.id,
        tier: Tier::from_db(&session_user.tier),
        is_lifetime: session_user.is_lifetime,
    };
    request.extensions_mut().insert(auth_context);

    Ok(next.run(request).await)
}
