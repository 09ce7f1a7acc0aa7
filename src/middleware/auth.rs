//! Agent token authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the bearer token from the Authorization header
//! 2. Hash it and verify it exists in the database
//! 3. Inject the agent's identity and role into the request
//! 4. Reject unauthorized requests with HTTP 401
//!
//! The core trusts the identity and role this seam supplies; everything
//! beyond the lookup (token issuance, rotation, sessions) is the
//! identity collaborator's concern.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::agent::{Agent, AgentRole};
use crate::state::AppState;

/// Authentication context attached to authenticated requests.
///
/// This struct is inserted into the request's extension map and can be
/// extracted by route handlers to know who made the request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// ID of the authenticated agent
    pub agent_id: Uuid,

    /// Display name of the agent
    pub agent_name: String,

    /// Role of the agent, gates admin-only transitions
    pub role: AgentRole,
}

impl AuthContext {
    /// Require an admin role for admin-only transitions
    /// (approve/reject/pay/amount-edit).
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Agent token authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <token>` header from request
/// 2. Hash the `<token>` using SHA-256
/// 3. Query database for matching hash where `is_active = true`
/// 4. If found: inject `AuthContext` into request, call next handler
/// 5. If not found: return 401 Unauthorized error
///
/// # Headers
///
/// Expected header format:
/// ```
/// Authorization: Bearer abc123xyz
/// ```
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Step 1: Extract Authorization header
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::InvalidToken)?;

    // Step 2: Extract Bearer token
    // Expected format: "Bearer <token>"
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::InvalidToken)?;

    // Step 3: Hash the token using SHA-256
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());

    let token_hash = hex::encode(hasher.finalize());

    // Step 4: Lookup hashed token in database
    let agent = sqlx::query_as::<_, Agent>(
        "SELECT id, token_hash, agent_name, role, created_at, is_active
         FROM agents
         WHERE token_hash = $1 AND is_active = true",
    )
    .bind(&token_hash)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::InvalidToken)?;

    // Step 5: Create authentication context; an unknown role string is
    // treated the same as an invalid token
    let role = AgentRole::parse(&agent.role).ok_or(AppError::InvalidToken)?;
    let auth_context = AuthContext {
        agent_id: agent.id,
        agent_name: agent.agent_name,
        role,
    };

    // Step 6: Inject context into request extensions
    // Route handlers can now extract this using Extension<AuthContext>
    request.extensions_mut().insert(auth_context);

    // Step 7: Call the next middleware/handler
    Ok(next.run(request).await)
}
