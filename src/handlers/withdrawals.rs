//! Withdrawal request HTTP handlers.
//!
//! This module implements the withdrawal flow API endpoints:
//! - POST /api/v1/withdrawal-requests - Create a request, lock funds
//! - GET /api/v1/withdrawal-requests - List requests
//! - GET /api/v1/withdrawal-requests/:id - Get request details
//! - PATCH /api/v1/withdrawal-requests/:id/approve - Approve (admin)
//! - PATCH /api/v1/withdrawal-requests/:id/reject - Reject (admin)
//! - PATCH /api/v1/withdrawal-requests/:id/pay - Pay (admin)

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::withdrawal::{
    CreateWithdrawalRequest, PayWithdrawalRequest, RejectWithdrawalRequest, WithdrawalResponse,
};
use crate::services::withdrawal_service;
use crate::state::AppState;

/// Create a withdrawal request for the authenticated agent.
///
/// # Endpoint
///
/// `POST /api/v1/withdrawal-requests`
///
/// # Request Body
///
/// ```json
/// {
///   "amount_cents": 90000,
///   "bank_account": "DE89370400440532013000"
/// }
/// ```
///
/// # Behavior
///
/// The agent's whole pending-commission set is snapshotted onto the
/// request and flipped to `withdrawal_requested`; the amount is debited
/// from the wallet immediately. Fails with 422 `insufficient_balance`
/// when the wallet can't cover the amount — in that case nothing is
/// mutated.
pub async fn create_withdrawal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateWithdrawalRequest>,
) -> Result<impl IntoResponse, AppError> {
    let created =
        withdrawal_service::create_request(&state.pool, &state.notifier, auth.agent_id, request)
            .await?;

    Ok((StatusCode::CREATED, Json(WithdrawalResponse::from(created))))
}

/// List withdrawal requests.
///
/// # Endpoint
///
/// `GET /api/v1/withdrawal-requests`
///
/// # Scoping
///
/// Agents see only their own requests; admins see everything.
pub async fn list_withdrawals(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<WithdrawalResponse>>, AppError> {
    let scope = if auth.role.is_admin() {
        None
    } else {
        Some(auth.agent_id)
    };

    let requests = withdrawal_service::list_requests(&state.pool, scope).await?;
    let responses: Vec<WithdrawalResponse> = requests.into_iter().map(Into::into).collect();

    Ok(Json(responses))
}

/// Get a specific withdrawal request by ID.
///
/// # Security Note
///
/// Returns 404 when the request doesn't exist OR belongs to a different
/// agent and the caller isn't an admin.
pub async fn get_withdrawal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<WithdrawalResponse>, AppError> {
    let request = withdrawal_service::get_request(&state.pool, request_id)
        .await?
        .ok_or(AppError::WithdrawalNotFound)?;

    if !auth.role.is_admin() && request.agent_id != auth.agent_id {
        return Err(AppError::WithdrawalNotFound);
    }

    Ok(Json(request.into()))
}

/// Approve a pending withdrawal request.
///
/// # Endpoint
///
/// `PATCH /api/v1/withdrawal-requests/:id/approve`
///
/// # Authorization
///
/// Admin only. Only `pending` requests may be approved; anything else
/// fails with 409 `invalid_state_transition`.
pub async fn approve_withdrawal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<WithdrawalResponse>, AppError> {
    auth.require_admin()?;

    let updated =
        withdrawal_service::approve_request(&state.pool, &state.notifier, request_id).await?;

    Ok(Json(updated.into()))
}

/// Reject a pending withdrawal request.
///
/// # Endpoint
///
/// `PATCH /api/v1/withdrawal-requests/:id/reject`
///
/// # Request Body
///
/// ```json
/// {
///   "rejection_reason": "Bank account could not be verified"
/// }
/// ```
///
/// # Behavior
///
/// The snapshotted commissions revert to `pending` and the locked amount
/// is credited back to the wallet (`kind = refund`).
pub async fn reject_withdrawal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(request_id): Path<Uuid>,
    Json(request): Json<RejectWithdrawalRequest>,
) -> Result<Json<WithdrawalResponse>, AppError> {
    auth.require_admin()?;

    let updated = withdrawal_service::reject_request(
        &state.pool,
        &state.notifier,
        request_id,
        request.rejection_reason,
    )
    .await?;

    Ok(Json(updated.into()))
}

/// Pay an approved withdrawal request.
///
/// # Endpoint
///
/// `PATCH /api/v1/withdrawal-requests/:id/pay`
///
/// # Request Body
///
/// ```json
/// {
///   "payment_method": "bank_transfer",
///   "payment_reference": "WD-2026-001"
/// }
/// ```
///
/// # Behavior
///
/// The snapshotted commissions flip to `paid` and the payment details
/// are recorded. The balance already reflects the debit from creation.
pub async fn pay_withdrawal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(request_id): Path<Uuid>,
    Json(request): Json<PayWithdrawalRequest>,
) -> Result<Json<WithdrawalResponse>, AppError> {
    auth.require_admin()?;

    let updated =
        withdrawal_service::pay_request(&state.pool, &state.notifier, request_id, request).await?;

    Ok(Json(updated.into()))
}
