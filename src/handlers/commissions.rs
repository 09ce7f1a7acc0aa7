//! Commission HTTP handlers.
//!
//! This module implements the commission lifecycle API endpoints:
//! - POST /api/v1/commissions - Create a pending commission (lead closed)
//! - GET /api/v1/commissions - List commissions
//! - GET /api/v1/commissions/:id - Get commission details
//! - PATCH /api/v1/commissions/:id - Update amount inputs and/or status
//! - PATCH /api/v1/commissions/:id/amount - Update amount inputs only
//! - POST /api/v1/commissions/:id/payout - Pay out an approved commission

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::commission::{
    CommissionResponse, CreateCommissionRequest, PayoutRequest, UpdateAmountRequest,
    UpdateCommissionRequest,
};
use crate::services::commission_service;
use crate::state::AppState;

/// Create a commission for a closed lead.
///
/// # Endpoint
///
/// `POST /api/v1/commissions`
///
/// # Authorization
///
/// Admin only — this is the lead-lifecycle collaborator's hook, not an
/// agent-facing endpoint.
///
/// # Request Body
///
/// ```json
/// {
///   "agent_id": "660e8400-e29b-41d4-a716-446655440001",
///   "product_id": "990e8400-e29b-41d4-a716-446655440004",
///   "lead_id": "aa0e8400-e29b-41d4-a716-446655440005"
/// }
/// ```
///
/// # Response (201 Created)
///
/// The commission starts with `amount_cents = 0` and `status = pending`;
/// an admin later sets the amount inputs via PATCH.
pub async fn create_commission(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateCommissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin()?;

    let commission =
        commission_service::create_commission(&state.pool, &state.notifier, request).await?;

    Ok((StatusCode::CREATED, Json(CommissionResponse::from(commission))))
}

/// List commissions.
///
/// # Endpoint
///
/// `GET /api/v1/commissions`
///
/// # Scoping
///
/// Agents see only their own commissions; admins see everything.
pub async fn list_commissions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<CommissionResponse>>, AppError> {
    let scope = if auth.role.is_admin() {
        None
    } else {
        Some(auth.agent_id)
    };

    let commissions = commission_service::list_commissions(&state.pool, scope).await?;
    let responses: Vec<CommissionResponse> = commissions.into_iter().map(Into::into).collect();

    Ok(Json(responses))
}

/// Get a specific commission by ID.
///
/// # Endpoint
///
/// `GET /api/v1/commissions/:id`
///
/// # Security Note
///
/// Returns 404 when the commission doesn't exist OR belongs to a
/// different agent and the caller isn't an admin (prevents leaking the
/// existence of other agents' commissions).
pub async fn get_commission(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(commission_id): Path<Uuid>,
) -> Result<Json<CommissionResponse>, AppError> {
    let commission = commission_service::get_commission(&state.pool, commission_id)
        .await?
        .ok_or(AppError::CommissionNotFound)?;

    if !auth.role.is_admin() && commission.agent_id != auth.agent_id {
        return Err(AppError::CommissionNotFound);
    }

    Ok(Json(commission.into()))
}

/// Update a commission's amount inputs and/or status.
///
/// # Endpoint
///
/// `PATCH /api/v1/commissions/:id`
///
/// # Authorization
///
/// Admin only.
///
/// # Request Body
///
/// ```json
/// {
///   "base_amount_cents": 100000,
///   "tds_percentage": 10.0,
///   "status": "approved"
/// }
/// ```
///
/// # Wallet Effects
///
/// The state machine plans the required wallet operations from the
/// before/after diff and applies them atomically together with the
/// commission update: approval credits the derived amount, an amount
/// change on an approved commission moves the balance by the difference,
/// rejection/cancellation takes the credit back.
pub async fn update_commission(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(commission_id): Path<Uuid>,
    Json(request): Json<UpdateCommissionRequest>,
) -> Result<Json<CommissionResponse>, AppError> {
    auth.require_admin()?;

    let commission =
        commission_service::update_commission(&state.pool, &state.notifier, commission_id, request)
            .await?;

    Ok(Json(commission.into()))
}

/// Update only a commission's amount inputs.
///
/// # Endpoint
///
/// `PATCH /api/v1/commissions/:id/amount`
///
/// # Authorization
///
/// Admin only.
///
/// # Request Body
///
/// ```json
/// {
///   "tds_percentage": 15.0
/// }
/// ```
///
/// Convenience endpoint: same semantics as PATCH /commissions/:id with
/// only amount fields set, so the status cannot change by accident.
pub async fn update_amount(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(commission_id): Path<Uuid>,
    Json(request): Json<UpdateAmountRequest>,
) -> Result<Json<CommissionResponse>, AppError> {
    auth.require_admin()?;

    let update = UpdateCommissionRequest {
        base_amount_cents: request.base_amount_cents,
        tds_percentage: request.tds_percentage,
        bonus_cents: request.bonus_cents,
        ..Default::default()
    };

    let commission =
        commission_service::update_commission(&state.pool, &state.notifier, commission_id, update)
            .await?;

    Ok(Json(commission.into()))
}

/// Pay out an approved commission.
///
/// # Endpoint
///
/// `POST /api/v1/commissions/:id/payout`
///
/// # Authorization
///
/// Admin only.
///
/// # Request Body
///
/// ```json
/// {
///   "payment_method": "bank_transfer",
///   "bank_account": "DE89370400440532013000",
///   "payment_reference": "PAYOUT-2026-001"
/// }
/// ```
///
/// # Response (200 OK)
///
/// The commission with `status = "paid"` and payment details recorded.
/// A payout record is created; the wallet balance is untouched because
/// the amount was credited at approval.
pub async fn payout_commission(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(commission_id): Path<Uuid>,
    Json(request): Json<PayoutRequest>,
) -> Result<Json<CommissionResponse>, AppError> {
    auth.require_admin()?;

    let commission =
        commission_service::payout_commission(&state.pool, &state.notifier, commission_id, request)
            .await?;

    Ok(Json(commission.into()))
}
