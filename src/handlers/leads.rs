//! Lead lifecycle event hooks.
//!
//! The lead lifecycle lives in an external collaborator; it calls this
//! endpoint when a lead is created or closed so the wallet counters and
//! the commission pipeline stay in sync:
//! - `lead_created` bumps the agent's `total_leads_created` counter
//! - `lead_closed` creates the zero-amount pending commission

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::commission::{CommissionResponse, CreateCommissionRequest};
use crate::models::wallet::WalletResponse;
use crate::services::{commission_service, wallet_service};
use crate::state::AppState;

/// Lead lifecycle event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadEventType {
    LeadCreated,
    LeadClosed,
}

/// A lead lifecycle event.
///
/// # JSON Example
///
/// ```json
/// {
///   "event_type": "lead_closed",
///   "agent_id": "660e8400-e29b-41d4-a716-446655440001",
///   "product_id": "990e8400-e29b-41d4-a716-446655440004",
///   "lead_id": "aa0e8400-e29b-41d4-a716-446655440005"
/// }
/// ```
///
/// `product_id` is only required for `lead_closed`.
#[derive(Debug, Deserialize)]
pub struct LeadEventRequest {
    pub event_type: LeadEventType,
    pub agent_id: Uuid,
    pub lead_id: Uuid,
    pub product_id: Option<Uuid>,
}

/// Handle a lead lifecycle event.
///
/// # Endpoint
///
/// `POST /api/v1/leads/events`
///
/// # Authorization
///
/// Admin only — called by the lead lifecycle collaborator, not by agents.
///
/// # Response
///
/// - `lead_created`: 200 OK with the updated wallet
/// - `lead_closed`: 201 Created with the new pending commission
pub async fn handle_lead_event(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<LeadEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin()?;

    match request.event_type {
        LeadEventType::LeadCreated => {
            let wallet = wallet_service::record_lead_created(&state.pool, request.agent_id).await?;

            Ok((StatusCode::OK, Json(WalletResponse::from(wallet))).into_response())
        }
        LeadEventType::LeadClosed => {
            let product_id = request.product_id.ok_or_else(|| {
                AppError::InvalidRequest("product_id is required for lead_closed".to_string())
            })?;

            let commission = commission_service::create_commission(
                &state.pool,
                &state.notifier,
                CreateCommissionRequest {
                    agent_id: request.agent_id,
                    product_id,
                    lead_id: request.lead_id,
                },
            )
            .await?;

            Ok((StatusCode::CREATED, Json(CommissionResponse::from(commission))).into_response())
        }
    }
}
