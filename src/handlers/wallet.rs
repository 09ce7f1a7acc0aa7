//! Wallet HTTP handlers.
//!
//! This module implements the wallet-related API endpoints:
//! - GET /api/v1/wallet - Get (or lazily create) the caller's wallet
//! - GET /api/v1/wallet/transactions - List the caller's ledger

use axum::{Extension, Json, extract::State};

use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::ledger::LedgerEntryResponse;
use crate::models::wallet::WalletResponse;
use crate::services::wallet_service;
use crate::state::AppState;

/// Get the authenticated agent's wallet.
///
/// # Endpoint
///
/// `GET /api/v1/wallet`
///
/// # Response (200 OK)
///
/// The wallet is created on first access, so this endpoint never
/// returns 404 for an authenticated agent.
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "agent_id": "660e8400-e29b-41d4-a716-446655440001",
///   "balance_cents": 90000,
///   "total_earnings_cents": 90000,
///   "total_withdrawn_cents": 0,
///   "total_leads_closed": 1,
///   "total_leads_created": 3,
///   "status": "active"
/// }
/// ```
pub async fn get_wallet(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<WalletResponse>, AppError> {
    let wallet = wallet_service::get_or_create_wallet(&state.pool, auth.agent_id).await?;

    Ok(Json(wallet.into()))
}

/// List the authenticated agent's ledger, newest first.
///
/// # Endpoint
///
/// `GET /api/v1/wallet/transactions`
///
/// # Response (200 OK)
///
/// Returns an array of ledger entries (may be empty). Each entry carries
/// the signed delta and the balance snapshot after applying it, so the
/// full history can be audited client-side.
pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<LedgerEntryResponse>>, AppError> {
    let wallet = wallet_service::get_or_create_wallet(&state.pool, auth.agent_id).await?;
    let entries = wallet_service::list_ledger(&state.pool, wallet.id).await?;

    let responses: Vec<LedgerEntryResponse> = entries.into_iter().map(Into::into).collect();

    Ok(Json(responses))
}
