//! Withdrawal request models and API request/response types.
//!
//! A withdrawal request is an agent-initiated claim against pending
//! commission value. The requested amount is debited from the wallet at
//! creation time (optimistic lock) and credited back on rejection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a withdrawal request record from the database.
///
/// # Database Table
///
/// Maps to the `withdrawal_requests` table. Each request:
/// - Snapshots the agent's pending commissions at creation time
///   (`commission_ids`), flipping them to `withdrawal_requested`
/// - Points at its pending ledger debit row (`debit_transaction_id`)
///   so the admin decision can complete or refund it
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct WithdrawalRequest {
    /// Unique identifier for this request
    pub id: Uuid,

    /// Agent who requested the withdrawal
    pub agent_id: Uuid,

    /// Requested amount in cents
    pub amount_cents: i64,

    /// Bank account to pay into
    pub bank_account: String,

    /// Request status: "pending", "approved", "rejected" or "paid"
    pub status: String,

    /// Snapshot of the agent's pending commissions at request time
    pub commission_ids: Vec<Uuid>,

    /// The ledger debit row locked for this request
    pub debit_transaction_id: Option<Uuid>,

    /// Reason recorded when the request is rejected
    pub rejection_reason: Option<String>,

    /// Payout details, set when the request is paid
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,

    /// When the request was created
    pub created_at: DateTime<Utc>,

    /// When the request was last updated
    pub updated_at: DateTime<Utc>,
}

/// States of the withdrawal request state machine.
///
/// `pending → approved → paid`, or `pending → rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
    Paid,
}

impl WithdrawalStatus {
    /// Database string form of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Rejected => "rejected",
            WithdrawalStatus::Paid => "paid",
        }
    }

    /// Parse a status from its database string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(WithdrawalStatus::Pending),
            "approved" => Some(WithdrawalStatus::Approved),
            "rejected" => Some(WithdrawalStatus::Rejected),
            "paid" => Some(WithdrawalStatus::Paid),
            _ => None,
        }
    }
}

/// Request to create a withdrawal request.
///
/// # JSON Example
///
/// ```json
/// {
///   "amount_cents": 90000,
///   "bank_account": "DE89370400440532013000"
/// }
/// ```
///
/// # Validation
///
/// - `amount_cents` must be positive
/// - The wallet must cover the amount, otherwise the request fails with
///   `insufficient_balance` and no mutation occurs
#[derive(Debug, Deserialize)]
pub struct CreateWithdrawalRequest {
    pub amount_cents: i64,
    pub bank_account: String,
}

/// Request body for rejecting a withdrawal request.
#[derive(Debug, Default, Deserialize)]
pub struct RejectWithdrawalRequest {
    pub rejection_reason: Option<String>,
}

/// Request body for paying an approved withdrawal request.
#[derive(Debug, Deserialize)]
pub struct PayWithdrawalRequest {
    pub payment_method: String,
    pub payment_reference: Option<String>,
}

/// Response returned for withdrawal request operations.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "bb0e8400-e29b-41d4-a716-446655440006",
///   "agent_id": "660e8400-e29b-41d4-a716-446655440001",
///   "amount_cents": 90000,
///   "bank_account": "DE89370400440532013000",
///   "status": "pending",
///   "commission_ids": ["880e8400-e29b-41d4-a716-446655440003"],
///   "created_at": "2026-01-15T10:30:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct WithdrawalResponse {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub amount_cents: i64,
    pub bank_account: String,
    pub status: String,
    pub commission_ids: Vec<Uuid>,
    pub rejection_reason: Option<String>,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Convert database WithdrawalRequest to API WithdrawalResponse.
///
/// This removes the internal `debit_transaction_id` linkage that
/// clients don't need to see.
impl From<WithdrawalRequest> for WithdrawalResponse {
    fn from(request: WithdrawalRequest) -> Self {
        Self {
            id: request.id,
            agent_id: request.agent_id,
            amount_cents: request.amount_cents,
            bank_account: request.bank_account,
            status: request.status,
            commission_ids: request.commission_ids,
            rejection_reason: request.rejection_reason,
            payment_method: request.payment_method,
            payment_reference: request.payment_reference,
            paid_at: request.paid_at,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}
