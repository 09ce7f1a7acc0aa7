//! Commission data models and API request/response types.
//!
//! This module defines:
//! - `Commission`: Database entity representing a commission
//! - `CommissionStatus`: the commission state machine's states
//! - Request types for creation, field updates and payout
//! - `CommissionResponse`: Response body returned to clients
//! - `Payout`: record created when an approved commission is paid out

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a commission record from the database.
///
/// # Database Table
///
/// Maps to the `commissions` table. Each commission:
/// - Is created with `amount_cents = 0` and `status = pending` when a
///   lead closes
/// - Derives `amount_cents` from `base_amount_cents`, `tds_bps` and
///   `bonus_cents` at every save — it is never settable directly
/// - Stores money in cents (never floats!) and the TDS percentage in
///   basis points (10% = 1000 bps) so derivation stays in integer math
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Commission {
    /// Unique identifier for this commission
    pub id: Uuid,

    /// Agent who earns this commission
    pub agent_id: Uuid,

    /// Product sold on the closed lead
    pub product_id: Uuid,

    /// Lead whose closing created this commission
    pub lead_id: Uuid,

    /// Gross commission amount before TDS, in cents
    pub base_amount_cents: i64,

    /// Tax-deducted-at-source percentage in basis points (0..=10000)
    pub tds_bps: i32,

    /// Additive bonus in cents
    pub bonus_cents: i64,

    /// Derived payable amount in cents
    ///
    /// `amount = base − base × tds_bps / 10000 + bonus`
    pub amount_cents: i64,

    /// Current state-machine status
    pub status: String,

    /// Reason recorded when the commission is cancelled
    pub cancellation_reason: Option<String>,

    /// Payout details, set when the commission is paid
    pub payment_method: Option<String>,
    pub bank_account: Option<String>,
    pub payment_reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,

    /// When commission was created (lead closed)
    pub created_at: DateTime<Utc>,

    /// When commission was last updated
    pub updated_at: DateTime<Utc>,
}

/// States of the commission state machine.
///
/// # Transitions
///
/// Admin path: `pending → approved → paid`, with side branches to
/// `rejected`/`cancelled`. Withdrawal path: `pending →
/// withdrawal_requested → withdrawal_approved → paid`, or back to
/// `pending` on rejection. The withdrawal states are only ever written
/// by the withdrawal request flow, never by the admin commission
/// endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionStatus {
    Pending,
    Approved,
    Paid,
    Rejected,
    Cancelled,
    WithdrawalRequested,
    WithdrawalApproved,
}

impl CommissionStatus {
    /// Database string form of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            CommissionStatus::Pending => "pending",
            CommissionStatus::Approved => "approved",
            CommissionStatus::Paid => "paid",
            CommissionStatus::Rejected => "rejected",
            CommissionStatus::Cancelled => "cancelled",
            CommissionStatus::WithdrawalRequested => "withdrawal_requested",
            CommissionStatus::WithdrawalApproved => "withdrawal_approved",
        }
    }

    /// Parse a status from its database string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(CommissionStatus::Pending),
            "approved" => Some(CommissionStatus::Approved),
            "paid" => Some(CommissionStatus::Paid),
            "rejected" => Some(CommissionStatus::Rejected),
            "cancelled" => Some(CommissionStatus::Cancelled),
            "withdrawal_requested" => Some(CommissionStatus::WithdrawalRequested),
            "withdrawal_approved" => Some(CommissionStatus::WithdrawalApproved),
            _ => None,
        }
    }

    /// Whether the wallet currently holds this commission's credit.
    ///
    /// The amount is credited at approval and stays credited through
    /// payout; every other state holds no credit.
    pub fn is_credited(self) -> bool {
        matches!(self, CommissionStatus::Approved | CommissionStatus::Paid)
    }
}

/// Request to create a commission (the "lead closed" hook).
///
/// # JSON Example
///
/// ```json
/// {
///   "agent_id": "660e8400-e29b-41d4-a716-446655440001",
///   "product_id": "990e8400-e29b-41d4-a716-446655440004",
///   "lead_id": "aa0e8400-e29b-41d4-a716-446655440005"
/// }
/// ```
///
/// The commission starts with `amount_cents = 0` and `status = pending`;
/// an admin later sets the amount inputs.
#[derive(Debug, Deserialize)]
pub struct CreateCommissionRequest {
    pub agent_id: Uuid,
    pub product_id: Uuid,
    pub lead_id: Uuid,
}

/// Request to update a commission's amount inputs and/or status.
///
/// # JSON Example
///
/// ```json
/// {
///   "base_amount_cents": 100000,
///   "tds_percentage": 10.0,
///   "status": "approved"
/// }
/// ```
///
/// All fields are optional; omitted fields keep their current value.
/// `amount_cents` is intentionally absent — the amount is always derived.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCommissionRequest {
    pub base_amount_cents: Option<i64>,
    pub tds_percentage: Option<f64>,
    pub bonus_cents: Option<i64>,
    pub status: Option<CommissionStatus>,
    pub cancellation_reason: Option<String>,
}

/// Request to update only a commission's amount inputs.
///
/// # JSON Example
///
/// ```json
/// {
///   "base_amount_cents": 100000,
///   "tds_percentage": 15.0
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct UpdateAmountRequest {
    pub base_amount_cents: Option<i64>,
    pub tds_percentage: Option<f64>,
    pub bonus_cents: Option<i64>,
}

/// Request to pay out an approved commission.
///
/// # JSON Example
///
/// ```json
/// {
///   "payment_method": "bank_transfer",
///   "bank_account": "DE89370400440532013000",
///   "payment_reference": "PAYOUT-2026-001"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct PayoutRequest {
    pub payment_method: String,
    pub bank_account: Option<String>,
    pub payment_reference: Option<String>,
}

/// Response returned for commission operations.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "880e8400-e29b-41d4-a716-446655440003",
///   "agent_id": "660e8400-e29b-41d4-a716-446655440001",
///   "product_id": "990e8400-e29b-41d4-a716-446655440004",
///   "lead_id": "aa0e8400-e29b-41d4-a716-446655440005",
///   "base_amount_cents": 100000,
///   "tds_percentage": 10.0,
///   "bonus_cents": 0,
///   "amount_cents": 90000,
///   "status": "approved",
///   "created_at": "2026-01-15T10:30:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct CommissionResponse {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub product_id: Uuid,
    pub lead_id: Uuid,
    pub base_amount_cents: i64,
    pub tds_percentage: f64,
    pub bonus_cents: i64,
    pub amount_cents: i64,
    pub status: String,
    pub cancellation_reason: Option<String>,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Convert database Commission to API CommissionResponse.
///
/// Exposes the TDS rate as a percentage (the API unit) while the
/// database keeps basis points.
impl From<Commission> for CommissionResponse {
    fn from(commission: Commission) -> Self {
        Self {
            id: commission.id,
            agent_id: commission.agent_id,
            product_id: commission.product_id,
            lead_id: commission.lead_id,
            base_amount_cents: commission.base_amount_cents,
            tds_percentage: commission.tds_bps as f64 / 100.0,
            bonus_cents: commission.bonus_cents,
            amount_cents: commission.amount_cents,
            status: commission.status,
            cancellation_reason: commission.cancellation_reason,
            payment_method: commission.payment_method,
            payment_reference: commission.payment_reference,
            paid_at: commission.paid_at,
            created_at: commission.created_at,
            updated_at: commission.updated_at,
        }
    }
}

/// Represents a payout record from the database.
///
/// # Database Table
///
/// Maps to the `payouts` table. A payout is created when an approved
/// commission is paid; it carries the payment details and the amount at
/// payment time. The wallet balance is untouched — the amount was
/// already credited at approval.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Payout {
    pub id: Uuid,
    pub commission_id: Uuid,
    pub agent_id: Uuid,
    pub amount_cents: i64,
    pub payment_method: String,
    pub bank_account: Option<String>,
    pub payment_reference: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip() {
        for status in [
            CommissionStatus::Pending,
            CommissionStatus::Approved,
            CommissionStatus::Paid,
            CommissionStatus::Rejected,
            CommissionStatus::Cancelled,
            CommissionStatus::WithdrawalRequested,
            CommissionStatus::WithdrawalApproved,
        ] {
            assert_eq!(CommissionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(CommissionStatus::parse("open"), None);
    }

    #[test]
    fn only_approved_and_paid_hold_credit() {
        assert!(CommissionStatus::Approved.is_credited());
        assert!(CommissionStatus::Paid.is_credited());
        assert!(!CommissionStatus::Pending.is_credited());
        assert!(!CommissionStatus::Rejected.is_credited());
        assert!(!CommissionStatus::Cancelled.is_credited());
        assert!(!CommissionStatus::WithdrawalRequested.is_credited());
        assert!(!CommissionStatus::WithdrawalApproved.is_credited());
    }
}
