//! Wallet ledger entry model and API response types.
//!
//! This module defines:
//! - `LedgerEntry`: Database entity for one append-only ledger row
//! - `LedgerKind`: the taxonomy of balance-affecting operations
//! - `LedgerReference`: typed pointer to the entity that caused the row
//! - `LedgerEntryResponse`: Response body returned to clients

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Represents a wallet ledger row from the database.
///
/// # Database Table
///
/// Maps to the `wallet_transactions` table. Each row:
/// - Records one signed balance delta (`amount_cents`)
/// - Snapshots the wallet balance *after* the delta (`balance_cents`)
/// - Points at the causing entity via `reference_id` + `reference_model`
///
/// # Reconciliation Invariant
///
/// For a wallet, summing `amount_cents` over all `completed` rows in
/// creation order equals the wallet's current `balance_cents`. The only
/// row ever updated after insertion is a withdrawal debit, which is
/// flipped from `pending` to `completed` when the request is decided.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct LedgerEntry {
    /// Unique identifier for this ledger row
    pub id: Uuid,

    /// Owning wallet
    pub wallet_id: Uuid,

    /// Operation kind (see [`LedgerKind`])
    pub kind: String,

    /// Signed delta applied to the balance for this row
    ///
    /// Positive = credit, negative = debit/reversal.
    pub amount_cents: i64,

    /// Wallet balance snapshot after applying this row
    pub balance_cents: i64,

    /// Row status: "pending", "completed", "failed" or "cancelled"
    pub status: String,

    /// ID of the entity that caused this row
    pub reference_id: Uuid,

    /// Model name of the causing entity ("Commission", "WithdrawalRequest", "Payout")
    pub reference_model: String,

    /// Human-readable audit context
    pub description: Option<String>,

    /// Free-form audit metadata (old/new amount, reason, lead id)
    pub metadata: Option<serde_json::Value>,

    /// When this row was appended
    pub created_at: DateTime<Utc>,
}

/// The taxonomy of balance-affecting operations.
///
/// Each kind carries its own counter rules in the mutation engine:
///
/// | Kind | balance | total_earnings | total_withdrawn | leads_closed |
/// |---|---|---|---|---|
/// | `Commission` | +Δ | +Δ | — | +1 |
/// | `CommissionReversal` / `CommissionCancellation` | +Δ (Δ<0) | +Δ | — | −1 |
/// | `CommissionAdjustment` / `CommissionReduction` / `Adjustment` | +Δ | +Δ | — | — |
/// | `Withdrawal` | +Δ (Δ<0) | — | −Δ | — |
/// | `Refund` | +Δ (Δ>0) | — | −Δ | — |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerKind {
    /// Commission approval credit
    Commission,
    /// Withdrawal request debit (funds locked)
    Withdrawal,
    /// Withdrawal rejection credit-back
    Refund,
    /// Manual balance adjustment
    Adjustment,
    /// Commission rejection / paid-reversal debit
    CommissionReversal,
    /// Upward amount change on an approved commission
    CommissionAdjustment,
    /// Downward amount change on an approved commission
    CommissionReduction,
    /// Commission cancellation debit
    CommissionCancellation,
}

impl LedgerKind {
    /// Database string form of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            LedgerKind::Commission => "commission",
            LedgerKind::Withdrawal => "withdrawal",
            LedgerKind::Refund => "refund",
            LedgerKind::Adjustment => "adjustment",
            LedgerKind::CommissionReversal => "commission_reversal",
            LedgerKind::CommissionAdjustment => "commission_adjustment",
            LedgerKind::CommissionReduction => "commission_reduction",
            LedgerKind::CommissionCancellation => "commission_cancellation",
        }
    }
}

/// Ledger row status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Awaiting admin action (withdrawal debit only)
    Pending,
    /// Applied and final
    Completed,
    /// Rejected before application
    Failed,
    /// Superseded (never counted toward the balance)
    Cancelled,
}

impl EntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Completed => "completed",
            EntryStatus::Failed => "failed",
            EntryStatus::Cancelled => "cancelled",
        }
    }
}

/// Typed pointer to the entity that caused a ledger row.
///
/// The database stores this as a (`reference_id`, `reference_model`) pair;
/// in Rust it is a proper tagged variant so a ledger row can never point
/// at a model name without a matching id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerReference {
    Commission(Uuid),
    WithdrawalRequest(Uuid),
    Payout(Uuid),
}

impl LedgerReference {
    /// The `reference_model` string stored in the database.
    pub fn model(self) -> &'static str {
        match self {
            LedgerReference::Commission(_) => "Commission",
            LedgerReference::WithdrawalRequest(_) => "WithdrawalRequest",
            LedgerReference::Payout(_) => "Payout",
        }
    }

    /// The `reference_id` stored in the database.
    pub fn id(self) -> Uuid {
        match self {
            LedgerReference::Commission(id)
            | LedgerReference::WithdrawalRequest(id)
            | LedgerReference::Payout(id) => id,
        }
    }
}

/// Response returned for ledger listing endpoints.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "770e8400-e29b-41d4-a716-446655440002",
///   "kind": "commission",
///   "amount_cents": 90000,
///   "balance_cents": 90000,
///   "status": "completed",
///   "reference_id": "880e8400-e29b-41d4-a716-446655440003",
///   "reference_model": "Commission",
///   "description": "Commission approved",
///   "created_at": "2026-01-15T10:30:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct LedgerEntryResponse {
    pub id: Uuid,
    pub kind: String,
    pub amount_cents: i64,
    pub balance_cents: i64,
    pub status: String,
    pub reference_id: Uuid,
    pub reference_model: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Convert database LedgerEntry to API LedgerEntryResponse.
///
/// This removes internal fields like `wallet_id` and raw metadata
/// that clients don't need to see.
impl From<LedgerEntry> for LedgerEntryResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id,
            kind: entry.kind,
            amount_cents: entry.amount_cents,
            balance_cents: entry.balance_cents,
            status: entry.status,
            reference_id: entry.reference_id,
            reference_model: entry.reference_model,
            description: entry.description,
            created_at: entry.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_keeps_model_and_id_together() {
        let id = Uuid::new_v4();
        let commission = LedgerReference::Commission(id);
        assert_eq!(commission.model(), "Commission");
        assert_eq!(commission.id(), id);

        let withdrawal = LedgerReference::WithdrawalRequest(id);
        assert_eq!(withdrawal.model(), "WithdrawalRequest");
        assert_eq!(withdrawal.id(), id);
    }

    #[test]
    fn kind_strings_match_database_check_constraint() {
        for (kind, expected) in [
            (LedgerKind::Commission, "commission"),
            (LedgerKind::Withdrawal, "withdrawal"),
            (LedgerKind::Refund, "refund"),
            (LedgerKind::Adjustment, "adjustment"),
            (LedgerKind::CommissionReversal, "commission_reversal"),
            (LedgerKind::CommissionAdjustment, "commission_adjustment"),
            (LedgerKind::CommissionReduction, "commission_reduction"),
            (LedgerKind::CommissionCancellation, "commission_cancellation"),
        ] {
            assert_eq!(kind.as_str(), expected);
        }
    }
}
