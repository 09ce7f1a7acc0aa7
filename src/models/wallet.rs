//! Wallet data model and API response types.
//!
//! This module defines:
//! - `Wallet`: Database entity representing an agent's wallet
//! - `WalletStatus`: status gate for wallet mutations
//! - `WalletResponse`: Response body returned to clients

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Represents a wallet record from the database.
///
/// # Database Table
///
/// Maps to the `wallets` table. Each wallet:
/// - Belongs to exactly one agent (unique on `agent_id`)
/// - Is created lazily on first need and never deleted
/// - Stores all monetary values in cents (never floats!)
///
/// # Balance Storage
///
/// Balances are stored as `i64` cents to avoid floating-point precision issues.
///
/// For example:
/// - $10.50 is stored as 1050 cents
/// - $100.00 is stored as 10000 cents
///
/// # Mutation Path
///
/// `balance_cents`, `total_earnings_cents` and `total_withdrawn_cents` are
/// only ever written by the wallet mutation engine
/// (`services::wallet_service::apply_delta`), which also appends the
/// matching ledger row in the same database transaction.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Wallet {
    /// Unique identifier for this wallet
    pub id: Uuid,

    /// The agent who owns this wallet (unique)
    pub agent_id: Uuid,

    /// Current withdrawable balance in cents
    ///
    /// Must be >= 0 (enforced by database CHECK constraint).
    pub balance_cents: i64,

    /// Cumulative commission credits minus reversals, in cents
    pub total_earnings_cents: i64,

    /// Cumulative amount locked or paid out via withdrawal requests, in cents
    pub total_withdrawn_cents: i64,

    /// Number of commissions currently counted as closed
    ///
    /// Incremented on commission approval, decremented on reversal.
    pub total_leads_closed: i32,

    /// Number of leads the agent has created
    pub total_leads_created: i32,

    /// Wallet status: "active", "suspended" or "blocked"
    ///
    /// Non-active wallets reject every mutation; the gate is enforced
    /// centrally in the mutation engine.
    pub status: String,

    /// Timestamp of the most recent balance mutation
    pub last_transaction_at: Option<DateTime<Utc>>,

    /// Timestamp when wallet was created
    pub created_at: DateTime<Utc>,

    /// Timestamp of last update
    pub updated_at: DateTime<Utc>,
}

/// Wallet status gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletStatus {
    Active,
    Suspended,
    Blocked,
}

impl WalletStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(WalletStatus::Active),
            "suspended" => Some(WalletStatus::Suspended),
            "blocked" => Some(WalletStatus::Blocked),
            _ => None,
        }
    }
}

/// Response body for wallet endpoints.
///
/// # JSON Example
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
///   "status": "active",
///   "last_transaction_at": "2026-01-15T10:30:00Z",
///   "created_at": "2026-01-10T09:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub balance_cents: i64,
    pub total_earnings_cents: i64,
    pub total_withdrawn_cents: i64,
    pub total_leads_closed: i32,
    pub total_leads_created: i32,
    pub status: String,
    pub last_transaction_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Wallet> for WalletResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            id: wallet.id,
            agent_id: wallet.agent_id,
            balance_cents: wallet.balance_cents,
            total_earnings_cents: wallet.total_earnings_cents,
            total_withdrawn_cents: wallet.total_withdrawn_cents,
            total_leads_closed: wallet.total_leads_closed,
            total_leads_created: wallet.total_leads_created,
            status: wallet.status,
            last_transaction_at: wallet.last_transaction_at,
            created_at: wallet.created_at,
        }
    }
}
