//! Wallet service - the accessor and the mutation engine.
//!
//! This service handles:
//! - Lazy get-or-create of the per-agent wallet
//! - `apply_delta`, the single guarded primitive that mutates
//!   `balance_cents` / `total_earnings_cents` / `total_withdrawn_cents`
//! - Ledger listing and the pending -> completed flip of withdrawal debits
//!
//! # Atomicity Guarantees
//!
//! `apply_delta` runs inside the caller's PostgreSQL transaction: the
//! wallet row is locked with FOR UPDATE, updated, and the matching ledger
//! row is appended before the caller commits. Wallet update and ledger
//! append therefore commit or roll back together, so the ledger never
//! diverges from the balance snapshot. No other code path writes the
//! wallet's monetary fields.

use sqlx::{PgExecutor, Postgres, Transaction};
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::ledger::{EntryStatus, LedgerEntry, LedgerKind, LedgerReference};
use crate::models::wallet::{Wallet, WalletStatus};
use crate::services::transition::counter_effects;

/// Get the agent's wallet, creating it with zeroed counters on first access.
///
/// # Concurrency
///
/// Implemented as a single `INSERT ... ON CONFLICT ... RETURNING`
/// statement so two concurrent first-accesses cannot race into a
/// duplicate wallet; the loser of the insert simply returns the winner's
/// row.
///
/// # Arguments
///
/// * `executor` - Pool or open transaction; callers that go on to mutate
///   the wallet pass their transaction so the row stays consistent
/// * `agent_id` - Owning agent
pub async fn get_or_create_wallet<'e, E>(executor: E, agent_id: Uuid) -> Result<Wallet, AppError>
where
    E: PgExecutor<'e>,
{
    let wallet = sqlx::query_as::<_, Wallet>(
        r#"
        INSERT INTO wallets (agent_id)
        VALUES ($1)
        ON CONFLICT (agent_id) DO UPDATE SET agent_id = EXCLUDED.agent_id
        RETURNING *
        "#,
    )
    .bind(agent_id)
    .fetch_one(executor)
    .await?;

    Ok(wallet)
}

/// One balance mutation for `apply_delta`.
#[derive(Debug, Clone)]
pub struct DeltaSpec {
    /// Operation kind; decides the counter rules
    pub kind: LedgerKind,

    /// Signed delta applied to the balance
    pub delta_cents: i64,

    /// Status of the appended ledger row
    ///
    /// `Completed` for everything except a withdrawal-request debit,
    /// which stays `Pending` until the admin decides the request.
    pub entry_status: EntryStatus,

    /// The entity that caused this mutation
    pub reference: LedgerReference,

    /// Human-readable audit context
    pub description: String,

    /// Free-form audit metadata (old/new amount, reason, lead id)
    pub metadata: Option<serde_json::Value>,
}

/// Decide whether a wallet in the given state may take a delta.
///
/// Pure guard shared by `apply_delta`: rejects any mutation on a
/// non-active wallet, and a withdrawal debit the balance cannot cover.
/// Other debit kinds (reversals, reductions) pass here and rely on the
/// database CHECK constraint to catch an undershooting balance.
pub fn check_delta(
    status: &str,
    balance_cents: i64,
    kind: LedgerKind,
    delta_cents: i64,
) -> Result<(), AppError> {
    if WalletStatus::parse(status) != Some(WalletStatus::Active) {
        return Err(AppError::WalletInactive(status.to_string()));
    }

    if kind == LedgerKind::Withdrawal && balance_cents + delta_cents < 0 {
        return Err(AppError::InsufficientBalance);
    }

    Ok(())
}

/// Apply one balance delta atomically and append the matching ledger row.
///
/// # Process
///
/// 1. Lock the wallet row (`SELECT ... FOR UPDATE`)
/// 2. Reject mutations on suspended/blocked wallets
/// 3. Reject a withdrawal debit the balance cannot cover
/// 4. Apply balance + per-kind counter deltas in one UPDATE
/// 5. Append the ledger row carrying the post-mutation balance snapshot
///
/// # Errors
///
/// - `WalletNotFound`: wallet doesn't exist
/// - `WalletInactive`: wallet is suspended or blocked
/// - `InsufficientBalance`: withdrawal debit exceeds the balance
/// - `Database`: database error occurred (including the CHECK constraint
///   firing if any other kind would drive the balance negative)
pub async fn apply_delta(
    tx: &mut Transaction<'_, Postgres>,
    wallet_id: Uuid,
    spec: DeltaSpec,
) -> Result<LedgerEntry, AppError> {
    // Lock the wallet row for the remainder of the transaction.
    // FOR UPDATE ensures no other transaction can modify this row.
    let wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE id = $1 FOR UPDATE")
        .bind(wallet_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(AppError::WalletNotFound)?;

    // Status gate and balance pre-check, enforced centrally for every
    // mutation path.
    check_delta(
        &wallet.status,
        wallet.balance_cents,
        spec.kind,
        spec.delta_cents,
    )?;

    let effects = counter_effects(spec.kind, spec.delta_cents);

    // Balance and counters move in the same statement as the lock,
    // so the snapshot we write to the ledger below cannot be stale.
    let new_balance: i64 = sqlx::query_scalar(
        r#"
        UPDATE wallets
        SET balance_cents = balance_cents + $1,
            total_earnings_cents = total_earnings_cents + $2,
            total_withdrawn_cents = total_withdrawn_cents + $3,
            total_leads_closed = total_leads_closed + $4,
            last_transaction_at = NOW(),
            updated_at = NOW()
        WHERE id = $5
        RETURNING balance_cents
        "#,
    )
    .bind(spec.delta_cents)
    .bind(effects.earnings_delta)
    .bind(effects.withdrawn_delta)
    .bind(effects.leads_closed_delta)
    .bind(wallet_id)
    .fetch_one(&mut **tx)
    .await?;

    // Append the ledger row with the post-mutation balance snapshot.
    let entry = sqlx::query_as::<_, LedgerEntry>(
        r#"
        INSERT INTO wallet_transactions (
            wallet_id,
            kind,
            amount_cents,
            balance_cents,
            status,
            reference_id,
            reference_model,
            description,
            metadata
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(wallet_id)
    .bind(spec.kind.as_str())
    .bind(spec.delta_cents)
    .bind(new_balance)
    .bind(spec.entry_status.as_str())
    .bind(spec.reference.id())
    .bind(spec.reference.model())
    .bind(&spec.description)
    .bind(&spec.metadata)
    .fetch_one(&mut **tx)
    .await?;

    Ok(entry)
}

/// Flip a ledger row's status (pending withdrawal debit -> completed).
///
/// This is the only post-insertion update the ledger ever sees.
pub async fn set_entry_status(
    tx: &mut Transaction<'_, Postgres>,
    entry_id: Uuid,
    status: EntryStatus,
) -> Result<(), AppError> {
    sqlx::query("UPDATE wallet_transactions SET status = $1 WHERE id = $2")
        .bind(status.as_str())
        .bind(entry_id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

/// Record a "lead created" event: bump the wallet's created-leads counter.
///
/// Creates the wallet on first access; the counter is not part of the
/// monetary invariant, so no ledger row is written.
pub async fn record_lead_created(pool: &DbPool, agent_id: Uuid) -> Result<Wallet, AppError> {
    get_or_create_wallet(pool, agent_id).await?;

    let wallet = sqlx::query_as::<_, Wallet>(
        r#"
        UPDATE wallets
        SET total_leads_created = total_leads_created + 1,
            updated_at = NOW()
        WHERE agent_id = $1
        RETURNING *
        "#,
    )
    .bind(agent_id)
    .fetch_one(pool)
    .await?;

    Ok(wallet)
}

/// List a wallet's ledger, newest first.
pub async fn list_ledger(pool: &DbPool, wallet_id: Uuid) -> Result<Vec<LedgerEntry>, AppError> {
    let entries = sqlx::query_as::<_, LedgerEntry>(
        "SELECT * FROM wallet_transactions WHERE wallet_id = $1 ORDER BY created_at DESC",
    )
    .bind(wallet_id)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [LedgerKind; 8] = [
        LedgerKind::Commission,
        LedgerKind::Withdrawal,
        LedgerKind::Refund,
        LedgerKind::Adjustment,
        LedgerKind::CommissionReversal,
        LedgerKind::CommissionAdjustment,
        LedgerKind::CommissionReduction,
        LedgerKind::CommissionCancellation,
    ];

    #[test]
    fn withdrawal_debit_beyond_balance_is_rejected() {
        assert!(matches!(
            check_delta("active", 4_999, LedgerKind::Withdrawal, -5_000),
            Err(AppError::InsufficientBalance)
        ));
        assert!(matches!(
            check_delta("active", 0, LedgerKind::Withdrawal, -1),
            Err(AppError::InsufficientBalance)
        ));
    }

    #[test]
    fn withdrawal_debit_up_to_exact_balance_is_allowed() {
        assert!(check_delta("active", 5_000, LedgerKind::Withdrawal, -5_000).is_ok());
        assert!(check_delta("active", 5_000, LedgerKind::Withdrawal, -4_999).is_ok());
    }

    #[test]
    fn non_active_wallet_rejects_every_kind() {
        for status in ["suspended", "blocked"] {
            for kind in ALL_KINDS {
                assert!(
                    matches!(
                        check_delta(status, 100_000, kind, 1_000),
                        Err(AppError::WalletInactive(_))
                    ),
                    "{status} wallet should reject {kind:?}"
                );
            }
        }
        // a corrupt status string is treated as inactive, never as active
        assert!(matches!(
            check_delta("frozen", 100_000, LedgerKind::Commission, 1_000),
            Err(AppError::WalletInactive(_))
        ));
    }

    #[test]
    fn active_wallet_accepts_credits_and_commission_debits() {
        assert!(check_delta("active", 0, LedgerKind::Commission, 90_000).is_ok());
        assert!(check_delta("active", 90_000, LedgerKind::Refund, 1_000).is_ok());
        // reversal debits pass the guard; the balance CHECK constraint
        // is the backstop for an undershoot
        assert!(check_delta("active", 90_000, LedgerKind::CommissionReversal, -90_000).is_ok());
    }
}
