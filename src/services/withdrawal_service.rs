//! Withdrawal request service - locking and releasing ledger funds.
//!
//! A withdrawal request snapshots the agent's pending commissions,
//! debits the requested amount from the wallet immediately (optimistic
//! lock, ledger row left `pending`), and lets an admin approve, reject
//! or pay the request. Rejection credits the amount back; approval and
//! payment only move statuses — the balance already reflects the debit
//! from creation.
//!
//! # Atomicity Guarantees
//!
//! Every action runs inside one PostgreSQL transaction covering the
//! request row, the snapshotted commissions, the wallet and the ledger.
//! Row locks are taken request, then commissions, then wallet — the
//! same commissions-before-wallet order the commission service uses.

use serde_json::json;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::ledger::{EntryStatus, LedgerKind, LedgerReference};
use crate::models::withdrawal::{
    CreateWithdrawalRequest, PayWithdrawalRequest, WithdrawalRequest, WithdrawalStatus,
};
use crate::services::notification_service::{Notice, Notifier};
use crate::services::wallet_service::{self, DeltaSpec};

/// Admin actions on a withdrawal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawalAction {
    Approve,
    Reject,
    Pay,
}

impl WithdrawalAction {
    fn as_str(self) -> &'static str {
        match self {
            WithdrawalAction::Approve => "approve",
            WithdrawalAction::Reject => "reject",
            WithdrawalAction::Pay => "pay",
        }
    }
}

/// Guard the withdrawal state machine: only `pending` requests may be
/// approved or rejected, only `approved` requests may be paid.
fn ensure_action_allowed(
    current: WithdrawalStatus,
    action: WithdrawalAction,
) -> Result<(), AppError> {
    let allowed = match action {
        WithdrawalAction::Approve | WithdrawalAction::Reject => {
            current == WithdrawalStatus::Pending
        }
        WithdrawalAction::Pay => current == WithdrawalStatus::Approved,
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::InvalidStateTransition(format!(
            "cannot {} a '{}' withdrawal request",
            action.as_str(),
            current.as_str()
        )))
    }
}

/// Parse a withdrawal request's stored status string.
fn parse_status(status: &str) -> Result<WithdrawalStatus, AppError> {
    WithdrawalStatus::parse(status)
        .ok_or_else(|| AppError::InvalidRequest(format!("unknown withdrawal status '{status}'")))
}

/// Lock a withdrawal request row for the remainder of the transaction.
async fn lock_request(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    request_id: Uuid,
) -> Result<WithdrawalRequest, AppError> {
    sqlx::query_as::<_, WithdrawalRequest>(
        "SELECT * FROM withdrawal_requests WHERE id = $1 FOR UPDATE",
    )
    .bind(request_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(AppError::WithdrawalNotFound)
}

/// Create a withdrawal request and lock the funds.
///
/// # Process
///
/// 1. Start database transaction
/// 2. Collect the agent's whole pending-commission set (`FOR UPDATE`)
///    and flip it to `withdrawal_requested`
/// 3. Insert the request with the commission snapshot
/// 4. Debit the wallet by `amount` via the mutation engine; the ledger
///    row stays `pending` until the admin decides
/// 5. Commit (or roll back everything on error)
///
/// # Errors
///
/// - `InvalidRequest`: non-positive amount or empty bank account
/// - `InsufficientBalance`: wallet can't cover the amount; nothing is
///   mutated
pub async fn create_request(
    pool: &DbPool,
    notifier: &Notifier,
    agent_id: Uuid,
    request: CreateWithdrawalRequest,
) -> Result<WithdrawalRequest, AppError> {
    if request.amount_cents <= 0 {
        return Err(AppError::InvalidRequest(
            "Amount must be positive".to_string(),
        ));
    }
    if request.bank_account.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Bank account is required".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    // Snapshot the whole pending set, not a per-amount selection.
    // Lock order is commissions before wallet everywhere a transaction
    // holds both; ORDER BY keeps the per-row order deterministic too.
    let commission_ids: Vec<Uuid> = sqlx::query_scalar(
        "SELECT id FROM commissions WHERE agent_id = $1 AND status = 'pending' ORDER BY id FOR UPDATE",
    )
    .bind(agent_id)
    .fetch_all(&mut *tx)
    .await?;

    let wallet = wallet_service::get_or_create_wallet(&mut *tx, agent_id).await?;

    let created = sqlx::query_as::<_, WithdrawalRequest>(
        r#"
        INSERT INTO withdrawal_requests (agent_id, amount_cents, bank_account, commission_ids)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(agent_id)
    .bind(request.amount_cents)
    .bind(&request.bank_account)
    .bind(&commission_ids)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE commissions SET status = 'withdrawal_requested', updated_at = NOW() WHERE id = ANY($1)",
    )
    .bind(&commission_ids)
    .execute(&mut *tx)
    .await?;

    // Debit the wallet; fails with INSUFFICIENT_BALANCE before any write
    // if the balance can't cover the amount.
    let debit = wallet_service::apply_delta(
        &mut tx,
        wallet.id,
        DeltaSpec {
            kind: LedgerKind::Withdrawal,
            delta_cents: -request.amount_cents,
            entry_status: EntryStatus::Pending,
            reference: LedgerReference::WithdrawalRequest(created.id),
            description: "Withdrawal requested".to_string(),
            metadata: Some(json!({
                "bank_account": request.bank_account,
                "commission_count": commission_ids.len(),
            })),
        },
    )
    .await?;

    let created = sqlx::query_as::<_, WithdrawalRequest>(
        r#"
        UPDATE withdrawal_requests
        SET debit_transaction_id = $1, updated_at = NOW()
        WHERE id = $2
        RETURNING *
        "#,
    )
    .bind(debit.id)
    .bind(created.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    notifier.dispatch(
        pool.clone(),
        Notice {
            recipient_id: agent_id,
            kind: "withdrawal.requested".to_string(),
            title: "Withdrawal requested".to_string(),
            message: "Your withdrawal request was received and is awaiting review".to_string(),
            data: json!({
                "withdrawal_request_id": created.id,
                "amount_cents": created.amount_cents,
            }),
        },
    );

    Ok(created)
}

/// Approve a pending withdrawal request.
///
/// Flips the snapshotted commissions to `withdrawal_approved` and the
/// pending ledger debit to `completed`. No balance change — the funds
/// were locked at creation.
pub async fn approve_request(
    pool: &DbPool,
    notifier: &Notifier,
    request_id: Uuid,
) -> Result<WithdrawalRequest, AppError> {
    let mut tx = pool.begin().await?;

    let request = lock_request(&mut tx, request_id).await?;
    ensure_action_allowed(parse_status(&request.status)?, WithdrawalAction::Approve)?;

    sqlx::query(
        "UPDATE commissions SET status = 'withdrawal_approved', updated_at = NOW() WHERE id = ANY($1)",
    )
    .bind(&request.commission_ids)
    .execute(&mut *tx)
    .await?;

    if let Some(debit_id) = request.debit_transaction_id {
        wallet_service::set_entry_status(&mut tx, debit_id, EntryStatus::Completed).await?;
    }

    let updated = sqlx::query_as::<_, WithdrawalRequest>(
        r#"
        UPDATE withdrawal_requests
        SET status = 'approved', updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(request_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    notifier.dispatch(
        pool.clone(),
        Notice {
            recipient_id: updated.agent_id,
            kind: "withdrawal.approved".to_string(),
            title: "Withdrawal approved".to_string(),
            message: "Your withdrawal request was approved".to_string(),
            data: json!({
                "withdrawal_request_id": updated.id,
                "amount_cents": updated.amount_cents,
            }),
        },
    );

    Ok(updated)
}

/// Reject a pending withdrawal request.
///
/// Flips the snapshotted commissions back to `pending`, completes the
/// locked debit, and credits the amount back (`kind = refund`) so the
/// balance returns to its pre-request value.
pub async fn reject_request(
    pool: &DbPool,
    notifier: &Notifier,
    request_id: Uuid,
    rejection_reason: Option<String>,
) -> Result<WithdrawalRequest, AppError> {
    let mut tx = pool.begin().await?;

    let request = lock_request(&mut tx, request_id).await?;
    ensure_action_allowed(parse_status(&request.status)?, WithdrawalAction::Reject)?;

    sqlx::query(
        "UPDATE commissions SET status = 'pending', updated_at = NOW() WHERE id = ANY($1)",
    )
    .bind(&request.commission_ids)
    .execute(&mut *tx)
    .await?;

    // The debit and its refund both count as completed from here on, so
    // the completed-row sum still reconciles with the balance.
    if let Some(debit_id) = request.debit_transaction_id {
        wallet_service::set_entry_status(&mut tx, debit_id, EntryStatus::Completed).await?;
    }

    let wallet = wallet_service::get_or_create_wallet(&mut *tx, request.agent_id).await?;
    wallet_service::apply_delta(
        &mut tx,
        wallet.id,
        DeltaSpec {
            kind: LedgerKind::Refund,
            delta_cents: request.amount_cents,
            entry_status: EntryStatus::Completed,
            reference: LedgerReference::WithdrawalRequest(request.id),
            description: "Withdrawal rejected, funds returned".to_string(),
            metadata: Some(json!({ "reason": rejection_reason })),
        },
    )
    .await?;

    let updated = sqlx::query_as::<_, WithdrawalRequest>(
        r#"
        UPDATE withdrawal_requests
        SET status = 'rejected',
            rejection_reason = $1,
            updated_at = NOW()
        WHERE id = $2
        RETURNING *
        "#,
    )
    .bind(&rejection_reason)
    .bind(request_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    notifier.dispatch(
        pool.clone(),
        Notice {
            recipient_id: updated.agent_id,
            kind: "withdrawal.rejected".to_string(),
            title: "Withdrawal rejected".to_string(),
            message: "Your withdrawal request was rejected and the funds were returned"
                .to_string(),
            data: json!({
                "withdrawal_request_id": updated.id,
                "amount_cents": updated.amount_cents,
                "reason": updated.rejection_reason,
            }),
        },
    );

    Ok(updated)
}

/// Pay an approved withdrawal request.
///
/// Flips the snapshotted commissions to `paid` and records the payment
/// details. No balance change — the balance already reflects the debit
/// from creation.
pub async fn pay_request(
    pool: &DbPool,
    notifier: &Notifier,
    request_id: Uuid,
    payment: PayWithdrawalRequest,
) -> Result<WithdrawalRequest, AppError> {
    let mut tx = pool.begin().await?;

    let request = lock_request(&mut tx, request_id).await?;
    ensure_action_allowed(parse_status(&request.status)?, WithdrawalAction::Pay)?;

    sqlx::query(
        r#"
        UPDATE commissions
        SET status = 'paid',
            payment_method = $1,
            payment_reference = $2,
            paid_at = NOW(),
            updated_at = NOW()
        WHERE id = ANY($3)
        "#,
    )
    .bind(&payment.payment_method)
    .bind(&payment.payment_reference)
    .bind(&request.commission_ids)
    .execute(&mut *tx)
    .await?;

    let updated = sqlx::query_as::<_, WithdrawalRequest>(
        r#"
        UPDATE withdrawal_requests
        SET status = 'paid',
            payment_method = $1,
            payment_reference = $2,
            paid_at = NOW(),
            updated_at = NOW()
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(&payment.payment_method)
    .bind(&payment.payment_reference)
    .bind(request_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    notifier.dispatch(
        pool.clone(),
        Notice {
            recipient_id: updated.agent_id,
            kind: "withdrawal.paid".to_string(),
            title: "Withdrawal paid".to_string(),
            message: "Your withdrawal has been paid out".to_string(),
            data: json!({
                "withdrawal_request_id": updated.id,
                "amount_cents": updated.amount_cents,
                "payment_reference": updated.payment_reference,
            }),
        },
    );

    Ok(updated)
}

/// Get a withdrawal request by ID.
pub async fn get_request(
    pool: &DbPool,
    request_id: Uuid,
) -> Result<Option<WithdrawalRequest>, AppError> {
    let request =
        sqlx::query_as::<_, WithdrawalRequest>("SELECT * FROM withdrawal_requests WHERE id = $1")
            .bind(request_id)
            .fetch_optional(pool)
            .await?;

    Ok(request)
}

/// List withdrawal requests, optionally scoped to one agent.
pub async fn list_requests(
    pool: &DbPool,
    agent_scope: Option<Uuid>,
) -> Result<Vec<WithdrawalRequest>, AppError> {
    let requests = match agent_scope {
        Some(agent_id) => {
            sqlx::query_as::<_, WithdrawalRequest>(
                "SELECT * FROM withdrawal_requests WHERE agent_id = $1 ORDER BY created_at DESC",
            )
            .bind(agent_id)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, WithdrawalRequest>(
                "SELECT * FROM withdrawal_requests ORDER BY created_at DESC",
            )
            .fetch_all(pool)
            .await?
        }
    };

    Ok(requests)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_requests_can_be_approved_or_rejected() {
        assert!(ensure_action_allowed(WithdrawalStatus::Pending, WithdrawalAction::Approve).is_ok());
        assert!(ensure_action_allowed(WithdrawalStatus::Pending, WithdrawalAction::Reject).is_ok());

        for status in [
            WithdrawalStatus::Approved,
            WithdrawalStatus::Rejected,
            WithdrawalStatus::Paid,
        ] {
            assert!(matches!(
                ensure_action_allowed(status, WithdrawalAction::Approve),
                Err(AppError::InvalidStateTransition(_))
            ));
            assert!(matches!(
                ensure_action_allowed(status, WithdrawalAction::Reject),
                Err(AppError::InvalidStateTransition(_))
            ));
        }
    }

    #[test]
    fn only_approved_requests_can_be_paid() {
        assert!(ensure_action_allowed(WithdrawalStatus::Approved, WithdrawalAction::Pay).is_ok());

        for status in [
            WithdrawalStatus::Pending,
            WithdrawalStatus::Rejected,
            WithdrawalStatus::Paid,
        ] {
            assert!(matches!(
                ensure_action_allowed(status, WithdrawalAction::Pay),
                Err(AppError::InvalidStateTransition(_))
            ));
        }
    }
}
