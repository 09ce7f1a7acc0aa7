//! Commission service - lifecycle orchestration for commissions.
//!
//! This service handles:
//! - Creating the zero-amount pending commission when a lead closes
//! - Admin field updates: recomputing the derived amount and running the
//!   transition planner
//! - Applying planned wallet operations atomically via the mutation engine
//! - Paying out an approved commission (payout record, no wallet delta)
//!
//! # Atomicity Guarantees
//!
//! Each update locks the commission row, plans the required wallet
//! operations, applies them through `wallet_service::apply_delta`, and
//! updates the commission — all inside one PostgreSQL transaction. A
//! planning or validation error aborts before any wallet write.
//!
//! Every transaction that holds both takes commission row locks before
//! the wallet row lock; the withdrawal service follows the same order.

use serde_json::json;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::commission::{
    Commission, CommissionStatus, CreateCommissionRequest, Payout, PayoutRequest,
    UpdateCommissionRequest,
};
use crate::models::ledger::{EntryStatus, LedgerReference};
use crate::services::notification_service::{Notice, Notifier};
use crate::services::transition::{
    CommissionSnapshot, derive_amount_cents, plan_transition, tds_percentage_to_bps,
};
use crate::services::wallet_service::{self, DeltaSpec};

/// Parse a commission's stored status string.
///
/// The CHECK constraint keeps the column within the known set, so a
/// parse failure indicates a corrupt row.
fn parse_status(status: &str) -> Result<CommissionStatus, AppError> {
    CommissionStatus::parse(status)
        .ok_or_else(|| AppError::InvalidRequest(format!("unknown commission status '{status}'")))
}

/// Format cents as a decimal string for human-readable messages.
fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!("{sign}{}.{:02}", cents / 100, cents % 100)
}

/// Create a commission for a closed lead.
///
/// The commission starts at `amount_cents = 0` and `status = pending`;
/// the agent's wallet is created alongside it if this is the agent's
/// first touchpoint.
pub async fn create_commission(
    pool: &DbPool,
    notifier: &Notifier,
    request: CreateCommissionRequest,
) -> Result<Commission, AppError> {
    // Ensure the wallet exists before the commission references the agent
    wallet_service::get_or_create_wallet(pool, request.agent_id).await?;

    let commission = sqlx::query_as::<_, Commission>(
        r#"
        INSERT INTO commissions (agent_id, product_id, lead_id)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(request.agent_id)
    .bind(request.product_id)
    .bind(request.lead_id)
    .fetch_one(pool)
    .await?;

    notifier.dispatch(
        pool.clone(),
        Notice {
            recipient_id: commission.agent_id,
            kind: "commission.created".to_string(),
            title: "Commission created".to_string(),
            message: "A commission was created for your closed lead".to_string(),
            data: json!({
                "commission_id": commission.id,
                "lead_id": commission.lead_id,
            }),
        },
    );

    Ok(commission)
}

/// Get a commission by ID.
pub async fn get_commission(
    pool: &DbPool,
    commission_id: Uuid,
) -> Result<Option<Commission>, AppError> {
    let commission = sqlx::query_as::<_, Commission>("SELECT * FROM commissions WHERE id = $1")
        .bind(commission_id)
        .fetch_optional(pool)
        .await?;

    Ok(commission)
}

/// List commissions, optionally scoped to one agent.
///
/// Admins pass `None` to see everything; agents are always scoped to
/// themselves by the handler.
pub async fn list_commissions(
    pool: &DbPool,
    agent_scope: Option<Uuid>,
) -> Result<Vec<Commission>, AppError> {
    let commissions = match agent_scope {
        Some(agent_id) => {
            sqlx::query_as::<_, Commission>(
                "SELECT * FROM commissions WHERE agent_id = $1 ORDER BY created_at DESC",
            )
            .bind(agent_id)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Commission>("SELECT * FROM commissions ORDER BY created_at DESC")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(commissions)
}

/// Update a commission's amount inputs and/or status.
///
/// # Process
///
/// 1. Start database transaction, lock the commission row
/// 2. Recompute the derived amount if any amount input changed
/// 3. Plan the required wallet operations from the before/after snapshot
/// 4. Apply each operation via the mutation engine (same transaction)
/// 5. Persist the commission, commit
/// 6. Dispatch a best-effort notification
///
/// # Errors
///
/// - `CommissionNotFound`: commission doesn't exist
/// - `InvalidStateTransition`: illegal status change, or an amount edit on
///   a commission that is neither pending nor approved
/// - `InvalidAmount`: recomputed amount would be negative
/// - Anything `apply_delta` raises; the whole transaction rolls back
pub async fn update_commission(
    pool: &DbPool,
    notifier: &Notifier,
    commission_id: Uuid,
    request: UpdateCommissionRequest,
) -> Result<Commission, AppError> {
    let mut tx = pool.begin().await?;

    let commission =
        sqlx::query_as::<_, Commission>("SELECT * FROM commissions WHERE id = $1 FOR UPDATE")
            .bind(commission_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::CommissionNotFound)?;

    let old_status = parse_status(&commission.status)?;

    let amount_edited = request.base_amount_cents.is_some()
        || request.tds_percentage.is_some()
        || request.bonus_cents.is_some();

    // Amount inputs are only editable while the commission is pending or
    // approved. In particular a paid commission's amount is frozen, which
    // keeps a later paid-reversal unambiguous.
    if amount_edited
        && !matches!(
            old_status,
            CommissionStatus::Pending | CommissionStatus::Approved
        )
    {
        return Err(AppError::InvalidStateTransition(format!(
            "cannot edit amount of a '{}' commission",
            old_status.as_str()
        )));
    }

    let base_amount_cents = request
        .base_amount_cents
        .unwrap_or(commission.base_amount_cents);
    let tds_bps = match request.tds_percentage {
        Some(percentage) => tds_percentage_to_bps(percentage)?,
        None => commission.tds_bps,
    };
    let bonus_cents = request.bonus_cents.unwrap_or(commission.bonus_cents);

    // The amount is always derived, never taken from input.
    let new_amount_cents = if amount_edited {
        derive_amount_cents(base_amount_cents, tds_bps, bonus_cents)?
    } else {
        commission.amount_cents
    };

    let new_status = request.status.unwrap_or(old_status);

    let ops = plan_transition(
        CommissionSnapshot {
            status: old_status,
            amount_cents: commission.amount_cents,
        },
        CommissionSnapshot {
            status: new_status,
            amount_cents: new_amount_cents,
        },
    )?;

    if !ops.is_empty() {
        let wallet = wallet_service::get_or_create_wallet(&mut *tx, commission.agent_id).await?;
        for op in &ops {
            let mut metadata = op.metadata.clone();
            if let Some(map) = metadata.as_object_mut() {
                map.insert("lead_id".to_string(), json!(commission.lead_id));
                if let Some(ref reason) = request.cancellation_reason {
                    map.insert("reason".to_string(), json!(reason));
                }
            }

            wallet_service::apply_delta(
                &mut tx,
                wallet.id,
                DeltaSpec {
                    kind: op.kind,
                    delta_cents: op.delta_cents,
                    entry_status: EntryStatus::Completed,
                    reference: LedgerReference::Commission(commission.id),
                    description: op.description.clone(),
                    metadata: Some(metadata),
                },
            )
            .await?;
        }
    }

    let updated = sqlx::query_as::<_, Commission>(
        r#"
        UPDATE commissions
        SET base_amount_cents = $1,
            tds_bps = $2,
            bonus_cents = $3,
            amount_cents = $4,
            status = $5,
            cancellation_reason = COALESCE($6, cancellation_reason),
            updated_at = NOW()
        WHERE id = $7
        RETURNING *
        "#,
    )
    .bind(base_amount_cents)
    .bind(tds_bps)
    .bind(bonus_cents)
    .bind(new_amount_cents)
    .bind(new_status.as_str())
    .bind(&request.cancellation_reason)
    .bind(commission_id)
    .fetch_one(&mut *tx)
    .await?;

    // Commit all changes atomically
    tx.commit().await?;

    // Notify after commit; a notification failure cannot undo the mutation
    if new_status != old_status {
        notifier.dispatch(
            pool.clone(),
            Notice {
                recipient_id: updated.agent_id,
                kind: format!("commission.{}", new_status.as_str()),
                title: format!("Commission {}", new_status.as_str()),
                message: format!(
                    "Your commission of {} is now {}",
                    format_cents(updated.amount_cents),
                    new_status.as_str()
                ),
                data: json!({
                    "commission_id": updated.id,
                    "amount_cents": updated.amount_cents,
                    "old_status": old_status.as_str(),
                    "new_status": new_status.as_str(),
                }),
            },
        );
    } else if new_amount_cents != commission.amount_cents {
        notifier.dispatch(
            pool.clone(),
            Notice {
                recipient_id: updated.agent_id,
                kind: "commission.amount_updated".to_string(),
                title: "Commission amount updated".to_string(),
                message: format!(
                    "Your commission amount changed from {} to {}",
                    format_cents(commission.amount_cents),
                    format_cents(new_amount_cents)
                ),
                data: json!({
                    "commission_id": updated.id,
                    "old_amount_cents": commission.amount_cents,
                    "new_amount_cents": new_amount_cents,
                }),
            },
        );
    }

    Ok(updated)
}

/// Pay out an approved commission.
///
/// Creates a payout record carrying the payment details and flips the
/// commission to `paid`. The wallet is untouched: the amount was already
/// credited at approval, so payment is a pure status transition plus
/// bookkeeping.
///
/// # Errors
///
/// - `CommissionNotFound`: commission doesn't exist
/// - `InvalidStateTransition`: commission is not `approved`
pub async fn payout_commission(
    pool: &DbPool,
    notifier: &Notifier,
    commission_id: Uuid,
    request: PayoutRequest,
) -> Result<Commission, AppError> {
    let mut tx = pool.begin().await?;

    let commission =
        sqlx::query_as::<_, Commission>("SELECT * FROM commissions WHERE id = $1 FOR UPDATE")
            .bind(commission_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::CommissionNotFound)?;

    let status = parse_status(&commission.status)?;
    if status != CommissionStatus::Approved {
        return Err(AppError::InvalidStateTransition(format!(
            "only approved commissions can be paid out, this one is '{}'",
            status.as_str()
        )));
    }

    let payout = sqlx::query_as::<_, Payout>(
        r#"
        INSERT INTO payouts (
            commission_id,
            agent_id,
            amount_cents,
            payment_method,
            bank_account,
            payment_reference
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(commission.id)
    .bind(commission.agent_id)
    .bind(commission.amount_cents)
    .bind(&request.payment_method)
    .bind(&request.bank_account)
    .bind(&request.payment_reference)
    .fetch_one(&mut *tx)
    .await?;

    let updated = sqlx::query_as::<_, Commission>(
        r#"
        UPDATE commissions
        SET status = 'paid',
            payment_method = $1,
            bank_account = $2,
            payment_reference = $3,
            paid_at = NOW(),
            updated_at = NOW()
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(&request.payment_method)
    .bind(&request.bank_account)
    .bind(&request.payment_reference)
    .bind(commission_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    notifier.dispatch(
        pool.clone(),
        Notice {
            recipient_id: updated.agent_id,
            kind: "commission.paid".to_string(),
            title: "Commission paid".to_string(),
            message: format!(
                "Your commission of {} has been paid out",
                format_cents(updated.amount_cents)
            ),
            data: json!({
                "commission_id": updated.id,
                "payout_id": payout.id,
                "amount_cents": updated.amount_cents,
            }),
        },
    );

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_cents_for_messages() {
        assert_eq!(format_cents(90_000), "900.00");
        assert_eq!(format_cents(250), "2.50");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-5_000), "-50.00");
    }

    #[test]
    fn parses_stored_status_strings() {
        assert_eq!(parse_status("approved").unwrap(), CommissionStatus::Approved);
        assert!(parse_status("nonsense").is_err());
    }
}
