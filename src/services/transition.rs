//! Commission transition planning - the state machine core.
//!
//! This module is pure: it takes a commission's before/after snapshot and
//! returns the list of wallet operations the mutation engine must apply.
//! Keeping transition detection separate from the engine means every
//! balance effect is decided in exactly one place and can be tested
//! without a database.
//!
//! # Derivation Rule
//!
//! At every save: `amount = base − base × tds_bps / 10000 + bonus`,
//! in integer cents. A negative result is rejected before any write.
//!
//! # Credit Rule
//!
//! The wallet holds a commission's credit exactly while its status is
//! `approved` or `paid`. Crossing into that set credits the current
//! amount, crossing out debits it, and an amount change while `approved`
//! moves the balance by the difference.

use serde_json::json;

use crate::error::AppError;
use crate::models::commission::CommissionStatus;
use crate::models::ledger::LedgerKind;

/// Amount changes at or below this threshold produce no ledger row.
///
/// One cent absorbs the rounding differences that occur when the TDS
/// percentage is edited back and forth, avoiding spurious zero-value
/// ledger rows.
pub const AMOUNT_TOLERANCE_CENTS: i64 = 1;

/// A commission as the planner sees it: status plus derived amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionSnapshot {
    pub status: CommissionStatus,
    pub amount_cents: i64,
}

/// One wallet operation required by a transition.
///
/// The mutation engine applies each op atomically: wallet update plus
/// ledger append in the same database transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletOp {
    pub kind: LedgerKind,
    pub delta_cents: i64,
    pub description: String,
    pub metadata: serde_json::Value,
}

/// Counter deltas a ledger kind implies beyond the balance itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterEffects {
    pub earnings_delta: i64,
    pub withdrawn_delta: i64,
    pub leads_closed_delta: i32,
}

/// Per-kind counter rules.
///
/// This is the single source of truth for how a ledger kind moves the
/// wallet's lifetime statistics; the mutation engine and the tests both
/// derive their numbers from it.
pub fn counter_effects(kind: LedgerKind, delta_cents: i64) -> CounterEffects {
    match kind {
        // Approval credit: earnings up, one more closed lead.
        LedgerKind::Commission => CounterEffects {
            earnings_delta: delta_cents,
            withdrawn_delta: 0,
            leads_closed_delta: 1,
        },
        // Rejection/cancellation debit: earnings down, one fewer closed lead.
        LedgerKind::CommissionReversal | LedgerKind::CommissionCancellation => CounterEffects {
            earnings_delta: delta_cents,
            withdrawn_delta: 0,
            leads_closed_delta: -1,
        },
        // Amount change on an approved commission: earnings track the delta.
        LedgerKind::CommissionAdjustment
        | LedgerKind::CommissionReduction
        | LedgerKind::Adjustment => CounterEffects {
            earnings_delta: delta_cents,
            withdrawn_delta: 0,
            leads_closed_delta: 0,
        },
        // Withdrawal debit: delta is negative, withdrawn grows by the amount.
        // Refund credit-back: delta is positive, withdrawn shrinks by it.
        LedgerKind::Withdrawal | LedgerKind::Refund => CounterEffects {
            earnings_delta: 0,
            withdrawn_delta: -delta_cents,
            leads_closed_delta: 0,
        },
    }
}

/// Convert an API TDS percentage into basis points.
pub fn tds_percentage_to_bps(percentage: f64) -> Result<i32, AppError> {
    if !percentage.is_finite() || !(0.0..=100.0).contains(&percentage) {
        return Err(AppError::InvalidRequest(
            "tds_percentage must be between 0 and 100".to_string(),
        ));
    }
    Ok((percentage * 100.0).round() as i32)
}

/// Derive a commission's payable amount.
///
/// `amount = base − base × tds_bps / 10000 + bonus`, with the TDS share
/// rounded half-up. Rejects negative inputs and a negative result with
/// `INVALID_AMOUNT`.
pub fn derive_amount_cents(
    base_amount_cents: i64,
    tds_bps: i32,
    bonus_cents: i64,
) -> Result<i64, AppError> {
    if base_amount_cents < 0 {
        return Err(AppError::InvalidAmount(
            "base amount cannot be negative".to_string(),
        ));
    }
    if !(0..=10_000).contains(&tds_bps) {
        return Err(AppError::InvalidRequest(
            "tds_percentage must be between 0 and 100".to_string(),
        ));
    }
    if bonus_cents < 0 {
        return Err(AppError::InvalidAmount(
            "bonus cannot be negative".to_string(),
        ));
    }

    // i128 intermediate so base × bps cannot overflow
    let tds_share = (base_amount_cents as i128 * tds_bps as i128 + 5_000) / 10_000;
    let amount = base_amount_cents as i128 - tds_share + bonus_cents as i128;
    if amount < 0 {
        return Err(AppError::InvalidAmount(format!(
            "derived commission amount is negative ({amount} cents)"
        )));
    }
    i64::try_from(amount)
        .map_err(|_| AppError::InvalidAmount("derived commission amount overflows".to_string()))
}

/// Plan the wallet operations required to move a commission from `old`
/// to `new`.
///
/// # Rules
///
/// - Same status, `approved`, amount changed: one
///   `commission_adjustment`/`commission_reduction` op for the
///   difference, skipped when `|Δ| ≤ 1` cent.
/// - Entering the credited set (only legal via `approved`): one
///   `commission` credit of the new amount.
/// - Leaving the credited set: one debit of the old amount —
///   `commission_cancellation` when landing on `cancelled`, otherwise
///   `commission_reversal` (rejection, or reverting a paid commission).
/// - `approved → paid`: no wallet op; the payout record is the caller's
///   concern.
///
/// # Errors
///
/// `INVALID_STATE_TRANSITION` for anything outside the allowed set, in
/// particular `paid → approved` (the credit never left, so "re-approving"
/// is meaningless), direct `pending → paid`, and any admin write into or
/// out of the withdrawal-flow statuses.
pub fn plan_transition(
    old: CommissionSnapshot,
    new: CommissionSnapshot,
) -> Result<Vec<WalletOp>, AppError> {
    use CommissionStatus::*;

    let metadata = json!({
        "old_status": old.status.as_str(),
        "new_status": new.status.as_str(),
        "old_amount_cents": old.amount_cents,
        "new_amount_cents": new.amount_cents,
    });

    // No status change: the only possible effect is an amount change on
    // an approved commission.
    if old.status == new.status {
        if old.status == Approved {
            let delta = new.amount_cents - old.amount_cents;
            if delta.abs() > AMOUNT_TOLERANCE_CENTS {
                let (kind, description) = if delta > 0 {
                    (LedgerKind::CommissionAdjustment, "Commission amount adjusted")
                } else {
                    (LedgerKind::CommissionReduction, "Commission amount reduced")
                };
                return Ok(vec![WalletOp {
                    kind,
                    delta_cents: delta,
                    description: description.to_string(),
                    metadata,
                }]);
            }
        }
        return Ok(vec![]);
    }

    // Withdrawal-flow statuses are owned by the withdrawal request flow.
    if matches!(old.status, WithdrawalRequested | WithdrawalApproved)
        || matches!(new.status, WithdrawalRequested | WithdrawalApproved)
    {
        return Err(AppError::InvalidStateTransition(format!(
            "cannot move commission from '{}' to '{}' outside the withdrawal flow",
            old.status.as_str(),
            new.status.as_str()
        )));
    }

    let allowed = matches!(
        (old.status, new.status),
        (Pending, Approved | Rejected | Cancelled)
            | (Approved, Paid | Rejected | Cancelled)
            | (Paid, Pending | Rejected | Cancelled)
            | (Rejected | Cancelled, Pending | Approved)
    );
    if !allowed {
        return Err(AppError::InvalidStateTransition(format!(
            "cannot move commission from '{}' to '{}'",
            old.status.as_str(),
            new.status.as_str()
        )));
    }

    let ops = match (old.status.is_credited(), new.status.is_credited()) {
        // Entering the credited set: credit the (possibly just-derived)
        // new amount. The op exists even for a zero amount because the
        // closed-leads counter rides on it.
        (false, true) => vec![WalletOp {
            kind: LedgerKind::Commission,
            delta_cents: new.amount_cents,
            description: "Commission approved".to_string(),
            metadata,
        }],
        // Leaving the credited set: take back the old amount.
        (true, false) => {
            let (kind, description) = match new.status {
                Cancelled => (LedgerKind::CommissionCancellation, "Commission cancelled"),
                Rejected => (LedgerKind::CommissionReversal, "Commission rejected"),
                _ => (LedgerKind::CommissionReversal, "Commission payment reverted"),
            };
            vec![WalletOp {
                kind,
                delta_cents: -old.amount_cents,
                description: description.to_string(),
                metadata,
            }]
        }
        // approved → paid: the credit stays where it is.
        (true, true) => vec![],
        // e.g. pending → rejected: nothing was ever credited.
        (false, false) => vec![],
    };

    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use CommissionStatus::*;

    fn snap(status: CommissionStatus, amount_cents: i64) -> CommissionSnapshot {
        CommissionSnapshot {
            status,
            amount_cents,
        }
    }

    /// In-memory mirror of the wallet mutation engine, driven by the same
    /// `counter_effects` table, used to check end-to-end accounting of
    /// planned operation sequences.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct WalletSim {
        balance_cents: i64,
        total_earnings_cents: i64,
        total_withdrawn_cents: i64,
        total_leads_closed: i32,
        completed_ledger: Vec<i64>,
    }

    impl WalletSim {
        fn apply(&mut self, kind: LedgerKind, delta_cents: i64) {
            let effects = counter_effects(kind, delta_cents);
            self.balance_cents += delta_cents;
            self.total_earnings_cents += effects.earnings_delta;
            self.total_withdrawn_cents += effects.withdrawn_delta;
            self.total_leads_closed += effects.leads_closed_delta;
            self.completed_ledger.push(delta_cents);
        }

        fn apply_ops(&mut self, ops: &[WalletOp]) {
            for op in ops {
                self.apply(op.kind, op.delta_cents);
            }
        }

        fn ledger_sum(&self) -> i64 {
            self.completed_ledger.iter().sum()
        }
    }

    #[test]
    fn derives_amount_from_base_and_tds() {
        // base 1000.00, tds 10% -> 900.00
        assert_eq!(derive_amount_cents(100_000, 1_000, 0).unwrap(), 90_000);
        // tds 0% -> base
        assert_eq!(derive_amount_cents(100_000, 0, 0).unwrap(), 100_000);
        // tds 15% -> 850.00
        assert_eq!(derive_amount_cents(100_000, 1_500, 0).unwrap(), 85_000);
        // bonus is additive
        assert_eq!(derive_amount_cents(100_000, 1_000, 5_000).unwrap(), 95_000);
        // tds 100% -> bonus only
        assert_eq!(derive_amount_cents(100_000, 10_000, 250).unwrap(), 250);
    }

    #[test]
    fn rejects_invalid_amount_inputs() {
        assert!(matches!(
            derive_amount_cents(-1, 0, 0),
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            derive_amount_cents(100, 10_001, 0),
            Err(AppError::InvalidRequest(_))
        ));
        assert!(matches!(
            derive_amount_cents(100, 0, -5),
            Err(AppError::InvalidAmount(_))
        ));
    }

    #[test]
    fn converts_tds_percentage_to_basis_points() {
        assert_eq!(tds_percentage_to_bps(10.0).unwrap(), 1_000);
        assert_eq!(tds_percentage_to_bps(0.0).unwrap(), 0);
        assert_eq!(tds_percentage_to_bps(12.5).unwrap(), 1_250);
        assert_eq!(tds_percentage_to_bps(100.0).unwrap(), 10_000);
        assert!(tds_percentage_to_bps(-0.1).is_err());
        assert!(tds_percentage_to_bps(100.1).is_err());
        assert!(tds_percentage_to_bps(f64::NAN).is_err());
    }

    #[test]
    fn approval_credits_full_amount_and_closes_lead() {
        let ops = plan_transition(snap(Pending, 90_000), snap(Approved, 90_000)).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, LedgerKind::Commission);
        assert_eq!(ops[0].delta_cents, 90_000);

        let mut sim = WalletSim::default();
        sim.apply_ops(&ops);
        assert_eq!(sim.balance_cents, 90_000);
        assert_eq!(sim.total_earnings_cents, 90_000);
        assert_eq!(sim.total_leads_closed, 1);
    }

    #[test]
    fn re_approval_does_not_double_credit() {
        let ops = plan_transition(snap(Approved, 90_000), snap(Approved, 90_000)).unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn amount_change_on_approved_moves_balance_by_difference() {
        // 900.00 -> 850.00: reduction of 50.00
        let ops = plan_transition(snap(Approved, 90_000), snap(Approved, 85_000)).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, LedgerKind::CommissionReduction);
        assert_eq!(ops[0].delta_cents, -5_000);

        // 850.00 -> 920.00: adjustment of +70.00
        let ops = plan_transition(snap(Approved, 85_000), snap(Approved, 92_000)).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, LedgerKind::CommissionAdjustment);
        assert_eq!(ops[0].delta_cents, 7_000);
    }

    #[test]
    fn one_cent_amount_change_is_skipped() {
        let ops = plan_transition(snap(Approved, 90_000), snap(Approved, 90_001)).unwrap();
        assert!(ops.is_empty());
        let ops = plan_transition(snap(Approved, 90_000), snap(Approved, 89_999)).unwrap();
        assert!(ops.is_empty());
        // two cents is a real change
        let ops = plan_transition(snap(Approved, 90_000), snap(Approved, 90_002)).unwrap();
        assert_eq!(ops.len(), 1);
    }

    #[test]
    fn amount_change_while_pending_has_no_wallet_effect() {
        let ops = plan_transition(snap(Pending, 0), snap(Pending, 90_000)).unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn rejection_and_cancellation_reverse_the_credit() {
        let reject = plan_transition(snap(Approved, 85_000), snap(Rejected, 85_000)).unwrap();
        assert_eq!(reject.len(), 1);
        assert_eq!(reject[0].kind, LedgerKind::CommissionReversal);
        assert_eq!(reject[0].delta_cents, -85_000);

        let cancel = plan_transition(snap(Approved, 85_000), snap(Cancelled, 85_000)).unwrap();
        assert_eq!(cancel[0].kind, LedgerKind::CommissionCancellation);
        assert_eq!(cancel[0].delta_cents, -85_000);
    }

    #[test]
    fn reversal_symmetry_restores_pre_approval_state() {
        let mut sim = WalletSim::default();

        // approve at 900.00
        sim.apply_ops(&plan_transition(snap(Pending, 90_000), snap(Approved, 90_000)).unwrap());
        // adjust down to 850.00
        sim.apply_ops(&plan_transition(snap(Approved, 90_000), snap(Approved, 85_000)).unwrap());
        // reject at the current amount
        sim.apply_ops(&plan_transition(snap(Approved, 85_000), snap(Rejected, 85_000)).unwrap());

        assert_eq!(sim.balance_cents, 0);
        assert_eq!(sim.total_earnings_cents, 0);
        assert_eq!(sim.total_leads_closed, 0);
        assert_eq!(sim.ledger_sum(), sim.balance_cents);
    }

    #[test]
    fn rejecting_pending_commission_touches_nothing() {
        let ops = plan_transition(snap(Pending, 90_000), snap(Rejected, 90_000)).unwrap();
        assert!(ops.is_empty());
        let ops = plan_transition(snap(Pending, 90_000), snap(Cancelled, 90_000)).unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn paying_approved_commission_adds_no_delta() {
        let ops = plan_transition(snap(Approved, 90_000), snap(Paid, 90_000)).unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn reverting_paid_commission_debits_amount_at_payment_time() {
        let ops = plan_transition(snap(Paid, 85_000), snap(Rejected, 85_000)).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, LedgerKind::CommissionReversal);
        assert_eq!(ops[0].delta_cents, -85_000);
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        for (from, to) in [
            (Paid, Approved),
            (Pending, Paid),
            (Rejected, Paid),
            (Cancelled, Paid),
            (Rejected, Cancelled),
            (WithdrawalRequested, Approved),
            (Pending, WithdrawalRequested),
            (WithdrawalApproved, Paid),
        ] {
            let result = plan_transition(snap(from, 1_000), snap(to, 1_000));
            assert!(
                matches!(result, Err(AppError::InvalidStateTransition(_))),
                "{from:?} -> {to:?} should be rejected"
            );
        }
    }

    #[test]
    fn re_approval_after_rejection_credits_again() {
        let mut sim = WalletSim::default();
        sim.apply_ops(&plan_transition(snap(Pending, 90_000), snap(Approved, 90_000)).unwrap());
        sim.apply_ops(&plan_transition(snap(Approved, 90_000), snap(Rejected, 90_000)).unwrap());
        sim.apply_ops(&plan_transition(snap(Rejected, 90_000), snap(Approved, 90_000)).unwrap());

        assert_eq!(sim.balance_cents, 90_000);
        assert_eq!(sim.total_leads_closed, 1);
        assert_eq!(sim.ledger_sum(), sim.balance_cents);
    }

    #[test]
    fn withdrawal_lock_and_refund_round_trip() {
        let mut sim = WalletSim::default();
        sim.apply_ops(&plan_transition(snap(Pending, 90_000), snap(Approved, 90_000)).unwrap());

        // lock 900.00 for a withdrawal request
        sim.apply(LedgerKind::Withdrawal, -90_000);
        assert_eq!(sim.balance_cents, 0);
        assert_eq!(sim.total_withdrawn_cents, 90_000);

        // rejection credits it back
        sim.apply(LedgerKind::Refund, 90_000);
        assert_eq!(sim.balance_cents, 90_000);
        assert_eq!(sim.total_withdrawn_cents, 0);
        assert_eq!(sim.total_earnings_cents, 90_000);
        assert_eq!(sim.ledger_sum(), sim.balance_cents);
    }

    #[test]
    fn balance_reconciles_with_completed_ledger_over_full_lifecycle() {
        let mut sim = WalletSim::default();

        // two commissions approved, one adjusted, one cancelled, one
        // withdrawal locked and paid
        sim.apply_ops(&plan_transition(snap(Pending, 0), snap(Approved, 90_000)).unwrap());
        sim.apply_ops(&plan_transition(snap(Pending, 0), snap(Approved, 40_000)).unwrap());
        sim.apply_ops(&plan_transition(snap(Approved, 40_000), snap(Approved, 45_000)).unwrap());
        sim.apply_ops(&plan_transition(snap(Approved, 45_000), snap(Cancelled, 45_000)).unwrap());
        sim.apply(LedgerKind::Withdrawal, -50_000);

        assert_eq!(sim.balance_cents, 40_000);
        assert_eq!(sim.total_earnings_cents, 90_000);
        assert_eq!(sim.total_withdrawn_cents, 50_000);
        assert_eq!(sim.total_leads_closed, 1);
        assert_eq!(sim.ledger_sum(), sim.balance_cents);
    }
}
