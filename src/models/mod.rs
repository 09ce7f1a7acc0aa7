//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables.

/// Agent identity model (authentication seam)
pub mod agent;
/// Commission entity, statuses and payout record
pub mod commission;
/// Append-only wallet ledger entries
pub mod ledger;
/// Notification delivery payload
pub mod notification;
/// Per-agent wallet model
pub mod wallet;
/// Withdrawal request model
pub mod withdrawal;
