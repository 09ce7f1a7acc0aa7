//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Performs business logic (database queries, validation)
//! 3. Returns HTTP response (JSON, status code)

/// Commission lifecycle endpoints
pub mod commissions;
/// Health check endpoint
pub mod health;
/// Lead lifecycle event hooks
pub mod leads;
/// Wallet and ledger endpoints
pub mod wallet;
/// Withdrawal request endpoints
pub mod withdrawals;
