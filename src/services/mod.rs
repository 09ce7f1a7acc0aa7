//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle database transactions, validation, and complex operations.

pub mod commission_service;
pub mod notification_service;
pub mod transition;
pub mod wallet_service;
pub mod withdrawal_service;
