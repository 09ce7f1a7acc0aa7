//! Notification payload for best-effort agent notifications.
//!
//! This module defines the signed payload delivered to the downstream
//! notification service. Delivery attempts are recorded in the
//! `notifications` table by the notification service; the table is an
//! append-only audit log and is never read back by the application.
//!
//! # Notification Flow
//!
//! 1. A commission or withdrawal transition commits successfully
//! 2. The service records a `notifications` row and spawns a delivery task
//! 3. The task POSTs an HMAC-SHA256-signed JSON payload to the configured
//!    endpoint (if any) and stores the response status
//! 4. Delivery failure is logged; it never rolls back the committed
//!    financial mutation

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Payload sent to the downstream notification service.
///
/// # Format
///
/// This is the JSON body sent in the HTTP POST request.
///
/// # Example
///
/// ```json
/// {
///   "event_id": "550e8400-e29b-41d4-a716-446655440000",
///   "recipient_id": "660e8400-e29b-41d4-a716-446655440001",
///   "kind": "commission.approved",
///   "title": "Commission approved",
///   "message": "Your commission of 900.00 was approved",
///   "created_at": "2026-01-15T10:30:00Z",
///   "data": { "commission_id": "...", "amount_cents": 90000 }
/// }
/// ```
///
/// # Signature Verification
///
/// The request includes an `X-Notification-Signature` header with format
/// `sha256=<hex_encoded_hmac>`. Receivers should verify it by computing
/// HMAC-SHA256(secret, json_body) and comparing in constant time.
#[derive(Debug, Serialize)]
pub struct NotificationPayload {
    /// Unique identifier for this delivery
    pub event_id: Uuid,

    /// Agent the notification is addressed to
    pub recipient_id: Uuid,

    /// Event kind, e.g. "commission.approved" or "withdrawal.rejected"
    pub kind: String,

    /// Short human-readable title
    pub title: String,

    /// Human-readable message body
    pub message: String,

    /// When the event was created
    pub created_at: DateTime<Utc>,

    /// Structured event data (ids, amounts, reasons)
    pub data: serde_json::Value,
}
