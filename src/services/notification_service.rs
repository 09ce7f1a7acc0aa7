//! Notification service for best-effort agent notifications.
//!
//! Every successful commission or withdrawal transition fires one
//! notification to the affected agent. Delivery is fire-and-forget: the
//! financial mutation has already committed by the time a notification is
//! dispatched, and a delivery failure is logged, recorded, and swallowed —
//! it can never roll back or fail the parent operation.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::config::Config;
use crate::db::DbPool;
use crate::error::AppError;
use crate::models::notification::NotificationPayload;

type HmacSha256 = Hmac<Sha256>;

/// One notification to dispatch.
#[derive(Debug, Clone)]
pub struct Notice {
    pub recipient_id: Uuid,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
}

/// Handle to the downstream notification collaborator.
///
/// When no endpoint is configured, notifications are still recorded in
/// the `notifications` table so the audit trail stays complete.
#[derive(Debug, Clone)]
pub struct Notifier {
    endpoint: Option<String>,
    secret: Option<String>,
    client: reqwest::Client,
}

impl Notifier {
    /// Build the notifier from application configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        // 5 second timeout prevents hanging on a slow notification endpoint
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()?;

        Ok(Self {
            endpoint: config.notification_url.clone(),
            secret: config.notification_secret.clone(),
            client,
        })
    }

    /// Dispatch a notification without blocking the caller.
    ///
    /// Spawned onto the runtime so the HTTP round-trip cannot delay the
    /// response of the operation that triggered it, let alone fail it.
    pub fn dispatch(&self, pool: DbPool, notice: Notice) {
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.deliver(&pool, notice).await {
                // Best-effort by design: log and move on
                tracing::error!("Failed to deliver notification: {:?}", e);
            }
        });
    }

    /// Deliver one notification and record the attempt.
    ///
    /// # Process
    ///
    /// 1. Build the signed payload
    /// 2. POST it to the configured endpoint (if any)
    /// 3. Record the notification row with the response status
    async fn deliver(&self, pool: &DbPool, notice: Notice) -> Result<(), AppError> {
        let event_id = Uuid::new_v4();

        let payload = NotificationPayload {
            event_id,
            recipient_id: notice.recipient_id,
            kind: notice.kind.clone(),
            title: notice.title.clone(),
            message: notice.message.clone(),
            created_at: Utc::now(),
            data: notice.data.clone(),
        };

        let response_status = match &self.endpoint {
            None => None,
            Some(endpoint) => {
                let payload_json = serde_json::to_string(&payload).map_err(|e| {
                    AppError::InvalidRequest(format!("Failed to serialize payload: {}", e))
                })?;

                let mut request = self
                    .client
                    .post(endpoint)
                    .header("Content-Type", "application/json")
                    .header("X-Notification-Event-Id", event_id.to_string());

                if let Some(secret) = &self.secret {
                    request = request
                        .header("X-Notification-Signature", sign_payload(secret, &payload_json));
                }

                match request.body(payload_json).send().await {
                    Ok(resp) => Some(resp.status().as_u16() as i32),
                    Err(e) => {
                        tracing::error!("Notification request failed: {}", e);
                        None
                    }
                }
            }
        };

        // Record the attempt regardless of delivery outcome
        sqlx::query(
            r#"
            INSERT INTO notifications (
                id,
                recipient_id,
                kind,
                title,
                message,
                data,
                response_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event_id)
        .bind(notice.recipient_id)
        .bind(&notice.kind)
        .bind(&notice.title)
        .bind(&notice.message)
        .bind(&notice.data)
        .bind(response_status)
        .execute(pool)
        .await?;

        Ok(())
    }
}

/// Generate HMAC-SHA256 signature for a notification payload.
///
/// # Format
///
/// `sha256=<hex_encoded_hmac>`
///
/// # Verification
///
/// Receivers should:
/// 1. Extract signature from `X-Notification-Signature` header
/// 2. Compute HMAC-SHA256(secret, request_body)
/// 3. Compare using constant-time comparison
fn sign_payload(secret: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(payload.as_bytes());
    let result = mac.finalize();
    format!("sha256={}", hex::encode(result.into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_stable_and_prefixed() {
        let first = sign_payload("secret", r#"{"kind":"commission.approved"}"#);
        let second = sign_payload("secret", r#"{"kind":"commission.approved"}"#);
        assert_eq!(first, second);
        assert!(first.starts_with("sha256="));
        // 32-byte HMAC hex-encoded after the prefix
        assert_eq!(first.len(), "sha256=".len() + 64);

        let other = sign_payload("other-secret", r#"{"kind":"commission.approved"}"#);
        assert_ne!(first, other);
    }
}
