//! Agent identity model for authentication.
//!
//! Agents authenticate with bearer tokens stored in the database as SHA-256 hashes. The row also carries the agent's role, which gates admin-only commission and withdrawal transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents an agent record from the database.
///
/// # Database Table
///
/// Maps to the `agents` table with columns:
/// - `id`: Unique identifier (UUID)
/// - `token_hash`: SHA-256 hash of the agent's bearer token
/// - `agent_name`: Display name of the agent
/// - `role`: `user`, `admin`, or `super_admin`
/// - `is_active`: Whether the token is currently valid
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Agent {
    /// Unique identifier for this agent
    pub id: Uuid,

    /// SHA-256 hash of the agent's bearer token (64 hex characters)
    ///
    /// When a request comes in with "Bearer abc123", we:
    /// 1. Hash "abc123" with SHA-256
    /// 2. Look up this hash in the database
    /// 3. If found and active, authenticate the request
    pub token_hash: String,

    /// Human-readable name of the agent
    pub agent_name: String,

    /// Role string as stored in the database
    pub role: String,

    /// Timestamp when this agent was created
    pub created_at: DateTime<Utc>,

    /// Whether this agent's token is currently active
    ///
    /// Inactive agents are rejected during authentication. This provides a way to revoke access without deleting the record.
    pub is_active: bool,
}

/// Role of an authenticated agent.
///
/// The core trusts the role as supplied by the identity seam; it only
/// checks it when gating admin-only transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    User,
    Admin,
    SuperAdmin,
}

impl AgentRole {
    /// Parse a role from its database string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(AgentRole::User),
            "admin" => Some(AgentRole::Admin),
            "super_admin" => Some(AgentRole::SuperAdmin),
            _ => None,
        }
    }

    /// Whether this role may perform admin-only transitions
    /// (approve/reject/pay/amount-edit).
    pub fn is_admin(self) -> bool {
        matches!(self, AgentRole::Admin | AgentRole::SuperAdmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles() {
        assert_eq!(AgentRole::parse("user"), Some(AgentRole::User));
        assert_eq!(AgentRole::parse("admin"), Some(AgentRole::Admin));
        assert_eq!(AgentRole::parse("super_admin"), Some(AgentRole::SuperAdmin));
        assert_eq!(AgentRole::parse("root"), None);
    }

    #[test]
    fn admin_gate_covers_both_admin_roles() {
        assert!(!AgentRole::User.is_admin());
        assert!(AgentRole::Admin.is_admin());
        assert!(AgentRole::SuperAdmin.is_admin());
    }
}
