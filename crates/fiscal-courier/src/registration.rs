//! Terminal identity and its registration with the event channel.

use crate::{CourierError, CourierResult};
use async_trait::async_trait;
use fiscal_channel::{ChannelEmitter, ChannelResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Event name used to announce an identity.
pub const REGISTER_EVENT: &str = "register";

/// A validated circuit id and its point-of-sale terminals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    circuit_id: String,
    pos_ids: Vec<String>,
}

impl Identity {
    /// Validate raw operator input.
    ///
    /// `pos_ids` is a comma separated list; entries are trimmed and blanks dropped.
    pub fn parse(circuit_id: &str, pos_ids: &str) -> CourierResult<Self> {
        let circuit_id = circuit_id.trim();
        if circuit_id.is_empty() {
            return Err(CourierError::Validation(
                "circuit id must not be empty".to_string(),
            ));
        }

        let pos_ids: Vec<String> = pos_ids
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .collect();
        if pos_ids.is_empty() {
            return Err(CourierError::Validation(
                "at least one POS id is required".to_string(),
            ));
        }

        Ok(Self {
            circuit_id: circuit_id.to_string(),
            pos_ids,
        })
    }

    pub fn circuit_id(&self) -> &str {
        &self.circuit_id
    }

    pub fn pos_ids(&self) -> &[String] {
        &self.pos_ids
    }
}

/// Server reply to a registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegisterResponse {
    pub success: Option<bool>,
    pub error: Option<String>,
}

/// Where the current identity stands with the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationStatus {
    /// No identity has been submitted.
    Unregistered,
    /// An identity is known but not announced on the current connection.
    Pending,
    /// Announced on the current connection, no reply yet.
    Announced { ack_id: u64 },
    /// The server accepted the last announcement.
    Acknowledged,
    /// The server refused the last announcement.
    Rejected(String),
}

/// Tracks the submitted identity across connections.
#[derive(Debug)]
pub struct RegistrationTracker {
    identity: Option<Identity>,
    status: RegistrationStatus,
}

impl Default for RegistrationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationTracker {
    pub fn new() -> Self {
        Self {
            identity: None,
            status: RegistrationStatus::Unregistered,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn status(&self) -> &RegistrationStatus {
        &self.status
    }

    /// True once announced on the live connection and not refused.
    pub fn is_registered(&self) -> bool {
        matches!(
            self.status,
            RegistrationStatus::Announced { .. } | RegistrationStatus::Acknowledged
        )
    }

    /// Replace the identity. It must be announced again.
    pub fn submit(&mut self, identity: Identity) {
        self.identity = Some(identity);
        self.status = RegistrationStatus::Pending;
    }

    /// Record that the identity went out with `ack_id`.
    pub fn mark_announced(&mut self, ack_id: u64) {
        if self.identity.is_some() {
            self.status = RegistrationStatus::Announced { ack_id };
        }
    }

    /// Void any announcement; the connection it was made on is gone.
    pub fn clear_announcement(&mut self) {
        self.status = if self.identity.is_some() {
            RegistrationStatus::Pending
        } else {
            RegistrationStatus::Unregistered
        };
    }

    /// Apply an acknowledgment. Returns false if it answers something else.
    pub fn on_ack(&mut self, id: u64, args: &[Value]) -> bool {
        match self.status {
            RegistrationStatus::Announced { ack_id } if ack_id == id => {}
            _ => {
                debug!(ack_id = id, "Ignoring acknowledgment for an older announcement");
                return false;
            }
        }

        let response = args
            .first()
            .and_then(|v| serde_json::from_value::<RegisterResponse>(v.clone()).ok())
            .unwrap_or_default();

        match response.error {
            Some(error) if response.success != Some(true) => {
                warn!(error = %error, "Registration rejected by server");
                self.status = RegistrationStatus::Rejected(error);
            }
            _ => {
                info!("Registration acknowledged");
                self.status = RegistrationStatus::Acknowledged;
            }
        }
        true
    }
}

/// Sends an identity to the server.
#[async_trait]
pub trait Announcer: Send + Sync {
    /// Emit the registration and return its acknowledgment id.
    async fn announce(&self, identity: &Identity) -> ChannelResult<u64>;
}

#[async_trait]
impl Announcer for ChannelEmitter {
    async fn announce(&self, identity: &Identity) -> ChannelResult<u64> {
        let payload = serde_json::to_value(identity)?;
        self.emit_with_ack(REGISTER_EVENT, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_identity() {
        let identity = Identity::parse("C-1", "1234, 5678 ,").unwrap();
        assert_eq!(identity.circuit_id(), "C-1");
        assert_eq!(identity.pos_ids(), ["1234", "5678"]);

        let identity = Identity::parse("  C-2 ", "42").unwrap();
        assert_eq!(identity.circuit_id(), "C-2");
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        assert!(matches!(
            Identity::parse("", "1234"),
            Err(CourierError::Validation(_))
        ));
        assert!(matches!(
            Identity::parse("   ", "1234"),
            Err(CourierError::Validation(_))
        ));
        assert!(matches!(
            Identity::parse("C-1", ""),
            Err(CourierError::Validation(_))
        ));
        assert!(matches!(
            Identity::parse("C-1", " , ,"),
            Err(CourierError::Validation(_))
        ));
    }

    #[test]
    fn test_register_payload_shape() {
        let identity = Identity::parse("C-1", "1234,5678").unwrap();
        assert_eq!(
            serde_json::to_value(&identity).unwrap(),
            json!({"circuitId": "C-1", "posIds": ["1234", "5678"]})
        );
    }

    #[test]
    fn test_clear_announcement() {
        let mut tracker = RegistrationTracker::new();
        assert!(!tracker.is_registered());

        tracker.submit(Identity::parse("C-1", "1").unwrap());
        assert_eq!(tracker.status(), &RegistrationStatus::Pending);
        assert!(!tracker.is_registered());

        tracker.mark_announced(3);
        assert!(tracker.is_registered());

        tracker.clear_announcement();
        assert_eq!(tracker.status(), &RegistrationStatus::Pending);
        assert!(!tracker.is_registered());
        assert!(tracker.identity().is_some());
    }

    #[test]
    fn test_disconnect_without_identity() {
        let mut tracker = RegistrationTracker::new();
        tracker.mark_announced(0);
        tracker.clear_announcement();
        assert_eq!(tracker.status(), &RegistrationStatus::Unregistered);
    }

    #[test]
    fn test_ack_outcomes() {
        let mut tracker = RegistrationTracker::new();
        tracker.submit(Identity::parse("C-1", "1").unwrap());
        tracker.mark_announced(1);

        assert!(!tracker.on_ack(0, &[json!({"success": true})]));
        assert!(tracker.on_ack(1, &[json!({"success": true})]));
        assert_eq!(tracker.status(), &RegistrationStatus::Acknowledged);

        tracker.mark_announced(2);
        assert!(tracker.on_ack(2, &[json!({"error": "unknown circuit"})]));
        assert_eq!(
            tracker.status(),
            &RegistrationStatus::Rejected("unknown circuit".to_string())
        );
        assert!(!tracker.is_registered());

        tracker.mark_announced(3);
        assert!(tracker.on_ack(3, &[]));
        assert_eq!(tracker.status(), &RegistrationStatus::Acknowledged);
    }
}
