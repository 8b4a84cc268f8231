// SPDX-FileCopyrightText: 2026 Tiffin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared between the connection controller, storage, and
//! the collaborators that consume it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Lifecycle state of the messaging network connection.
///
/// Exactly one state is active per controller at any time. The persisted
/// form is the snake_case name (`pairing_required`, `auth_failure`, ...).
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Initializing,
    PairingRequired,
    Authenticated,
    Ready,
    AuthFailure,
    PairingExpired,
}

impl ConnectionState {
    /// Returns the persisted string form of the state.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// States in which a live handle to the remote network exists.
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            ConnectionState::PairingRequired
                | ConnectionState::Authenticated
                | ConnectionState::Ready
        )
    }
}

/// The single persisted connection status record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub status: ConnectionState,
    pub last_authenticated_at: Option<DateTime<Utc>>,
    /// Set when automatic retries were exhausted and an operator must restart.
    pub halted: bool,
    pub updated_at: DateTime<Utc>,
}

impl ConnectionRecord {
    pub fn new(status: ConnectionState) -> Self {
        Self {
            status,
            last_authenticated_at: None,
            halted: false,
            updated_at: Utc::now(),
        }
    }
}

/// One-time pairing payload issued by the remote network.
#[derive(Debug, Clone, PartialEq)]
pub struct PairingToken {
    /// Monotonic id, unique per controller instance.
    pub id: u64,
    pub payload: String,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl PairingToken {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::zero())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

/// Reason the remote network gave for dropping the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    Logout,
    PrimaryUnavailable,
    UnexpectedLogout,
    Other(String),
}

impl DisconnectReason {
    /// Parses the wire reason code. Unknown codes are kept verbatim.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "LOGOUT" => DisconnectReason::Logout,
            "PRIMARY_UNAVAILABLE" => DisconnectReason::PrimaryUnavailable,
            "UNEXPECTED_LOGOUT" => DisconnectReason::UnexpectedLogout,
            _ => DisconnectReason::Other(raw.to_string()),
        }
    }

    /// Critical reasons invalidate the stored session and force re-pairing.
    pub fn is_critical(&self) -> bool {
        !matches!(self, DisconnectReason::Other(_))
    }
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisconnectReason::Logout => write!(f, "LOGOUT"),
            DisconnectReason::PrimaryUnavailable => write!(f, "PRIMARY_UNAVAILABLE"),
            DisconnectReason::UnexpectedLogout => write!(f, "UNEXPECTED_LOGOUT"),
            DisconnectReason::Other(raw) => write!(f, "{raw}"),
        }
    }
}

/// A shared location attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub address: Option<String>,
}

/// A decoded inbound chat message.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Raw chat id of the sender (e.g. `919876543210@c.us`).
    pub sender_id: String,
    pub body: String,
    /// Display name the sender advertises, if any.
    pub notify_name: Option<String>,
    pub location: Option<Location>,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn has_location(&self) -> bool {
        self.location.is_some()
    }

    /// Phone identifier derived from the chat id. Empty if the id is unusable.
    pub fn phone(&self) -> String {
        let raw = self.sender_id.trim();
        raw.split_once('@')
            .map(|(phone, _)| phone)
            .unwrap_or(raw)
            .trim()
            .to_string()
    }
}

/// Events reported by a live transport handle.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A fresh pairing payload must be shown to the operator.
    PairingCode(String),
    Authenticated,
    Ready,
    AuthFailure(String),
    Disconnected(DisconnectReason),
    Message(InboundMessage),
}

/// Side effect requested by a message router alongside its reply.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterAction {
    UpdateCustomerLocation(Location),
}

/// What a router produced for one inbound message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouterReply {
    pub text: Option<String>,
    pub actions: Vec<RouterAction>,
}

impl RouterReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            actions: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: RouterAction) -> Self {
        self.actions.push(action);
        self
    }
}

/// A customer known to the shop.
///
/// Created and updated by the order-intake and message-intake paths, read by
/// the notification scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub phone: String,
    pub name: Option<String>,
    pub total_orders: u32,
    pub last_order_at: Option<DateTime<Utc>>,
    pub last_notified_at: Option<DateTime<Utc>>,
    pub last_known_location: Option<Location>,
}

impl Customer {
    pub fn new(phone: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            name: None,
            total_orders: 0,
            last_order_at: None,
            last_notified_at: None,
            last_known_location: None,
        }
    }

    /// Chat id used to address this customer on the messaging network.
    pub fn chat_id(&self) -> String {
        format!("{}@c.us", self.phone)
    }

    /// Selection rule for re-engagement messages.
    ///
    /// Due when the customer has ordered at least once, was never notified
    /// or was notified more than `notify_gap` ago, and last ordered more than
    /// `order_gap` ago.
    pub fn is_due_for_reorder(
        &self,
        now: DateTime<Utc>,
        notify_gap: chrono::Duration,
        order_gap: chrono::Duration,
    ) -> bool {
        if self.total_orders == 0 {
            return false;
        }
        let notify_ok = match self.last_notified_at {
            None => true,
            Some(at) => at < now - notify_gap,
        };
        let order_ok = match self.last_order_at {
            None => false,
            Some(at) => at < now - order_gap,
        };
        notify_ok && order_ok
    }
}
