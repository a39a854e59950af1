//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Created ──► Paid
/// ```
///
/// `Paid` is terminal. Re-applying `Paid` to a paid order is accepted as a
/// no-op so that redelivered confirmations stay harmless.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum OrderStatus {
    /// Provider payment created, awaiting confirmation.
    #[default]
    Created,

    /// Provider confirmed settlement (terminal state).
    Paid,
}

impl OrderStatus {
    /// Returns true if an order in this status may end up in `target`.
    ///
    /// Staying in place is allowed; moving backwards never is.
    pub fn can_advance_to(&self, target: OrderStatus) -> bool {
        *self <= target
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid)
    }

    /// Returns the status name as stored and displayed.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "Created",
            OrderStatus::Paid => "Paid",
        }
    }

    /// Parses a stored status name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Created" => Some(OrderStatus::Created),
            "Paid" => Some(OrderStatus::Paid),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
