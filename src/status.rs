//! Payment Status FSM Definitions
//!
//! State IDs are designed for PostgreSQL storage as SMALLINT.
//! Terminal states: RELEASED (30), REFUNDED (-20), EXPIRED (-30)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Escrow payment statuses
///
/// The status graph is the single source of truth for what may happen to a
/// payment. Funds of record live in this column: once a terminal status is
/// reached nothing may move it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[repr(i16)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Payment link created, client has not paid
    Pending = 0,

    /// Client paid, funds held in escrow
    Paid = 10,

    /// Freelancer delivered, awaiting client validation
    Delivered = 20,

    /// Terminal: funds released to the freelancer
    Released = 30,

    /// Dispute open - blocks auto-release until resolved
    Contested = -10,

    /// Terminal: funds returned to the client
    Refunded = -20,

    /// Terminal: payment link expired unpaid
    Expired = -30,
}

impl PaymentStatus {
    /// Check if this is a terminal status (no outgoing transitions)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Released | PaymentStatus::Refunded | PaymentStatus::Expired
        )
    }

    /// Get the numeric status ID for PostgreSQL storage
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    /// Convert from PostgreSQL status ID
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(PaymentStatus::Pending),
            10 => Some(PaymentStatus::Paid),
            20 => Some(PaymentStatus::Delivered),
            30 => Some(PaymentStatus::Released),
            -10 => Some(PaymentStatus::Contested),
            -20 => Some(PaymentStatus::Refunded),
            -30 => Some(PaymentStatus::Expired),
            _ => None,
        }
    }

    /// Get human-readable status name (API vocabulary)
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Delivered => "delivered",
            PaymentStatus::Released => "released",
            PaymentStatus::Contested => "contested",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Expired => "expired",
        }
    }

    /// The set of statuses reachable from this one
    ///
    /// - `contested` is reachable before or after delivery and resolves only
    ///   to `released` or `refunded`, never back to an earlier status.
    /// - Terminal statuses have no outgoing edges.
    pub fn available_transitions(&self) -> &'static [PaymentStatus] {
        match self {
            PaymentStatus::Pending => &[PaymentStatus::Paid, PaymentStatus::Expired],
            PaymentStatus::Paid => &[
                PaymentStatus::Delivered,
                PaymentStatus::Contested,
                PaymentStatus::Refunded,
            ],
            PaymentStatus::Delivered => &[PaymentStatus::Released, PaymentStatus::Contested],
            PaymentStatus::Contested => &[PaymentStatus::Released, PaymentStatus::Refunded],
            PaymentStatus::Released | PaymentStatus::Refunded | PaymentStatus::Expired => &[],
        }
    }

    /// Check whether `self -> to` is a legal edge in the status graph
    #[inline]
    pub fn can_transition(&self, to: PaymentStatus) -> bool {
        self.available_transitions().contains(&to)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for PaymentStatus {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        PaymentStatus::from_id(value).ok_or(())
    }
}

/// All statuses, for exhaustive iteration in tests and lookups
pub const ALL_STATUSES: [PaymentStatus; 7] = [
    PaymentStatus::Pending,
    PaymentStatus::Paid,
    PaymentStatus::Delivered,
    PaymentStatus::Released,
    PaymentStatus::Contested,
    PaymentStatus::Refunded,
    PaymentStatus::Expired,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(PaymentStatus::Released.is_terminal());
        assert!(PaymentStatus::Refunded.is_terminal());
        assert!(PaymentStatus::Expired.is_terminal());

        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(!PaymentStatus::Paid.is_terminal());
        assert!(!PaymentStatus::Delivered.is_terminal());
        assert!(!PaymentStatus::Contested.is_terminal());
    }

    #[test]
    fn test_status_id_roundtrip() {
        for status in ALL_STATUSES {
            let id = status.id();
            let recovered = PaymentStatus::from_id(id).unwrap();
            assert_eq!(status, recovered);
        }
    }

    #[test]
    fn test_invalid_status_id() {
        assert!(PaymentStatus::from_id(999).is_none());
        assert!(PaymentStatus::from_id(-999).is_none());
    }

    #[test]
    fn test_allowed_edges() {
        assert!(PaymentStatus::Pending.can_transition(PaymentStatus::Paid));
        assert!(PaymentStatus::Pending.can_transition(PaymentStatus::Expired));
        assert!(PaymentStatus::Paid.can_transition(PaymentStatus::Delivered));
        assert!(PaymentStatus::Paid.can_transition(PaymentStatus::Contested));
        assert!(PaymentStatus::Paid.can_transition(PaymentStatus::Refunded));
        assert!(PaymentStatus::Delivered.can_transition(PaymentStatus::Released));
        assert!(PaymentStatus::Delivered.can_transition(PaymentStatus::Contested));
        assert!(PaymentStatus::Contested.can_transition(PaymentStatus::Released));
        assert!(PaymentStatus::Contested.can_transition(PaymentStatus::Refunded));
    }

    #[test]
    fn test_disputes_never_reopen() {
        // A resolved dispute is final: no path from contested back to
        // pending/paid/delivered.
        assert!(!PaymentStatus::Contested.can_transition(PaymentStatus::Pending));
        assert!(!PaymentStatus::Contested.can_transition(PaymentStatus::Paid));
        assert!(!PaymentStatus::Contested.can_transition(PaymentStatus::Delivered));
    }

    #[test]
    fn test_terminal_statuses_have_no_edges() {
        for from in ALL_STATUSES {
            if from.is_terminal() {
                for to in ALL_STATUSES {
                    assert!(
                        !from.can_transition(to),
                        "{} -> {} must be illegal",
                        from,
                        to
                    );
                }
            }
        }
    }

    #[test]
    fn test_edge_count_is_exactly_nine() {
        let edges: usize = ALL_STATUSES
            .iter()
            .map(|s| s.available_transitions().len())
            .sum();
        assert_eq!(edges, 9);
    }

    #[test]
    fn test_display() {
        assert_eq!(PaymentStatus::Pending.to_string(), "pending");
        assert_eq!(PaymentStatus::Released.to_string(), "released");
        assert_eq!(PaymentStatus::Contested.to_string(), "contested");
    }
}
