//! Order status graphs.

use std::fmt;
use std::str::FromStr;

use common::OrderKind;
use serde::{Deserialize, Serialize};

use crate::error::TransitionError;

/// Behaviour shared by the two order status enums.
///
/// A status is terminal when its graph has no outgoing edge from it.
pub trait OrderStatus:
    Copy + Eq + fmt::Debug + fmt::Display + FromStr<Err = TransitionError> + Send + Sync + 'static
{
    /// The order kind this graph belongs to.
    const KIND: OrderKind;

    /// Every status of the kind, in lifecycle order.
    const ALL: &'static [Self];

    /// Status assigned at creation.
    fn initial() -> Self;

    /// Returns true if `self -> next` is an edge of the graph.
    fn can_transition_to(&self, next: Self) -> bool;

    fn as_str(&self) -> &'static str;

    fn is_terminal(&self) -> bool {
        !Self::ALL.iter().any(|next| self.can_transition_to(*next))
    }

    /// Checks the edge and returns `InvalidTransition` when it is absent.
    fn validate_transition(&self, next: Self) -> Result<(), TransitionError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition {
                kind: Self::KIND,
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

/// Status of an application order.
///
/// ```text
/// Pending ──► Approved ──► WaitingShipment ──► Shipped ──► InTransit ──► Completed
///    │
///    └──► Rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Approved,
    /// Terminal.
    Rejected,
    WaitingShipment,
    Shipped,
    InTransit,
    /// Terminal.
    Completed,
}

impl OrderStatus for ApplicationStatus {
    const KIND: OrderKind = OrderKind::Application;
    const ALL: &'static [Self] = &[
        Self::Pending,
        Self::Approved,
        Self::Rejected,
        Self::WaitingShipment,
        Self::Shipped,
        Self::InTransit,
        Self::Completed,
    ];

    fn initial() -> Self {
        Self::Pending
    }

    fn can_transition_to(&self, next: Self) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Approved, WaitingShipment)
                | (WaitingShipment, Shipped)
                | (Shipped, InTransit)
                | (InTransit, Completed)
        )
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::WaitingShipment => "WaitingShipment",
            Self::Shipped => "Shipped",
            Self::InTransit => "InTransit",
            Self::Completed => "Completed",
        }
    }
}

/// Status of a fulfillment (printing) order.
///
/// ```text
/// Pending ──► InProduction ──► WaitingShipment ──► Shipped ──► Completed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FulfillmentStatus {
    #[default]
    Pending,
    InProduction,
    WaitingShipment,
    Shipped,
    /// Terminal.
    Completed,
}

impl OrderStatus for FulfillmentStatus {
    const KIND: OrderKind = OrderKind::Fulfillment;
    const ALL: &'static [Self] = &[
        Self::Pending,
        Self::InProduction,
        Self::WaitingShipment,
        Self::Shipped,
        Self::Completed,
    ];

    fn initial() -> Self {
        Self::Pending
    }

    fn can_transition_to(&self, next: Self) -> bool {
        use FulfillmentStatus::*;
        matches!(
            (self, next),
            (Pending, InProduction)
                | (InProduction, WaitingShipment)
                | (WaitingShipment, Shipped)
                | (Shipped, Completed)
        )
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProduction => "InProduction",
            Self::WaitingShipment => "WaitingShipment",
            Self::Shipped => "Shipped",
            Self::Completed => "Completed",
        }
    }
}

macro_rules! status_text {
    ($status:ty) => {
        impl fmt::Display for $status {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $status {
            type Err = TransitionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$status as OrderStatus>::ALL
                    .iter()
                    .copied()
                    .find(|status| status.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| TransitionError::UnknownStatus {
                        kind: <$status as OrderStatus>::KIND,
                        status: s.to_string(),
                    })
            }
        }
    };
}

status_text!(ApplicationStatus);
status_text!(FulfillmentStatus);

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed_pairs<S: OrderStatus>() -> Vec<(S, S)> {
        let mut pairs = Vec::new();
        for from in S::ALL {
            for to in S::ALL {
                if from.can_transition_to(*to) {
                    pairs.push((*from, *to));
                }
            }
        }
        pairs
    }

    #[test]
    fn test_application_graph_has_exactly_listed_edges() {
        use ApplicationStatus::*;
        assert_eq!(
            allowed_pairs::<ApplicationStatus>(),
            vec![
                (Pending, Approved),
                (Pending, Rejected),
                (Approved, WaitingShipment),
                (WaitingShipment, Shipped),
                (Shipped, InTransit),
                (InTransit, Completed),
            ]
        );
    }

    #[test]
    fn test_fulfillment_graph_has_exactly_listed_edges() {
        use FulfillmentStatus::*;
        assert_eq!(
            allowed_pairs::<FulfillmentStatus>(),
            vec![
                (Pending, InProduction),
                (InProduction, WaitingShipment),
                (WaitingShipment, Shipped),
                (Shipped, Completed),
            ]
        );
    }

    #[test]
    fn test_terminal_states() {
        let terminal: Vec<_> = ApplicationStatus::ALL
            .iter()
            .filter(|s| s.is_terminal())
            .copied()
            .collect();
        assert_eq!(
            terminal,
            vec![ApplicationStatus::Rejected, ApplicationStatus::Completed]
        );

        assert!(FulfillmentStatus::Completed.is_terminal());
        assert!(!FulfillmentStatus::Shipped.is_terminal());
    }

    #[test]
    fn test_initial_is_pending() {
        assert_eq!(ApplicationStatus::initial(), ApplicationStatus::Pending);
        assert_eq!(FulfillmentStatus::initial(), FulfillmentStatus::Pending);
        assert_eq!(ApplicationStatus::default(), ApplicationStatus::Pending);
    }

    #[test]
    fn test_pending_to_shipped_is_invalid() {
        let err = ApplicationStatus::Pending
            .validate_transition(ApplicationStatus::Shipped)
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidTransition {
                kind: OrderKind::Application,
                from: "Pending".to_string(),
                to: "Shipped".to_string(),
            }
        );
        assert_eq!(
            err.to_string(),
            "Invalid Application order transition: Pending -> Shipped"
        );
    }

    #[test]
    fn test_approved_cannot_return_to_pending() {
        assert!(
            ApplicationStatus::Approved
                .validate_transition(ApplicationStatus::Pending)
                .is_err()
        );
    }

    #[test]
    fn test_parse_status_names() {
        assert_eq!(
            "waitingshipment".parse::<ApplicationStatus>().unwrap(),
            ApplicationStatus::WaitingShipment
        );
        assert_eq!(
            "InProduction".parse::<FulfillmentStatus>().unwrap(),
            FulfillmentStatus::InProduction
        );
        assert!(matches!(
            "InTransit".parse::<FulfillmentStatus>(),
            Err(TransitionError::UnknownStatus { .. })
        ));
    }

    #[test]
    fn test_display_matches_serde_name() {
        for status in ApplicationStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }
}
