use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw database identifier.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw identifier.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

numeric_id!(
    /// Identifier of a lottery product and therefore of its ledger row.
    ProductId
);
numeric_id!(
    /// Identifier of an application or fulfillment order row.
    OrderId
);
numeric_id!(
    /// Identifier of a sales outlet (the party applying for stock).
    OutletId
);
numeric_id!(
    /// Identifier of a lottery center (the approving party).
    CenterId
);
numeric_id!(
    /// Identifier of a printing factory (the fulfilling party).
    FactoryId
);
numeric_id!(OperatorId);

/// Tag distinguishing the two order lifecycles in shared tables such as
/// the status history log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    /// Orders raised by outlets and approved by centers.
    Application,
    /// Printing orders sent to factories.
    Fulfillment,
}

impl OrderKind {
    /// Returns the kind name as stored in the history log.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Application => "Application",
            OrderKind::Fulfillment => "Fulfillment",
        }
    }
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderKind {
    type Err = String;

    /// Parses a kind name case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "application" => Ok(OrderKind::Application),
            "fulfillment" => Ok(OrderKind::Fulfillment),
            other => Err(format!("unknown order kind: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_id_preserves_value() {
        let id = ProductId::new(42);
        assert_eq!(id.as_i64(), 42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&OrderId::new(7)).unwrap();
        assert_eq!(json, "7");
        let id: OutletId = serde_json::from_str("19").unwrap();
        assert_eq!(id, OutletId::new(19));
    }

    #[test]
    fn order_kind_parses_case_insensitively() {
        assert_eq!("Application".parse::<OrderKind>(), Ok(OrderKind::Application));
        assert_eq!("fulfillment".parse::<OrderKind>(), Ok(OrderKind::Fulfillment));
        assert!("printing".parse::<OrderKind>().is_err());
    }

    #[test]
    fn order_kind_display_matches_storage_name() {
        assert_eq!(OrderKind::Application.to_string(), "Application");
        assert_eq!(OrderKind::Fulfillment.to_string(), "Fulfillment");
    }
}
