//! Status history entries.

use chrono::{DateTime, Utc};
use common::{OperatorId, OrderId, OrderKind};
use serde::{Deserialize, Serialize};

/// Who caused a transition and why. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionContext {
    #[serde(default)]
    pub operator_id: Option<OperatorId>,
    #[serde(default)]
    pub operator_name: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl TransitionContext {
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// A history row waiting to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStatusHistoryEntry {
    pub order_kind: OrderKind,
    pub order_id: OrderId,
    pub from_status: String,
    pub to_status: String,
    pub context: TransitionContext,
    pub created_at: DateTime<Utc>,
}

/// One accepted transition. Rows are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub id: i64,
    pub order_kind: OrderKind,
    pub order_id: OrderId,
    pub from_status: String,
    pub to_status: String,
    pub operator_id: Option<OperatorId>,
    pub operator_name: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StatusHistoryEntry {
    /// Assigns the storage id to a pending row.
    pub fn from_new(id: i64, entry: NewStatusHistoryEntry) -> Self {
        Self {
            id,
            order_kind: entry.order_kind,
            order_id: entry.order_id,
            from_status: entry.from_status,
            to_status: entry.to_status,
            operator_id: entry.context.operator_id,
            operator_name: entry.context.operator_name,
            reason: entry.context.reason,
            created_at: entry.created_at,
        }
    }
}
