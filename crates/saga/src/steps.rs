//! Saga step names, used as the `step` label of `saga_steps_total`.

/// Reserve stock when an application order is created.
pub const STEP_RESERVE: &str = "reserve";

/// Confirm the approved quantity when an application order is approved.
pub const STEP_CONFIRM: &str = "confirm";

/// Release the whole reservation when an application order is rejected.
pub const STEP_RELEASE: &str = "release";

/// Release the unapproved part of a partially approved order.
pub const STEP_RELEASE_REMAINDER: &str = "release_remainder";

/// Publish printed stock when an unlinked fulfillment order completes.
pub const STEP_RESTOCK: &str = "restock";

/// Create the fulfillment order that follows an approval.
pub const STEP_CREATE_FULFILLMENT: &str = "create_fulfillment";

/// The status write of a transition without a ledger call.
pub const STEP_STATUS_UPDATE: &str = "status_update";

pub(crate) fn record(step: &'static str, outcome: &'static str) {
    metrics::counter!("saga_steps_total", "step" => step, "outcome" => outcome).increment(1);
}
