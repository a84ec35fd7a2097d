//! Application and fulfillment orders.

mod model;
mod number;
mod state;

pub use model::{ApplicationOrder, FulfillmentOrder, NewApplicationOrder, NewFulfillmentOrder};
pub use number::{
    Clock, MAX_SEQUENCE, ManualClock, OrderNumber, SequenceGenerator, SystemClock, prefix_for,
};
pub use state::{ApplicationStatus, FulfillmentStatus, OrderStatus};
