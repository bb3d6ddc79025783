//! Activity alert engine
//!
//! The registry owns active alerts and per-channel message counters; the
//! scheduler fires each alert's report deadline back into the registry.

mod delivery;
mod registry;
mod report;
mod scheduler;

pub use delivery::{resolve_channel_name, resolve_display_name, DeliveryError, Directory, MessageDelivery};
pub use registry::AlertRegistry;
pub use report::Report;
pub use scheduler::{Deadline, DeadlineDispatcher, DeadlineScheduler, Finalizer};

#[cfg(test)]
pub(crate) use delivery::testing;
