//! Domain stores: one entity collection each, fed through the gateway.
//!
//! All three follow the same rules:
//! - mutations are applied only after the server confirms them;
//! - a failure keeps the previous state and records the message in `error`
//!   until a later success or an explicit `clear_error`;
//! - each list and current-item slot carries a [`RequestEpoch`], so a
//!   response that resolves after a newer request was issued is dropped.
//!
//! [`RequestEpoch`]: crate::epoch::RequestEpoch

mod application;
mod dashboard;
mod job;

pub use application::{
    ApplicationChange, ApplicationChangeListener, ApplicationState, ApplicationStore,
};
pub use dashboard::{DashboardState, DashboardStore};
pub use job::{JobState, JobStore};
