//! Broadcasting of committed state changes.

mod store_events;

pub use store_events::{StoreEvent, StoreEventBroadcaster, StoreKind};
