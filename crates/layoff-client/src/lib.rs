//! Client-side state for the Layoff job-search app.
//!
//! The crate owns the authenticated session, a gateway that turns every
//! backend exchange into a typed success or an [`ApiFailure`], and one store
//! per domain collection (jobs, applications, dashboard). Stores apply
//! changes only after the server confirms them; [`reconcile`] keeps the
//! derived state of one store in step with changes committed in another.
//!
//! [`AppContext`] builds the whole graph in the right order.

pub mod broadcast;
pub mod config;
pub mod context;
pub mod epoch;
pub mod error;
pub mod gateway;
mod lock;
pub mod logging;
pub mod models;
pub mod query;
pub mod reconcile;
pub mod session;
pub mod storage;
pub mod stores;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

use std::sync::Arc;

/// Time source shared by the session and dashboard stores.
pub type SharedClock = Arc<dyn mockable::Clock + Send + Sync>;

pub use broadcast::{StoreEvent, StoreEventBroadcaster, StoreKind};
pub use config::{load_config, load_config_from_str, ClientConfig};
pub use context::AppContext;
pub use error::{ClientError, ConfigError, Result, StorageError, ValidationError};
pub use gateway::{ApiFailure, FailureKind, HttpGateway, ReqwestTransport, Transport};
pub use logging::init_logging;
pub use reconcile::ReconciliationRules;
pub use session::{Credentials, Registration, SessionStatus, SessionStore, User};
pub use storage::{FileStorage, KeyValueStore, MemoryStorage};
pub use stores::{ApplicationStore, DashboardStore, JobStore};
