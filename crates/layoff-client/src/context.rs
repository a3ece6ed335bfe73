use std::sync::Arc;

use mockable::DefaultClock;

use crate::broadcast::StoreEventBroadcaster;
use crate::config::{loader::validate_config, ClientConfig};
use crate::error::Result;
use crate::gateway::{HttpGateway, ReqwestTransport, Transport};
use crate::reconcile::ReconciliationRules;
use crate::session::SessionStore;
use crate::storage::{FileStorage, KeyValueStore, MemoryStorage};
use crate::stores::{ApplicationStore, DashboardStore, JobStore};
use crate::SharedClock;

/// One instance of every store, wired together.
///
/// Construction order is fixed: broadcaster, session (which restores any
/// persisted credentials), gateway, then the domain stores. The application
/// store reports its changes to [`ReconciliationRules`], which patch the job
/// and dashboard stores.
pub struct AppContext {
    config: ClientConfig,
    events: StoreEventBroadcaster,
    session: Arc<SessionStore>,
    gateway: Arc<HttpGateway>,
    jobs: Arc<JobStore>,
    applications: Arc<ApplicationStore>,
    dashboard: Arc<DashboardStore>,
}

impl AppContext {
    pub fn new(
        config: ClientConfig,
        storage: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
        clock: SharedClock,
    ) -> Self {
        let events = StoreEventBroadcaster::new(config.event_capacity);
        let session = Arc::new(SessionStore::new(
            transport.clone(),
            storage,
            clock.clone(),
            &config,
            events.clone(),
        ));
        let gateway = Arc::new(HttpGateway::new(transport, session.clone()));

        let page_size = config.default_page_size;
        let jobs = Arc::new(JobStore::new(gateway.clone(), events.clone(), page_size));
        let dashboard = Arc::new(DashboardStore::new(gateway.clone(), events.clone(), clock));
        let rules = Arc::new(ReconciliationRules::new(dashboard.clone(), jobs.clone()));
        let applications = Arc::new(
            ApplicationStore::new(gateway.clone(), events.clone(), page_size).with_listener(rules),
        );

        log::debug!("App context ready (base URL {})", config.base_url);
        Self {
            config,
            events,
            session,
            gateway,
            jobs,
            applications,
            dashboard,
        }
    }

    /// Wires the production transport, file-backed storage and system clock.
    ///
    /// The base URL can be overridden from the environment. Falls back to
    /// in-memory storage when no storage path can be resolved.
    pub fn from_config(mut config: ClientConfig) -> Result<Self> {
        config.apply_env_overrides();
        validate_config(&config)?;

        let transport = Arc::new(ReqwestTransport::new(&config)?);
        let storage: Arc<dyn KeyValueStore> = match config.resolved_storage_path() {
            Some(path) => Arc::new(FileStorage::open(path)?),
            None => {
                log::warn!("No home directory; session will not survive a restart");
                Arc::new(MemoryStorage::new())
            }
        };

        Ok(Self::new(config, storage, transport, Arc::new(DefaultClock)))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn events(&self) -> &StoreEventBroadcaster {
        &self.events
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn gateway(&self) -> &Arc<HttpGateway> {
        &self.gateway
    }

    pub fn jobs(&self) -> &Arc<JobStore> {
        &self.jobs
    }

    pub fn applications(&self) -> &Arc<ApplicationStore> {
        &self.applications
    }

    pub fn dashboard(&self) -> &Arc<DashboardStore> {
        &self.dashboard
    }

    /// Drops the session and returns every store to its initial state.
    /// Nothing is sent to the server.
    pub fn teardown(&self) {
        self.session.teardown();
        self.jobs.reset();
        self.applications.reset();
        self.dashboard.reset();
        log::debug!("App context torn down");
    }
}
