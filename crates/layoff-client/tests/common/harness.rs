//! Test harness for isolated context construction.
//!
//! Every `TestHarness` owns its own transport script, storage and clock, so
//! tests never share process-wide state.

#![allow(dead_code)]

use std::sync::Arc;

use layoff_client::config::ClientConfig;
use layoff_client::gateway::{endpoints, Method};
use layoff_client::storage::{KeyValueStore, MemoryStorage};
use layoff_client::testing::{seed_session, user_json, ManualClock, MockTransport};
use layoff_client::AppContext;

pub struct TestHarness {
    pub transport: Arc<MockTransport>,
    pub storage: Arc<MemoryStorage>,
    pub clock: Arc<ManualClock>,
    pub ctx: AppContext,
}

impl TestHarness {
    /// A context with nothing persisted.
    pub fn anonymous() -> Self {
        Self::build(false)
    }

    /// A context restored from a persisted session holding token `T1`.
    pub fn authenticated() -> Self {
        Self::build(true)
    }

    fn build(seeded: bool) -> Self {
        let transport = Arc::new(MockTransport::new());
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::default());
        if seeded {
            seed_session(&storage, &clock, "T1");
        }
        let ctx = AppContext::new(
            ClientConfig::default(),
            storage.clone(),
            transport.clone(),
            clock.clone(),
        );
        Self {
            transport,
            storage,
            clock,
            ctx,
        }
    }

    /// Scripts a successful login answering with user `u1` and `token`.
    pub fn script_login(&self, token: &str) {
        self.transport.respond(
            Method::Post,
            endpoints::AUTH_LOGIN,
            200,
            format!(r#"{{"user":{},"token":"{}"}}"#, user_json("u1"), token),
        );
    }

    pub fn stored(&self, key: &str) -> Option<String> {
        self.storage.get(key).expect("memory storage read")
    }
}
