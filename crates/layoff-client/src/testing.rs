//! Test doubles and fixtures shared by unit and integration tests.
//!
//! Enabled for this crate's own tests and, for downstream crates, with the
//! `test-support` feature.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use tokio::sync::oneshot;

use crate::broadcast::StoreEventBroadcaster;
use crate::config::ClientConfig;
use crate::gateway::{ApiRequest, Method, RawResponse, Transport, TransportError};
use crate::models::{ApplicationStatus, Job, StatusCounts};
use crate::session::SessionStore;
use crate::storage::{KeyValueStore, MemoryStorage, ACCESS_TOKEN_KEY, SESSION_EXPIRY_KEY, USER_KEY};

type Outcome = Result<RawResponse, TransportError>;

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ─── Transport ──────────────────────────────────────────────────────────────

enum Scripted {
    Ready(Outcome),
    Deferred(oneshot::Receiver<Outcome>),
}

/// Scripted transport keyed by method and path.
///
/// Responses for a route are served in the order they were scripted. The
/// last ready response of a route keeps answering once the queue is down
/// to it. Unscripted routes answer 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

/// Releases a held response.
pub struct DeferredResponse {
    sender: oneshot::Sender<Outcome>,
}

impl DeferredResponse {
    pub fn release(self, status: u16, body: impl Into<String>) {
        let _ = self.sender.send(Ok(RawResponse {
            status,
            body: body.into(),
        }));
    }

    pub fn fail(self, error: TransportError) {
        let _ = self.sender.send(Err(error));
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: Method, path: &str, status: u16, body: impl Into<String>) {
        self.script(
            method,
            path,
            Scripted::Ready(Ok(RawResponse {
                status,
                body: body.into(),
            })),
        );
    }

    pub fn fail(&self, method: Method, path: &str, error: TransportError) {
        self.script(method, path, Scripted::Ready(Err(error)));
    }

    /// Queues a response the test resolves later, to interleave requests.
    pub fn hold(&self, method: Method, path: &str) -> DeferredResponse {
        let (sender, receiver) = oneshot::channel();
        self.script(method, path, Scripted::Deferred(receiver));
        DeferredResponse { sender }
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        guard(&self.requests).clone()
    }

    pub fn last_request(&self, method: Method, path: &str) -> Option<ApiRequest> {
        guard(&self.requests)
            .iter()
            .rev()
            .find(|r| r.method == method && r.path == path)
            .cloned()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> usize {
        guard(&self.requests)
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    fn script(&self, method: Method, path: &str, entry: Scripted) {
        guard(&self.routes)
            .entry((method, path.to_string()))
            .or_default()
            .push_back(entry);
    }

    fn next(&self, method: Method, path: &str) -> Option<Scripted> {
        let mut routes = guard(&self.routes);
        let queue = routes.get_mut(&(method, path.to_string()))?;
        if queue.len() == 1 {
            if let Some(Scripted::Ready(outcome)) = queue.front() {
                return Some(Scripted::Ready(outcome.clone()));
            }
        }
        queue.pop_front()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
        let (method, path) = (request.method, request.path.clone());
        guard(&self.requests).push(request);

        match self.next(method, &path) {
            Some(Scripted::Ready(outcome)) => outcome,
            Some(Scripted::Deferred(receiver)) => receiver
                .await
                .unwrap_or_else(|_| Err(TransportError::Unreachable("response dropped".into()))),
            None => Ok(RawResponse {
                status: 404,
                body: format!(r#"{{"message":"No route for {} {}"}}"#, method, path),
            }),
        }
    }
}

// ─── Clock ──────────────────────────────────────────────────────────────────

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        *guard(&self.now)
    }

    pub fn advance_seconds(&self, seconds: i64) {
        *guard(&self.now) += TimeDelta::seconds(seconds);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).single().unwrap_or_default())
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.now()
    }
}

// ─── Sessions ───────────────────────────────────────────────────────────────

/// Writes a persisted session valid for one hour from the clock's time.
pub fn seed_session(storage: &MemoryStorage, clock: &ManualClock, token: &str) {
    let expiry = clock.now() + TimeDelta::hours(1);
    let entries = [
        (ACCESS_TOKEN_KEY, token.to_string()),
        (USER_KEY, user_json("u1")),
        (SESSION_EXPIRY_KEY, expiry.timestamp_millis().to_string()),
    ];
    for (key, value) in entries {
        if let Err(e) = storage.set(key, &value) {
            panic!("seeding '{}' failed: {}", key, e);
        }
    }
}

/// Builds a session store over the given storage, restoring what it holds.
pub fn restored_session(
    transport: Arc<MockTransport>,
    storage: Arc<MemoryStorage>,
    clock: Arc<ManualClock>,
) -> Arc<SessionStore> {
    Arc::new(SessionStore::new(
        transport,
        storage,
        clock,
        &ClientConfig::default(),
        StoreEventBroadcaster::default(),
    ))
}

/// An authenticated session holding token `T1`.
pub fn session_with_token(transport: Arc<MockTransport>) -> Arc<SessionStore> {
    let storage = Arc::new(MemoryStorage::new());
    let clock = Arc::new(ManualClock::default());
    seed_session(&storage, &clock, "T1");
    restored_session(transport, storage, clock)
}

// ─── Fixtures ───────────────────────────────────────────────────────────────

pub fn user_json(id: &str) -> String {
    format!(
        r#"{{"id":"{id}","email":"{id}@layoffapp.com","name":"Demo User","role":"user"}}"#
    )
}

pub fn job_json(id: &str, bookmarked: bool) -> String {
    format!(
        r#"{{"id":"{id}","title":"Engineer {id}","company":"Acme","location":"Remote","type":"full-time","remote":true,"experienceLevel":"mid","postedAt":"2026-02-20T10:00:00Z","isBookmarked":{bookmarked}}}"#
    )
}

pub fn job_value(id: &str, bookmarked: bool) -> Job {
    match serde_json::from_str(&job_json(id, bookmarked)) {
        Ok(job) => job,
        Err(e) => panic!("job fixture does not decode: {}", e),
    }
}

/// One page of jobs as `(id, bookmarked)` pairs.
pub fn job_page_json(jobs: &[(&str, bool)], page: u32, total_pages: u32) -> String {
    let items: Vec<String> = jobs.iter().map(|(id, b)| job_json(id, *b)).collect();
    format!(
        r#"{{"jobs":[{}],"page":{},"limit":20,"total":{},"totalPages":{}}}"#,
        items.join(","),
        page,
        jobs.len(),
        total_pages
    )
}

/// An application for job `job-{id}`.
pub fn application_json(id: &str, status: &str) -> String {
    format!(
        r#"{{"id":"{id}","jobId":"job-{id}","jobTitle":"Engineer","company":"Acme","status":"{status}","appliedAt":"2026-02-21T10:00:00Z","lastUpdated":"2026-02-22T10:00:00Z"}}"#
    )
}

/// A single page of applications as `(id, status)` pairs, with statistics
/// that match the list.
pub fn application_page_json(applications: &[(&str, &str)]) -> String {
    let items: Vec<String> = applications
        .iter()
        .map(|(id, status)| application_json(id, status))
        .collect();
    let statuses = applications.iter().map(|(_, status)| parse_status(status));
    let statistics = StatusCounts::from_statuses(statuses);
    format!(
        r#"{{"applications":[{}],"statistics":{},"pagination":{{"page":1,"limit":20,"total":{},"totalPages":1}}}}"#,
        items.join(","),
        serde_json::json!(statistics),
        applications.len()
    )
}

fn parse_status(status: &str) -> ApplicationStatus {
    match serde_json::from_value(serde_json::Value::String(status.to_string())) {
        Ok(status) => status,
        Err(e) => panic!("unknown application status '{}': {}", status, e),
    }
}

/// A dashboard with the given `applied` and `interview` counts, one item of
/// each kind: activity `act1`, event `e1`, alert `alert1` and goal `g1`.
pub fn dashboard_json(applied: u64, interview: u64) -> String {
    format!(
        r#"{{
            "stats": {{
                "statusCounts": {{"applied": {applied}, "interview": {interview}}},
                "responseRate": 0.25,
                "avgResponseTime": 4.0,
                "applicationTrends": []
            }},
            "recentActivity": [{{"id":"act1","type":"application","title":"Applied","company":"Acme","date":"2026-03-01T12:00:00Z"}}],
            "upcomingEvents": [{{"id":"e1","type":"interview","title":"Tech screen","date":"2026-03-05","priority":"high"}}],
            "jobAlerts": [{{"id":"alert1","query":"rust","isActive":true,"createdAt":"2026-01-01T00:00:00Z","lastChecked":"2026-03-01T00:00:00Z","newJobsCount":3}}],
            "quickActions": [],
            "goals": [{{"id":"g1","title":"Apply","target":5,"current":1,"period":"weekly","type":"applications"}}]
        }}"#
    )
}
