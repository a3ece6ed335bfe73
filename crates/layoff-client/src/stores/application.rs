use std::sync::{Arc, RwLock, RwLockWriteGuard};

use chrono::NaiveDate;
use serde::Serialize;

use crate::broadcast::{StoreEvent, StoreEventBroadcaster, StoreKind};
use crate::epoch::RequestEpoch;
use crate::error::{ClientError, Result};
use crate::gateway::{endpoints, ApiFailure, ApiRequest, HttpGateway, QueryParams};
use crate::lock;
use crate::models::{
    Application, ApplicationFilters, ApplicationListResponse, ApplicationStatus, FilterSet,
    InterviewSchedule, NewApplication, Pagination, StatusCounts,
};

/// A committed change other stores may need to mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationChange {
    Added {
        application_id: String,
        job_id: String,
        status: ApplicationStatus,
    },
    StatusChanged {
        application_id: String,
        job_id: String,
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    Removed {
        application_id: String,
        job_id: String,
        status: ApplicationStatus,
    },
}

/// Receives application changes synchronously, after the application state
/// has been committed and its lock released.
pub trait ApplicationChangeListener: Send + Sync {
    fn on_application_change(&self, change: &ApplicationChange);
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationState {
    pub applications: Vec<Application>,
    pub current_application: Option<Application>,
    pub filters: ApplicationFilters,
    pub statistics: StatusCounts,
    pub pagination: Pagination,
    pub is_loading: bool,
    pub is_loading_current: bool,
    pub is_submitting: bool,
    pub is_updating: bool,
    pub error: Option<String>,
}

impl ApplicationState {
    pub fn new(page_size: u32) -> Self {
        Self {
            applications: Vec::new(),
            current_application: None,
            filters: ApplicationFilters::default(),
            statistics: StatusCounts::default(),
            pagination: Pagination::new(page_size),
            is_loading: false,
            is_loading_current: false,
            is_submitting: false,
            is_updating: false,
            error: None,
        }
    }

    pub fn find(&self, application_id: &str) -> Option<&Application> {
        self.applications.iter().find(|a| a.id == application_id)
    }

    /// Last known copy of a record, from the list or the current slot.
    fn known(&self, application_id: &str) -> Option<&Application> {
        self.find(application_id).or_else(|| {
            self.current_application
                .as_ref()
                .filter(|a| a.id == application_id)
        })
    }
}

impl Default for ApplicationState {
    fn default() -> Self {
        Self::new(20)
    }
}

/// Replaces a server-confirmed record by identity and moves the status
/// counters in the same critical section.
///
/// The list copy is only replaced if present; the current slot likewise.
/// Counters move only when the previous status is known.
fn apply_record(state: &mut ApplicationState, updated: Application) -> Option<ApplicationChange> {
    let previous = state.known(&updated.id).map(|a| a.status);

    if let Some(slot) = state.applications.iter_mut().find(|a| a.id == updated.id) {
        *slot = updated.clone();
    }
    if let Some(current) = state
        .current_application
        .as_mut()
        .filter(|a| a.id == updated.id)
    {
        *current = updated.clone();
    }

    match previous {
        Some(from) if from != updated.status => {
            state.statistics.transition(from, updated.status);
            Some(ApplicationChange::StatusChanged {
                application_id: updated.id,
                job_id: updated.job_id,
                from,
                to: updated.status,
            })
        }
        Some(_) => None,
        None => {
            log::debug!(
                "Application {} is not loaded; statistics left unchanged",
                updated.id
            );
            None
        }
    }
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct ApplicationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<ApplicationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    follow_up_date: Option<NaiveDate>,
}

pub struct ApplicationStore {
    state: RwLock<ApplicationState>,
    gateway: Arc<HttpGateway>,
    events: StoreEventBroadcaster,
    listener: Option<Arc<dyn ApplicationChangeListener>>,
    list_epoch: RequestEpoch,
    item_epoch: RequestEpoch,
    page_size: u32,
}

impl ApplicationStore {
    pub fn new(gateway: Arc<HttpGateway>, events: StoreEventBroadcaster, page_size: u32) -> Self {
        Self {
            state: RwLock::new(ApplicationState::new(page_size)),
            gateway,
            events,
            listener: None,
            list_epoch: RequestEpoch::new(),
            item_epoch: RequestEpoch::new(),
            page_size,
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn ApplicationChangeListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    // ─── Listing ────────────────────────────────────────────────────────────

    pub async fn fetch_list(
        &self,
        filters: &ApplicationFilters,
        page: u32,
        limit: u32,
    ) -> Result<Pagination> {
        let epoch = self.list_epoch.begin();
        self.write_state().is_loading = true;

        let mut query = filters.to_query();
        query.push("page", page).push("limit", limit);
        let outcome = self
            .gateway
            .get::<ApplicationListResponse>(endpoints::APPLICATIONS, query)
            .await;

        if !self.list_epoch.is_current(epoch) {
            log::debug!("Dropping superseded application list response (page {})", page);
            return Err(ClientError::Superseded);
        }

        let mut state = self.write_state();
        state.is_loading = false;
        match outcome {
            Ok(response) => {
                let count = response.applications.len();
                state.statistics = response.statistics.unwrap_or_else(|| {
                    StatusCounts::from_statuses(response.applications.iter().map(|a| a.status))
                });
                state.pagination = response
                    .pagination
                    .unwrap_or_else(|| Pagination::single_page(page, limit, count));
                state.applications = response.applications;
                state.error = None;

                let pagination = state.pagination.clone();
                drop(state);

                log::debug!("Loaded {} applications", count);
                self.events.send(StoreEvent::ApplicationsLoaded { count });
                Ok(pagination)
            }
            Err(failure) => Err(self.fail(state, failure)),
        }
    }

    /// First page with the current filters.
    pub async fn search(&self) -> Result<Pagination> {
        let (filters, limit) = self.query_inputs();
        self.fetch_list(&filters, 1, limit).await
    }

    pub async fn load_more(&self) -> Result<Pagination> {
        let pagination = self.read_state().pagination.clone();
        if !pagination.has_more() {
            return Ok(pagination);
        }
        let (filters, limit) = self.query_inputs();
        self.fetch_list(&filters, pagination.page + 1, limit).await
    }

    pub async fn refresh(&self) -> Result<Pagination> {
        let page = self.read_state().pagination.page.max(1);
        let (filters, limit) = self.query_inputs();
        self.fetch_list(&filters, page, limit).await
    }

    fn query_inputs(&self) -> (ApplicationFilters, u32) {
        let state = self.read_state();
        let limit = if state.pagination.limit == 0 {
            self.page_size
        } else {
            state.pagination.limit
        };
        (state.filters.clone(), limit)
    }

    pub async fn fetch_one(&self, application_id: &str) -> Result<Application> {
        let epoch = self.item_epoch.begin();
        self.write_state().is_loading_current = true;

        let outcome = self
            .gateway
            .get::<Application>(endpoints::application(application_id), QueryParams::new())
            .await;

        if !self.item_epoch.is_current(epoch) {
            log::debug!("Dropping superseded response for application {}", application_id);
            return Err(ClientError::Superseded);
        }

        let mut state = self.write_state();
        state.is_loading_current = false;
        match outcome {
            Ok(application) => {
                state.current_application = Some(application.clone());
                state.error = None;
                Ok(application)
            }
            Err(failure) => Err(self.fail(state, failure)),
        }
    }

    // ─── Mutations ──────────────────────────────────────────────────────────

    /// Submits a new application. The record is prepended and counted once
    /// the server returns it.
    pub async fn submit(&self, application: NewApplication) -> Result<Application> {
        let request = ApiRequest::post(endpoints::APPLICATIONS).with_json(&application)?;

        self.write_state().is_submitting = true;
        let outcome = self.gateway.send::<Application>(request).await;

        let mut state = self.write_state();
        state.is_submitting = false;
        match outcome {
            Ok(created) => {
                state.applications.insert(0, created.clone());
                state.statistics.increment(created.status);
                state.pagination.total += 1;
                state.error = None;
                drop(state);

                log::info!("Submitted application {} for job {}", created.id, created.job_id);
                self.events.send(StoreEvent::ApplicationAdded {
                    application_id: created.id.clone(),
                    status: created.status,
                });
                self.notify(ApplicationChange::Added {
                    application_id: created.id.clone(),
                    job_id: created.job_id.clone(),
                    status: created.status,
                });
                Ok(created)
            }
            Err(failure) => Err(self.fail(state, failure)),
        }
    }

    pub async fn transition_status(
        &self,
        application_id: &str,
        status: ApplicationStatus,
        notes: Option<String>,
    ) -> Result<Application> {
        let patch = ApplicationPatch {
            status: Some(status),
            notes,
            ..Default::default()
        };
        let request = ApiRequest::patch(endpoints::application(application_id)).with_json(&patch)?;
        self.update_remote(request).await
    }

    pub async fn withdraw(&self, application_id: &str) -> Result<Application> {
        self.update_remote(ApiRequest::post(endpoints::application_withdraw(
            application_id,
        )))
        .await
    }

    pub async fn schedule_interview(
        &self,
        application_id: &str,
        schedule: InterviewSchedule,
    ) -> Result<Application> {
        let request = ApiRequest::post(endpoints::application_interview(application_id))
            .with_json(&schedule)?;
        self.update_remote(request).await
    }

    pub async fn update_notes(
        &self,
        application_id: &str,
        notes: impl Into<String>,
    ) -> Result<Application> {
        let patch = ApplicationPatch {
            notes: Some(notes.into()),
            ..Default::default()
        };
        let request = ApiRequest::patch(endpoints::application(application_id)).with_json(&patch)?;
        self.update_remote(request).await
    }

    pub async fn set_follow_up_date(
        &self,
        application_id: &str,
        date: NaiveDate,
    ) -> Result<Application> {
        let patch = ApplicationPatch {
            follow_up_date: Some(date),
            ..Default::default()
        };
        let request = ApiRequest::patch(endpoints::application(application_id)).with_json(&patch)?;
        self.update_remote(request).await
    }

    pub async fn delete(&self, application_id: &str) -> Result<()> {
        self.write_state().is_updating = true;
        let outcome = self
            .gateway
            .delete(endpoints::application(application_id))
            .await;

        let mut state = self.write_state();
        state.is_updating = false;
        if let Err(failure) = outcome {
            return Err(self.fail(state, failure));
        }

        let removed = state
            .known(application_id)
            .map(|a| (a.job_id.clone(), a.status));
        let before = state.applications.len();
        state.applications.retain(|a| a.id != application_id);
        if state.applications.len() < before {
            state.pagination.total = state.pagination.total.saturating_sub(1);
        }
        if state
            .current_application
            .as_ref()
            .is_some_and(|a| a.id == application_id)
        {
            state.current_application = None;
        }
        if let Some((_, status)) = &removed {
            state.statistics.decrement(*status);
        }
        state.error = None;
        drop(state);

        log::info!("Deleted application {}", application_id);
        self.events.send(StoreEvent::ApplicationRemoved {
            application_id: application_id.to_string(),
        });
        match removed {
            Some((job_id, status)) => self.notify(ApplicationChange::Removed {
                application_id: application_id.to_string(),
                job_id,
                status,
            }),
            None => log::debug!(
                "Deleted application {} was not loaded; statistics left unchanged",
                application_id
            ),
        }
        Ok(())
    }

    /// Sends a request that returns the updated record and runs the result
    /// through [`apply_record`].
    async fn update_remote(&self, request: ApiRequest) -> Result<Application> {
        self.write_state().is_updating = true;
        let outcome = self.gateway.send::<Application>(request).await;

        let mut state = self.write_state();
        state.is_updating = false;
        match outcome {
            Ok(updated) => {
                let change = apply_record(&mut state, updated.clone());
                state.error = None;
                drop(state);

                if let Some(change) = change {
                    if let ApplicationChange::StatusChanged {
                        application_id,
                        from,
                        to,
                        ..
                    } = &change
                    {
                        log::info!("Application {} moved {} -> {}", application_id, from, to);
                        self.events.send(StoreEvent::ApplicationStatusChanged {
                            application_id: application_id.clone(),
                            from: *from,
                            to: *to,
                        });
                    }
                    self.notify(change);
                }
                Ok(updated)
            }
            Err(failure) => Err(self.fail(state, failure)),
        }
    }

    fn notify(&self, change: ApplicationChange) {
        if let Some(listener) = &self.listener {
            listener.on_application_change(&change);
        }
    }

    // ─── Local edits ────────────────────────────────────────────────────────

    pub fn set_filters(&self, patch: ApplicationFilters) {
        self.write_state().filters.merge(patch);
    }

    pub fn clear_filters(&self) {
        self.write_state().filters = ApplicationFilters::default();
    }

    pub fn set_current(&self, application: Option<Application>) {
        self.write_state().current_application = application;
    }

    pub fn clear_error(&self) {
        self.write_state().error = None;
    }

    pub fn reset(&self) {
        self.list_epoch.invalidate();
        self.item_epoch.invalidate();
        *self.write_state() = ApplicationState::new(self.page_size);
    }

    // ─── Reads ──────────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> ApplicationState {
        self.read_state().clone()
    }

    pub fn statistics(&self) -> StatusCounts {
        self.read_state().statistics
    }

    pub fn error(&self) -> Option<String> {
        self.read_state().error.clone()
    }

    fn fail(
        &self,
        mut state: RwLockWriteGuard<'_, ApplicationState>,
        failure: ApiFailure,
    ) -> ClientError {
        log::warn!(
            "Application request failed ({}): {}",
            failure.status_code,
            failure.message
        );
        state.error = Some(failure.message.clone());
        drop(state);
        self.events.failure(StoreKind::Applications, &failure.message);
        failure.into()
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, ApplicationState> {
        lock::read(&self.state, "Application store")
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ApplicationState> {
        lock::write(&self.state, "Application store")
    }
}
