use std::sync::{Arc, RwLock};

use crate::broadcast::{StoreEvent, StoreEventBroadcaster, StoreKind};
use crate::epoch::RequestEpoch;
use crate::error::{ClientError, Result};
use crate::gateway::{endpoints, ApiFailure, ApiRequest, HttpGateway, QueryParams};
use crate::lock;
use crate::models::{
    FilterSet, Job, JobApplicationStatus, JobFilters, JobListResponse, Pagination,
};
use crate::reconcile;

/// Observable job state. `bookmarked_jobs` is derived from the
/// `is_bookmarked` flags and never edited on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct JobState {
    pub jobs: Vec<Job>,
    pub bookmarked_jobs: Vec<Job>,
    pub current_job: Option<Job>,
    pub filters: JobFilters,
    pub pagination: Pagination,
    pub is_loading: bool,
    pub is_loading_current: bool,
    pub is_bookmarking: bool,
    pub error: Option<String>,
}

impl JobState {
    pub fn new(page_size: u32) -> Self {
        Self {
            jobs: Vec::new(),
            bookmarked_jobs: Vec::new(),
            current_job: None,
            filters: JobFilters::default(),
            pagination: Pagination::new(page_size),
            is_loading: false,
            is_loading_current: false,
            is_bookmarking: false,
            error: None,
        }
    }

    pub fn find(&self, job_id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == job_id)
    }

    pub fn is_bookmarked(&self, job_id: &str) -> bool {
        self.find(job_id)
            .or_else(|| self.current_job.as_ref().filter(|j| j.id == job_id))
            .map(|j| j.is_bookmarked)
            .unwrap_or_else(|| self.bookmarked_jobs.iter().any(|j| j.id == job_id))
    }
}

impl Default for JobState {
    fn default() -> Self {
        Self::new(20)
    }
}

pub struct JobStore {
    state: RwLock<JobState>,
    gateway: Arc<HttpGateway>,
    events: StoreEventBroadcaster,
    list_epoch: RequestEpoch,
    item_epoch: RequestEpoch,
    page_size: u32,
}

impl JobStore {
    pub fn new(gateway: Arc<HttpGateway>, events: StoreEventBroadcaster, page_size: u32) -> Self {
        Self {
            state: RwLock::new(JobState::new(page_size)),
            gateway,
            events,
            list_epoch: RequestEpoch::new(),
            item_epoch: RequestEpoch::new(),
            page_size,
        }
    }

    // ─── Listing ────────────────────────────────────────────────────────────

    /// Loads one page. On success the list and cursor are replaced wholesale
    /// and the bookmarked subset is re-synced from the page's flags.
    pub async fn fetch_list(
        &self,
        filters: &JobFilters,
        page: u32,
        limit: u32,
    ) -> Result<Pagination> {
        let epoch = self.list_epoch.begin();
        self.write_state().is_loading = true;

        let mut query = filters.to_query();
        query.push("page", page).push("limit", limit);
        let outcome = self
            .gateway
            .get::<JobListResponse>(endpoints::JOBS, query)
            .await;

        if !self.list_epoch.is_current(epoch) {
            log::debug!("Dropping superseded job list response (page {})", page);
            return Err(ClientError::Superseded);
        }

        let mut state = self.write_state();
        state.is_loading = false;
        match outcome {
            Ok(response) => {
                state.jobs = response.jobs;
                state.pagination = response.pagination;
                reconcile::sync_bookmarks_from_page(&mut state);
                state.error = None;

                let pagination = state.pagination.clone();
                let count = state.jobs.len();
                drop(state);

                log::debug!("Loaded {} jobs (page {})", count, pagination.page);
                self.events.send(StoreEvent::JobsLoaded {
                    count,
                    page: pagination.page,
                });
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

    /// Next page. Does nothing when the cursor is already on the last page.
    pub async fn load_more(&self) -> Result<Pagination> {
        let pagination = self.read_state().pagination.clone();
        if !pagination.has_more() {
            log::debug!("No more job pages after {}", pagination.page);
            return Ok(pagination);
        }
        let (filters, limit) = self.query_inputs();
        self.fetch_list(&filters, pagination.page + 1, limit).await
    }

    /// Reloads the current page.
    pub async fn refresh(&self) -> Result<Pagination> {
        let page = self.read_state().pagination.page.max(1);
        let (filters, limit) = self.query_inputs();
        self.fetch_list(&filters, page, limit).await
    }

    fn query_inputs(&self) -> (JobFilters, u32) {
        let state = self.read_state();
        let limit = if state.pagination.limit == 0 {
            self.page_size
        } else {
            state.pagination.limit
        };
        (state.filters.clone(), limit)
    }

    pub async fn fetch_one(&self, job_id: &str) -> Result<Job> {
        let epoch = self.item_epoch.begin();
        self.write_state().is_loading_current = true;

        let outcome = self
            .gateway
            .get::<Job>(endpoints::job(job_id), QueryParams::new())
            .await;

        if !self.item_epoch.is_current(epoch) {
            log::debug!("Dropping superseded response for job {}", job_id);
            return Err(ClientError::Superseded);
        }

        let mut state = self.write_state();
        state.is_loading_current = false;
        match outcome {
            Ok(job) => {
                state.current_job = Some(job.clone());
                state.error = None;
                Ok(job)
            }
            Err(failure) => Err(self.fail(state, failure)),
        }
    }

    // ─── Bookmarks ──────────────────────────────────────────────────────────

    pub async fn bookmark(&self, job_id: &str) -> Result<Job> {
        self.write_state().is_bookmarking = true;

        let outcome = self
            .gateway
            .send::<Job>(ApiRequest::post(endpoints::job_bookmark(job_id)))
            .await;

        let mut state = self.write_state();
        state.is_bookmarking = false;
        match outcome {
            Ok(job) => {
                reconcile::apply_bookmark(&mut state, job_id, true, Some(job.clone()));
                drop(state);
                self.bookmark_changed(job_id, true);
                Ok(job)
            }
            Err(failure) => Err(self.fail(state, failure)),
        }
    }

    pub async fn unbookmark(&self, job_id: &str) -> Result<()> {
        self.write_state().is_bookmarking = true;

        let outcome = self.gateway.delete(endpoints::job_bookmark(job_id)).await;

        let mut state = self.write_state();
        state.is_bookmarking = false;
        match outcome {
            Ok(()) => {
                reconcile::apply_bookmark(&mut state, job_id, false, None);
                drop(state);
                self.bookmark_changed(job_id, false);
                Ok(())
            }
            Err(failure) => Err(self.fail(state, failure)),
        }
    }

    /// Flips the bookmark and returns the new flag.
    pub async fn toggle_bookmark(&self, job_id: &str) -> Result<bool> {
        if self.is_bookmarked(job_id) {
            self.unbookmark(job_id).await.map(|()| false)
        } else {
            self.bookmark(job_id).await.map(|_| true)
        }
    }

    /// Replaces the bookmarked subset with the server's and re-flags the list.
    pub async fn fetch_bookmarks(&self) -> Result<usize> {
        let outcome = self
            .gateway
            .get::<Vec<Job>>(endpoints::JOB_BOOKMARKS, QueryParams::new())
            .await;

        let mut state = self.write_state();
        match outcome {
            Ok(jobs) => {
                reconcile::replace_bookmarks(&mut state, jobs);
                state.error = None;
                Ok(state.bookmarked_jobs.len())
            }
            Err(failure) => Err(self.fail(state, failure)),
        }
    }

    fn bookmark_changed(&self, job_id: &str, bookmarked: bool) {
        log::debug!("Job {} bookmarked: {}", job_id, bookmarked);
        self.events.send(StoreEvent::JobBookmarkChanged {
            job_id: job_id.to_string(),
            bookmarked,
        });
    }

    // ─── Local edits ────────────────────────────────────────────────────────

    pub fn set_filters(&self, patch: JobFilters) {
        self.write_state().filters.merge(patch);
    }

    pub fn clear_filters(&self) {
        self.write_state().filters = JobFilters::default();
    }

    pub fn set_current(&self, job: Option<Job>) {
        self.write_state().current_job = job;
    }

    /// Patches the card status of a job wherever it is held. Returns whether
    /// any copy was found.
    pub fn update_job_status(&self, job_id: &str, status: JobApplicationStatus) -> bool {
        let mut state = self.write_state();
        let mut found = false;
        let state = &mut *state;
        for job in state
            .jobs
            .iter_mut()
            .chain(state.bookmarked_jobs.iter_mut())
            .chain(state.current_job.iter_mut())
            .filter(|j| j.id == job_id)
        {
            job.application_status = status;
            found = true;
        }
        found
    }

    pub fn clear_error(&self) {
        self.write_state().error = None;
    }

    /// Back to the initial state. In-flight responses are discarded.
    pub fn reset(&self) {
        self.list_epoch.invalidate();
        self.item_epoch.invalidate();
        *self.write_state() = JobState::new(self.page_size);
    }

    // ─── Reads ──────────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> JobState {
        self.read_state().clone()
    }

    pub fn is_bookmarked(&self, job_id: &str) -> bool {
        self.read_state().is_bookmarked(job_id)
    }

    pub fn error(&self) -> Option<String> {
        self.read_state().error.clone()
    }

    fn fail(
        &self,
        mut state: std::sync::RwLockWriteGuard<'_, JobState>,
        failure: ApiFailure,
    ) -> ClientError {
        log::warn!(
            "Job request failed ({}): {}",
            failure.status_code,
            failure.message
        );
        state.error = Some(failure.message.clone());
        drop(state);
        self.events.failure(StoreKind::Jobs, &failure.message);
        failure.into()
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, JobState> {
        lock::read(&self.state, "Job store")
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, JobState> {
        lock::write(&self.state, "Job store")
    }
}
