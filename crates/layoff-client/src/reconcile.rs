//! Cross-store reconciliation.
//!
//! Two kinds of rule live here. Bookmark rules run inside the job store's
//! critical section and keep `bookmarked_jobs` in step with the
//! `is_bookmarked` flags. Application rules react to committed
//! [`ApplicationChange`]s and patch the dashboard counters and the job cards.
//!
//! Rules only make local edits. None of them issues requests or emits
//! application changes, so a rule can never trigger another one.

use std::sync::Arc;

use crate::models::{Job, JobApplicationStatus};
use crate::stores::{
    ApplicationChange, ApplicationChangeListener, DashboardStore, JobState, JobStore,
};

// ─── Bookmark rules ─────────────────────────────────────────────────────────

/// Applies a confirmed bookmark flip to every copy of the job.
///
/// `confirmed` is the server's copy of the job, when it returned one. It is
/// used for the bookmarked subset if the job is not on the current page.
pub(crate) fn apply_bookmark(
    state: &mut JobState,
    job_id: &str,
    bookmarked: bool,
    confirmed: Option<Job>,
) {
    for job in state
        .jobs
        .iter_mut()
        .chain(state.current_job.iter_mut())
        .filter(|j| j.id == job_id)
    {
        job.is_bookmarked = bookmarked;
    }

    state.bookmarked_jobs.retain(|j| j.id != job_id);
    if !bookmarked {
        return;
    }

    let entry = state
        .jobs
        .iter()
        .find(|j| j.id == job_id)
        .cloned()
        .or(confirmed)
        .or_else(|| state.current_job.clone().filter(|j| j.id == job_id));
    match entry {
        Some(mut job) => {
            job.is_bookmarked = true;
            state.bookmarked_jobs.push(job);
        }
        None => log::warn!("Bookmarked job {} is not held locally", job_id),
    }
}

/// Folds the flags of a freshly loaded page into the bookmarked subset.
pub(crate) fn sync_bookmarks_from_page(state: &mut JobState) {
    let JobState {
        jobs,
        bookmarked_jobs,
        ..
    } = state;

    bookmarked_jobs.retain(|b| {
        jobs.iter()
            .find(|j| j.id == b.id)
            .map_or(true, |j| j.is_bookmarked)
    });
    for job in jobs.iter().filter(|j| j.is_bookmarked) {
        match bookmarked_jobs.iter_mut().find(|b| b.id == job.id) {
            Some(slot) => *slot = job.clone(),
            None => bookmarked_jobs.push(job.clone()),
        }
    }
}

/// Replaces the bookmarked subset with the server's and re-flags local copies.
pub(crate) fn replace_bookmarks(state: &mut JobState, mut bookmarks: Vec<Job>) {
    for job in bookmarks.iter_mut() {
        job.is_bookmarked = true;
    }
    for job in state
        .jobs
        .iter_mut()
        .chain(state.current_job.iter_mut())
    {
        job.is_bookmarked = bookmarks.iter().any(|b| b.id == job.id);
    }
    state.bookmarked_jobs = bookmarks;
}

// ─── Application rules ──────────────────────────────────────────────────────

/// Listener wired onto the application store by the app context.
pub struct ReconciliationRules {
    dashboard: Arc<DashboardStore>,
    jobs: Arc<JobStore>,
}

impl ReconciliationRules {
    pub fn new(dashboard: Arc<DashboardStore>, jobs: Arc<JobStore>) -> Self {
        Self { dashboard, jobs }
    }

    fn patch_job(&self, job_id: &str, status: JobApplicationStatus) {
        if !self.jobs.update_job_status(job_id, status) {
            log::debug!("Job {} not held locally; card status left as is", job_id);
        }
    }
}

impl ApplicationChangeListener for ReconciliationRules {
    fn on_application_change(&self, change: &ApplicationChange) {
        match change {
            ApplicationChange::Added { job_id, status, .. } => {
                self.dashboard.apply_application_added(*status);
                self.patch_job(job_id, (*status).into());
            }
            ApplicationChange::StatusChanged {
                job_id, from, to, ..
            } => {
                self.dashboard.apply_status_transition(*from, *to);
                self.patch_job(job_id, (*to).into());
            }
            ApplicationChange::Removed { job_id, status, .. } => {
                self.dashboard.apply_application_removed(*status);
                self.patch_job(job_id, JobApplicationStatus::NotApplied);
            }
        }
    }
}
