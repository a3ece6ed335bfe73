//! Read-only derivations over store snapshots.
//!
//! Everything here is recomputed from the state it is handed. Nothing is
//! cached and nothing touches the network.

use crate::models::{FilterSet, Pagination};
use crate::stores::{ApplicationState, DashboardState, JobState};

/// A paged, filterable collection held by a store.
pub trait CollectionView {
    type Filters: FilterSet;

    fn item_count(&self) -> usize;
    fn is_loading(&self) -> bool;
    fn pagination(&self) -> &Pagination;
    fn filters(&self) -> &Self::Filters;
    fn error(&self) -> Option<&str>;
}

impl CollectionView for JobState {
    type Filters = crate::models::JobFilters;

    fn item_count(&self) -> usize {
        self.jobs.len()
    }

    fn is_loading(&self) -> bool {
        self.is_loading
    }

    fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    fn filters(&self) -> &Self::Filters {
        &self.filters
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl CollectionView for ApplicationState {
    type Filters = crate::models::ApplicationFilters;

    fn item_count(&self) -> usize {
        self.applications.len()
    }

    fn is_loading(&self) -> bool {
        self.is_loading
    }

    fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    fn filters(&self) -> &Self::Filters {
        &self.filters
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// No items and nothing in flight that could bring some.
pub fn is_empty<V: CollectionView>(view: &V) -> bool {
    view.item_count() == 0 && !view.is_loading()
}

pub fn has_more<V: CollectionView>(view: &V) -> bool {
    view.pagination().has_more()
}

pub fn has_previous<V: CollectionView>(view: &V) -> bool {
    view.pagination().has_previous()
}

pub fn has_active_filters<V: CollectionView>(view: &V) -> bool {
    !view.filters().is_empty()
}

pub fn has_error<V: CollectionView>(view: &V) -> bool {
    view.error().is_some()
}

pub fn bookmarked_job_ids(state: &JobState) -> Vec<String> {
    state.bookmarked_jobs.iter().map(|j| j.id.clone()).collect()
}

/// True when the dashboard has data and nothing is loading.
pub fn dashboard_ready(state: &DashboardState) -> bool {
    state.data.is_some() && !state.is_loading
}
