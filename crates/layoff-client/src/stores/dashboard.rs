use std::sync::{Arc, RwLock, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::broadcast::{StoreEvent, StoreEventBroadcaster, StoreKind};
use crate::epoch::RequestEpoch;
use crate::error::{ClientError, Result};
use crate::gateway::{endpoints, ApiFailure, HttpGateway, QueryParams};
use crate::lock;
use crate::models::{
    ApplicationStatus, DashboardData, DashboardPeriod, Goal, GoalUpdate, JobAlert,
    JobAlertUpdate, NewGoal, NewJobAlert,
};
use crate::SharedClock;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub data: Option<DashboardData>,
    pub selected_period: DashboardPeriod,
    pub is_loading: bool,
    pub is_refreshing: bool,
    pub is_saving: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl DashboardState {
    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }
}

pub struct DashboardStore {
    state: RwLock<DashboardState>,
    gateway: Arc<HttpGateway>,
    events: StoreEventBroadcaster,
    clock: SharedClock,
    epoch: RequestEpoch,
}

impl DashboardStore {
    pub fn new(
        gateway: Arc<HttpGateway>,
        events: StoreEventBroadcaster,
        clock: SharedClock,
    ) -> Self {
        Self {
            state: RwLock::new(DashboardState::default()),
            gateway,
            events,
            clock,
            epoch: RequestEpoch::new(),
        }
    }

    // ─── Loading ────────────────────────────────────────────────────────────

    /// Loads the dashboard for `period`, which becomes the selected period.
    pub async fn fetch(&self, period: DashboardPeriod) -> Result<()> {
        self.load(period, false).await
    }

    /// Reloads the selected period, asking the server to recompute.
    pub async fn refresh(&self) -> Result<()> {
        let period = self.read_state().selected_period;
        self.load(period, true).await
    }

    async fn load(&self, period: DashboardPeriod, refresh: bool) -> Result<()> {
        let epoch = self.epoch.begin();
        {
            let mut state = self.write_state();
            if refresh {
                state.is_refreshing = true;
            } else {
                state.is_loading = true;
            }
        }

        let mut query = QueryParams::new();
        query.push("period", period);
        if refresh {
            query.push("refresh", true);
        }
        let outcome = self
            .gateway
            .get::<DashboardData>(endpoints::DASHBOARD, query)
            .await;

        if !self.epoch.is_current(epoch) {
            log::debug!("Dropping superseded dashboard response ({})", period);
            return Err(ClientError::Superseded);
        }

        let mut state = self.write_state();
        state.is_loading = false;
        state.is_refreshing = false;
        match outcome {
            Ok(data) => {
                let now = self.clock.utc();
                state.data = Some(data);
                state.selected_period = period;
                state.last_updated = Some(now);
                state.error = None;
                drop(state);

                log::debug!("Dashboard loaded for period {}", period);
                self.events.send(StoreEvent::DashboardLoaded {
                    period,
                    loaded_at: now,
                });
                Ok(())
            }
            Err(failure) => Err(self.fail(state, failure)),
        }
    }

    pub fn set_period(&self, period: DashboardPeriod) {
        self.write_state().selected_period = period;
    }

    // ─── Status counters ────────────────────────────────────────────────────

    /// Moves one application between status buckets. Returns `false`, and
    /// changes nothing, when no dashboard has been loaded yet.
    pub fn apply_status_transition(&self, from: ApplicationStatus, to: ApplicationStatus) -> bool {
        self.adjust_counts(Some(from), Some(to))
    }

    pub fn apply_application_added(&self, status: ApplicationStatus) -> bool {
        self.adjust_counts(None, Some(status))
    }

    pub fn apply_application_removed(&self, status: ApplicationStatus) -> bool {
        self.adjust_counts(Some(status), None)
    }

    fn adjust_counts(
        &self,
        from: Option<ApplicationStatus>,
        to: Option<ApplicationStatus>,
    ) -> bool {
        {
            let mut state = self.write_state();
            let Some(data) = state.data.as_mut() else {
                log::debug!(
                    "Dashboard not loaded; dropping count adjustment {:?} -> {:?}",
                    from,
                    to
                );
                return false;
            };
            let counts = &mut data.stats.status_counts;
            match (from, to) {
                (Some(from), Some(to)) => counts.transition(from, to),
                (Some(from), None) => counts.decrement(from),
                (None, Some(to)) => counts.increment(to),
                (None, None) => return false,
            }
        }
        self.events
            .send(StoreEvent::DashboardCountsAdjusted { from, to });
        true
    }

    // ─── Local edits ────────────────────────────────────────────────────────

    pub fn mark_event_completed(&self, event_id: &str) -> bool {
        self.edit_data(|data| {
            let before = data.upcoming_events.len();
            data.upcoming_events.retain(|e| e.id != event_id);
            data.upcoming_events.len() < before
        })
    }

    pub fn dismiss_activity(&self, activity_id: &str) -> bool {
        self.edit_data(|data| {
            let before = data.recent_activity.len();
            data.recent_activity.retain(|a| a.id != activity_id);
            data.recent_activity.len() < before
        })
    }

    pub fn update_goal_progress(&self, goal_id: &str, progress: u32) -> bool {
        self.edit_data(|data| match data.goals.iter_mut().find(|g| g.id == goal_id) {
            Some(goal) => {
                goal.current = progress;
                true
            }
            None => false,
        })
    }

    pub fn clear_new_jobs_count(&self, alert_id: &str) -> bool {
        self.edit_data(
            |data| match data.job_alerts.iter_mut().find(|a| a.id == alert_id) {
                Some(alert) => {
                    alert.new_jobs_count = 0;
                    true
                }
                None => false,
            },
        )
    }

    fn edit_data(&self, edit: impl FnOnce(&mut DashboardData) -> bool) -> bool {
        self.write_state().data.as_mut().map(edit).unwrap_or(false)
    }

    // ─── Alerts and goals ───────────────────────────────────────────────────

    pub async fn create_job_alert(&self, alert: NewJobAlert) -> Result<JobAlert> {
        let created: JobAlert = self
            .save(self.gateway.post(endpoints::JOB_ALERTS, &alert))
            .await?;
        self.edit_data(|data| {
            data.job_alerts.push(created.clone());
            true
        });
        Ok(created)
    }

    pub async fn update_job_alert(
        &self,
        alert_id: &str,
        update: JobAlertUpdate,
    ) -> Result<JobAlert> {
        let updated: JobAlert = self
            .save(self.gateway.patch(endpoints::job_alert(alert_id), &update))
            .await?;
        self.edit_data(|data| {
            replace_by_id(&mut data.job_alerts, updated.clone(), |a| a.id.as_str())
        });
        Ok(updated)
    }

    pub async fn delete_job_alert(&self, alert_id: &str) -> Result<()> {
        self.save(self.gateway.delete(endpoints::job_alert(alert_id)))
            .await?;
        self.edit_data(|data| {
            data.job_alerts.retain(|a| a.id != alert_id);
            true
        });
        Ok(())
    }

    pub async fn create_goal(&self, goal: NewGoal) -> Result<Goal> {
        let created: Goal = self.save(self.gateway.post(endpoints::GOALS, &goal)).await?;
        self.edit_data(|data| {
            data.goals.push(created.clone());
            true
        });
        Ok(created)
    }

    pub async fn update_goal(&self, goal_id: &str, update: GoalUpdate) -> Result<Goal> {
        let updated: Goal = self
            .save(self.gateway.patch(endpoints::goal(goal_id), &update))
            .await?;
        self.edit_data(|data| {
            replace_by_id(&mut data.goals, updated.clone(), |g| g.id.as_str())
        });
        Ok(updated)
    }

    /// Runs a server-confirmed save, tracking `is_saving` and the error field.
    async fn save<T>(
        &self,
        request: impl std::future::Future<Output = std::result::Result<T, ApiFailure>>,
    ) -> Result<T> {
        self.write_state().is_saving = true;
        let outcome = request.await;

        let mut state = self.write_state();
        state.is_saving = false;
        match outcome {
            Ok(value) => {
                state.error = None;
                Ok(value)
            }
            Err(failure) => Err(self.fail(state, failure)),
        }
    }

    // ─── Misc ───────────────────────────────────────────────────────────────

    pub fn clear_error(&self) {
        self.write_state().error = None;
    }

    pub fn reset(&self) {
        self.epoch.invalidate();
        *self.write_state() = DashboardState::default();
    }

    pub fn snapshot(&self) -> DashboardState {
        self.read_state().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.read_state().is_loaded()
    }

    pub fn error(&self) -> Option<String> {
        self.read_state().error.clone()
    }

    fn fail(
        &self,
        mut state: RwLockWriteGuard<'_, DashboardState>,
        failure: ApiFailure,
    ) -> ClientError {
        log::warn!(
            "Dashboard request failed ({}): {}",
            failure.status_code,
            failure.message
        );
        state.error = Some(failure.message.clone());
        drop(state);
        self.events.failure(StoreKind::Dashboard, &failure.message);
        failure.into()
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, DashboardState> {
        lock::read(&self.state, "Dashboard store")
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, DashboardState> {
        lock::write(&self.state, "Dashboard store")
    }
}

fn replace_by_id<T>(items: &mut [T], updated: T, id: impl Fn(&T) -> &str) -> bool {
    match items.iter().position(|item| id(item) == id(&updated)) {
        Some(index) => {
            items[index] = updated;
            true
        }
        None => false,
    }
}
