use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::filters::{non_blank, overlay, overlay_text, FilterSet};
use super::job::JobApplicationStatus;
use super::pagination::Pagination;
use crate::gateway::QueryParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplicationStatus {
    Applied,
    UnderReview,
    Interview,
    Rejected,
    Accepted,
    Withdrawn,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 6] = [
        ApplicationStatus::Applied,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Interview,
        ApplicationStatus::Rejected,
        ApplicationStatus::Accepted,
        ApplicationStatus::Withdrawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::UnderReview => "under-review",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    /// Still in play: neither decided nor withdrawn.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Applied
                | ApplicationStatus::UnderReview
                | ApplicationStatus::Interview
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ApplicationStatus> for JobApplicationStatus {
    fn from(status: ApplicationStatus) -> Self {
        match status {
            ApplicationStatus::Applied | ApplicationStatus::UnderReview => {
                JobApplicationStatus::Applied
            }
            ApplicationStatus::Interview => JobApplicationStatus::Interview,
            ApplicationStatus::Rejected => JobApplicationStatus::Rejected,
            ApplicationStatus::Accepted => JobApplicationStatus::Accepted,
            ApplicationStatus::Withdrawn => JobApplicationStatus::NotApplied,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterviewType {
    Phone,
    Video,
    InPerson,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewSchedule {
    pub date: NaiveDate,
    pub time: String,
    #[serde(rename = "type")]
    pub interview_type: InterviewType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interviewer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeRef {
    pub id: String,
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryOffer {
    pub offered: f64,
    pub negotiated: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub job_id: String,
    pub job_title: String,
    pub company: String,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<ResumeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview_schedule: Option<InterviewSchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<SalaryOffer>,
}

/// `POST /applications` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApplication {
    pub job_id: String,
    pub resume_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Count of applications per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    #[serde(default)]
    pub applied: u64,
    #[serde(default)]
    pub under_review: u64,
    #[serde(default)]
    pub interview: u64,
    #[serde(default)]
    pub rejected: u64,
    #[serde(default)]
    pub accepted: u64,
    #[serde(default)]
    pub withdrawn: u64,
}

impl StatusCounts {
    pub fn from_statuses<I: IntoIterator<Item = ApplicationStatus>>(statuses: I) -> Self {
        let mut counts = Self::default();
        for status in statuses {
            counts.increment(status);
        }
        counts
    }

    pub fn get(&self, status: ApplicationStatus) -> u64 {
        match status {
            ApplicationStatus::Applied => self.applied,
            ApplicationStatus::UnderReview => self.under_review,
            ApplicationStatus::Interview => self.interview,
            ApplicationStatus::Rejected => self.rejected,
            ApplicationStatus::Accepted => self.accepted,
            ApplicationStatus::Withdrawn => self.withdrawn,
        }
    }

    fn bucket(&mut self, status: ApplicationStatus) -> &mut u64 {
        match status {
            ApplicationStatus::Applied => &mut self.applied,
            ApplicationStatus::UnderReview => &mut self.under_review,
            ApplicationStatus::Interview => &mut self.interview,
            ApplicationStatus::Rejected => &mut self.rejected,
            ApplicationStatus::Accepted => &mut self.accepted,
            ApplicationStatus::Withdrawn => &mut self.withdrawn,
        }
    }

    pub fn increment(&mut self, status: ApplicationStatus) {
        *self.bucket(status) += 1;
    }

    /// Saturates at zero; an underflow means the counts had already drifted
    /// from the records and is logged.
    pub fn decrement(&mut self, status: ApplicationStatus) {
        let bucket = self.bucket(status);
        if *bucket == 0 {
            log::warn!("Status count for '{}' would go negative; clamped", status);
        } else {
            *bucket -= 1;
        }
    }

    /// Moves one application from `from` to `to`.
    pub fn transition(&mut self, from: ApplicationStatus, to: ApplicationStatus) {
        if from != to {
            self.decrement(from);
            self.increment(to);
        }
    }

    pub fn total(&self) -> u64 {
        ApplicationStatus::ALL.iter().map(|s| self.get(*s)).sum()
    }

    pub fn active(&self) -> u64 {
        self.applied + self.under_review + self.interview
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationFilters {
    pub status: Option<ApplicationStatus>,
    pub company: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl FilterSet for ApplicationFilters {
    fn merge(&mut self, patch: Self) {
        overlay(&mut self.status, patch.status);
        overlay_text(&mut self.company, patch.company);
        overlay(&mut self.start_date, patch.start_date);
        overlay(&mut self.end_date, patch.end_date);
    }

    fn active_count(&self) -> usize {
        [
            self.status.is_some(),
            non_blank(self.company.as_deref()).is_some(),
            self.start_date.is_some(),
            self.end_date.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    fn append_query(&self, query: &mut QueryParams) {
        query
            .push_opt("status", self.status)
            .push_opt("company", non_blank(self.company.as_deref()))
            .push_opt("startDate", self.start_date)
            .push_opt("endDate", self.end_date);
    }
}

/// `GET /applications` body. Statistics and paging are optional on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationListResponse {
    pub applications: Vec<Application>,
    #[serde(default)]
    pub statistics: Option<StatusCounts>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_moves_one_unit() {
        let mut counts = StatusCounts {
            applied: 2,
            interview: 1,
            ..Default::default()
        };
        counts.transition(ApplicationStatus::Applied, ApplicationStatus::Interview);

        assert_eq!(counts.applied, 1);
        assert_eq!(counts.interview, 2);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_decrement_saturates() {
        let mut counts = StatusCounts::default();
        counts.decrement(ApplicationStatus::Rejected);
        assert_eq!(counts.rejected, 0);
    }

    #[test]
    fn test_status_maps_onto_job_card() {
        assert_eq!(
            JobApplicationStatus::from(ApplicationStatus::UnderReview),
            JobApplicationStatus::Applied
        );
        assert_eq!(
            JobApplicationStatus::from(ApplicationStatus::Withdrawn),
            JobApplicationStatus::NotApplied
        );
    }

    #[test]
    fn test_statistics_wire_format() {
        let counts: StatusCounts =
            serde_json::from_str(r#"{"total":3,"applied":1,"underReview":2}"#).unwrap();
        assert_eq!(counts.under_review, 2);
        assert_eq!(counts.total(), 3);
        assert_eq!(
            StatusCounts::from_statuses([ApplicationStatus::Applied, ApplicationStatus::Applied])
                .applied,
            2
        );
    }

    #[test]
    fn test_filter_query_keys() {
        let query = ApplicationFilters {
            status: Some(ApplicationStatus::UnderReview),
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            ..Default::default()
        }
        .to_query();

        assert_eq!(query.get("status"), Some("under-review"));
        assert_eq!(query.get("startDate"), Some("2026-03-01"));
        assert!(!query.contains("company"));
    }
}
