//! Builders for response payloads that need more than the stock fixtures.

#![allow(dead_code)]

use layoff_client::models::StatusCounts;
use serde_json::{json, Value};

/// Builder for a single application record.
pub struct ApplicationBuilder {
    id: String,
    job_id: String,
    status: String,
    notes: Option<String>,
}

impl ApplicationBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            job_id: format!("job-{}", id),
            status: "applied".to_string(),
            notes: None,
        }
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn job(mut self, job_id: &str) -> Self {
        self.job_id = job_id.to_string();
        self
    }

    pub fn notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    pub fn value(&self) -> Value {
        let mut value = json!({
            "id": self.id,
            "jobId": self.job_id,
            "jobTitle": "Backend Engineer",
            "company": "Acme",
            "status": self.status,
            "appliedAt": "2026-02-21T10:00:00Z",
            "lastUpdated": "2026-02-22T10:00:00Z",
        });
        if let Some(notes) = &self.notes {
            value["notes"] = json!(notes);
        }
        value
    }

    pub fn build(&self) -> String {
        self.value().to_string()
    }
}

/// Builder for a `GET /dashboard` body with chosen status counts.
#[derive(Default)]
pub struct DashboardBuilder {
    counts: StatusCounts,
}

impl DashboardBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(mut self, counts: StatusCounts) -> Self {
        self.counts = counts;
        self
    }

    pub fn build(&self) -> String {
        json!({
            "stats": {
                "statusCounts": self.counts,
                "responseRate": 0.5,
                "avgResponseTime": 3.0,
                "applicationTrends": [{"period": "2026-W09", "count": self.counts.total()}]
            },
            "recentActivity": [],
            "upcomingEvents": [],
            "jobAlerts": [],
            "quickActions": [],
            "goals": []
        })
        .to_string()
    }
}
