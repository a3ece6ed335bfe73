use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::filters::{non_blank, overlay, overlay_text, FilterSet};
use super::pagination::Pagination;
use crate::gateway::QueryParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Internship,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::FullTime => "full-time",
            JobType::PartTime => "part-time",
            JobType::Contract => "contract",
            JobType::Internship => "internship",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Entry,
    Mid,
    Senior,
}

impl ExperienceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Entry => "entry",
            ExperienceLevel::Mid => "mid",
            ExperienceLevel::Senior => "senior",
        }
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the current user stands with a job, as shown on job cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum JobApplicationStatus {
    #[default]
    NotApplied,
    Applied,
    Interview,
    Rejected,
    Accepted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Salary {
    pub min: f64,
    pub max: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<Salary>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefits: Option<Vec<String>>,
    #[serde(default)]
    pub remote: bool,
    pub experience_level: ExperienceLevel,
    pub posted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_deadline: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_logo: Option<String>,
    #[serde(default)]
    pub is_bookmarked: bool,
    #[serde(default)]
    pub application_status: JobApplicationStatus,
}

/// Job search predicate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobFilters {
    pub search: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<JobType>,
    pub experience_level: Option<ExperienceLevel>,
    pub remote: Option<bool>,
    pub salary_min: Option<u64>,
    pub salary_max: Option<u64>,
}

impl FilterSet for JobFilters {
    fn merge(&mut self, patch: Self) {
        overlay_text(&mut self.search, patch.search);
        overlay_text(&mut self.location, patch.location);
        overlay(&mut self.job_type, patch.job_type);
        overlay(&mut self.experience_level, patch.experience_level);
        overlay(&mut self.remote, patch.remote);
        overlay(&mut self.salary_min, patch.salary_min);
        overlay(&mut self.salary_max, patch.salary_max);
    }

    fn active_count(&self) -> usize {
        [
            non_blank(self.search.as_deref()).is_some(),
            non_blank(self.location.as_deref()).is_some(),
            self.job_type.is_some(),
            self.experience_level.is_some(),
            self.remote.is_some(),
            self.salary_min.is_some(),
            self.salary_max.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    fn append_query(&self, query: &mut QueryParams) {
        query
            .push_opt("search", non_blank(self.search.as_deref()))
            .push_opt("location", non_blank(self.location.as_deref()))
            .push_opt("type", self.job_type)
            .push_opt("experienceLevel", self.experience_level)
            .push_opt("remote", self.remote)
            .push_opt("salaryMin", self.salary_min)
            .push_opt("salaryMax", self.salary_max);
    }
}

/// `GET /jobs` body: one page of jobs plus paging metadata at the top level.
#[derive(Debug, Clone, Deserialize)]
pub struct JobListResponse {
    pub jobs: Vec<Job>,
    #[serde(flatten)]
    pub pagination: Pagination,
}
