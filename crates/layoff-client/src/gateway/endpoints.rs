//! Route table, relative to the configured base URL.

pub const AUTH_LOGIN: &str = "/auth/login";
pub const AUTH_REGISTER: &str = "/auth/register";
pub const AUTH_LOGOUT: &str = "/auth/logout";
pub const AUTH_REFRESH: &str = "/auth/refresh";
pub const AUTH_ME: &str = "/auth/me";

pub const JOBS: &str = "/jobs";
pub const JOB_BOOKMARKS: &str = "/jobs/bookmarks";

pub const APPLICATIONS: &str = "/applications";

pub const DASHBOARD: &str = "/dashboard";
pub const JOB_ALERTS: &str = "/job-alerts";
pub const GOALS: &str = "/goals";

pub fn job(id: &str) -> String {
    format!("{}/{}", JOBS, id)
}

pub fn job_bookmark(id: &str) -> String {
    format!("{}/{}/bookmark", JOBS, id)
}

pub fn application(id: &str) -> String {
    format!("{}/{}", APPLICATIONS, id)
}

pub fn application_interview(id: &str) -> String {
    format!("{}/{}/interview", APPLICATIONS, id)
}

pub fn application_withdraw(id: &str) -> String {
    format!("{}/{}/withdraw", APPLICATIONS, id)
}

pub fn job_alert(id: &str) -> String {
    format!("{}/{}", JOB_ALERTS, id)
}

pub fn goal(id: &str) -> String {
    format!("{}/{}", GOALS, id)
}
