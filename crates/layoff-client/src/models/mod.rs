//! Wire and state types shared by the domain stores.

mod application;
mod dashboard;
mod filters;
mod job;
mod pagination;

pub use application::{
    Application, ApplicationFilters, ApplicationListResponse, ApplicationStatus, InterviewSchedule,
    InterviewType, NewApplication, ResumeRef, SalaryOffer, StatusCounts,
};
pub use dashboard::{
    ActivityType, AlertSalary, DashboardData, DashboardPeriod, DashboardStats, EventType, Goal,
    GoalPeriod, GoalType, GoalUpdate, JobAlert, JobAlertUpdate, NewGoal, NewJobAlert, Priority,
    QuickAction, RecentActivity, TrendPoint, UpcomingEvent,
};
pub use filters::FilterSet;
pub use job::{
    ExperienceLevel, Job, JobApplicationStatus, JobFilters, JobListResponse, JobType, Salary,
};
pub use pagination::Pagination;
