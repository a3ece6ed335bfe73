//! Cross-store rules: application changes flowing into the dashboard and the
//! job cards, and nothing flowing back.

mod common;

use common::{ApplicationBuilder, DashboardBuilder, TestHarness};
use layoff_client::gateway::{endpoints, Method};
use layoff_client::models::{
    ApplicationStatus, DashboardPeriod, JobApplicationStatus, NewApplication, StatusCounts,
};
use layoff_client::testing::{application_page_json, job_page_json};
use layoff_client::StoreEvent;

fn load_everything(harness: &TestHarness, counts: StatusCounts) {
    harness.transport.respond(
        Method::Get,
        endpoints::DASHBOARD,
        200,
        DashboardBuilder::new().counts(counts).build(),
    );
    harness.transport.respond(
        Method::Get,
        endpoints::JOBS,
        200,
        job_page_json(&[("job-a1", false), ("job-a2", false)], 1, 1),
    );
    harness.transport.respond(
        Method::Get,
        endpoints::APPLICATIONS,
        200,
        application_page_json(&[("a1", "applied")]),
    );
}

#[tokio::test]
async fn test_transition_adjusts_loaded_dashboard_once() {
    let harness = TestHarness::authenticated();
    load_everything(
        &harness,
        StatusCounts {
            applied: 4,
            interview: 1,
            ..Default::default()
        },
    );
    harness.transport.respond(
        Method::Patch,
        &endpoints::application("a1"),
        200,
        ApplicationBuilder::new("a1").status("interview").build(),
    );
    let ctx = &harness.ctx;
    ctx.dashboard().fetch(DashboardPeriod::Month).await.unwrap();
    ctx.jobs().search().await.unwrap();
    ctx.applications().search().await.unwrap();
    let mut events = ctx.events().subscribe();

    ctx.applications()
        .transition_status("a1", ApplicationStatus::Interview, None)
        .await
        .unwrap();

    let counts = ctx.dashboard().snapshot().data.unwrap().stats.status_counts;
    assert_eq!(counts.applied, 3);
    assert_eq!(counts.interview, 2);
    assert_eq!(
        ctx.jobs().snapshot().find("job-a1").unwrap().application_status,
        JobApplicationStatus::Interview
    );

    let mut adjustments = 0;
    let mut transitions = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            StoreEvent::DashboardCountsAdjusted { .. } => adjustments += 1,
            StoreEvent::ApplicationStatusChanged { .. } => transitions += 1,
            _ => {}
        }
    }
    assert_eq!((adjustments, transitions), (1, 1));
}

#[tokio::test]
async fn test_transition_before_dashboard_load_is_dropped() {
    let harness = TestHarness::authenticated();
    load_everything(
        &harness,
        StatusCounts {
            applied: 1,
            ..Default::default()
        },
    );
    harness.transport.respond(
        Method::Patch,
        &endpoints::application("a1"),
        200,
        ApplicationBuilder::new("a1").status("rejected").build(),
    );
    let ctx = &harness.ctx;
    ctx.applications().search().await.unwrap();

    ctx.applications()
        .transition_status("a1", ApplicationStatus::Rejected, None)
        .await
        .unwrap();
    assert!(!ctx.dashboard().is_loaded());

    // The first load carries the server's counts; nothing is replayed on top.
    ctx.dashboard().fetch(DashboardPeriod::Month).await.unwrap();
    let counts = ctx.dashboard().snapshot().data.unwrap().stats.status_counts;
    assert_eq!(counts.applied, 1);
    assert_eq!(counts.rejected, 0);
}

#[tokio::test]
async fn test_submit_and_delete_feed_dashboard_and_job_card() {
    let harness = TestHarness::authenticated();
    load_everything(&harness, StatusCounts::default());
    harness.transport.respond(
        Method::Post,
        endpoints::APPLICATIONS,
        201,
        ApplicationBuilder::new("a2").build(),
    );
    harness
        .transport
        .respond(Method::Delete, &endpoints::application("a2"), 204, "");
    let ctx = &harness.ctx;
    ctx.dashboard().fetch(DashboardPeriod::Week).await.unwrap();
    ctx.jobs().search().await.unwrap();
    ctx.applications().search().await.unwrap();

    ctx.applications()
        .submit(NewApplication {
            job_id: "job-a2".to_string(),
            resume_id: "r1".to_string(),
            cover_letter: None,
            notes: Some("Referred by Sam".to_string()),
        })
        .await
        .unwrap();

    let counts = ctx.dashboard().snapshot().data.unwrap().stats.status_counts;
    assert_eq!(counts.applied, 1);
    assert_eq!(
        ctx.jobs().snapshot().find("job-a2").unwrap().application_status,
        JobApplicationStatus::Applied
    );

    ctx.applications().delete("a2").await.unwrap();

    let counts = ctx.dashboard().snapshot().data.unwrap().stats.status_counts;
    assert_eq!(counts.total(), 0);
    assert_eq!(
        ctx.jobs().snapshot().find("job-a2").unwrap().application_status,
        JobApplicationStatus::NotApplied
    );
}

#[tokio::test]
async fn test_failed_transition_touches_no_other_store() {
    let harness = TestHarness::authenticated();
    load_everything(
        &harness,
        StatusCounts {
            applied: 1,
            ..Default::default()
        },
    );
    harness.transport.respond(
        Method::Patch,
        &endpoints::application("a1"),
        422,
        r#"{"message":"Invalid status transition"}"#,
    );
    let ctx = &harness.ctx;
    ctx.dashboard().fetch(DashboardPeriod::Month).await.unwrap();
    ctx.jobs().search().await.unwrap();
    ctx.applications().search().await.unwrap();
    let dashboard_before = ctx.dashboard().snapshot().data;
    let jobs_before = ctx.jobs().snapshot().jobs;

    let err = ctx
        .applications()
        .transition_status("a1", ApplicationStatus::Accepted, None)
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "Invalid status transition");
    assert_eq!(ctx.dashboard().snapshot().data, dashboard_before);
    assert_eq!(ctx.jobs().snapshot().jobs, jobs_before);
    assert!(ctx.dashboard().error().is_none());
}
