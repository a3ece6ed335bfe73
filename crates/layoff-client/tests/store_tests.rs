//! Domain store behavior through a full context: list replacement, failure
//! handling, paging, bookmark parity, counter consistency and stale responses.

mod common;

use std::sync::Arc;

use common::{ApplicationBuilder, TestHarness};
use layoff_client::gateway::{endpoints, Method, TransportError, NETWORK_FAILURE_MESSAGE};
use layoff_client::models::{ApplicationStatus, JobFilters};
use layoff_client::query;
use layoff_client::testing::{application_page_json, job_json, job_page_json};
use layoff_client::ClientError;

#[tokio::test]
async fn test_failed_refetch_keeps_previous_jobs() {
    let harness = TestHarness::authenticated();
    harness.transport.respond(
        Method::Get,
        endpoints::JOBS,
        200,
        job_page_json(&[("j1", false), ("j2", false), ("j3", true)], 1, 1),
    );
    harness.transport.fail(
        Method::Get,
        endpoints::JOBS,
        TransportError::Unreachable("connection refused".to_string()),
    );
    let jobs = harness.ctx.jobs();

    jobs.search().await.unwrap();
    let err = jobs.search().await.unwrap_err();

    assert_eq!(err.user_message(), NETWORK_FAILURE_MESSAGE);
    let state = jobs.snapshot();
    assert_eq!(state.jobs.len(), 3);
    assert_eq!(state.error.as_deref(), Some(NETWORK_FAILURE_MESSAGE));
    assert!(!state.is_loading);
    assert!(query::has_error(&state));
}

#[tokio::test]
async fn test_success_clears_previous_error() {
    let harness = TestHarness::authenticated();
    harness
        .transport
        .fail(Method::Get, endpoints::JOBS, TransportError::Timeout);
    let jobs = harness.ctx.jobs();
    assert!(jobs.search().await.is_err());
    assert!(jobs.error().is_some());

    harness.transport.respond(
        Method::Get,
        endpoints::JOBS,
        200,
        job_page_json(&[("j1", false)], 1, 1),
    );
    // The scripted failure is served once more before the success.
    assert!(jobs.search().await.is_err());
    jobs.search().await.unwrap();

    assert!(jobs.error().is_none());
}

#[tokio::test]
async fn test_page_beyond_total_is_still_requested() {
    let harness = TestHarness::authenticated();
    harness.transport.respond(
        Method::Get,
        endpoints::JOBS,
        200,
        job_page_json(&[("j41", false)], 3, 3),
    );
    let jobs = harness.ctx.jobs();

    jobs.fetch_list(&JobFilters::default(), 3, 20).await.unwrap();
    assert!(!query::has_more(&jobs.snapshot()));
    assert!(query::has_previous(&jobs.snapshot()));

    jobs.fetch_list(&JobFilters::default(), 9, 20).await.unwrap();
    let sent = harness
        .transport
        .last_request(Method::Get, endpoints::JOBS)
        .unwrap();
    assert_eq!(sent.query.get("page"), Some("9"));
    assert_eq!(harness.transport.requests_to(Method::Get, endpoints::JOBS), 2);
}

#[tokio::test]
async fn test_bookmark_flag_follows_toggle_parity() {
    let harness = TestHarness::authenticated();
    harness.transport.respond(
        Method::Get,
        endpoints::JOBS,
        200,
        job_page_json(&[("j1", false), ("j2", false)], 1, 1),
    );
    harness.transport.respond(
        Method::Post,
        &endpoints::job_bookmark("j1"),
        200,
        job_json("j1", true),
    );
    harness
        .transport
        .respond(Method::Delete, &endpoints::job_bookmark("j1"), 204, "");
    let jobs = harness.ctx.jobs();
    jobs.search().await.unwrap();

    for toggles in 1..=7 {
        let flag = jobs.toggle_bookmark("j1").await.unwrap();
        let expected = toggles % 2 == 1;
        assert_eq!(flag, expected);

        let state = jobs.snapshot();
        assert_eq!(state.find("j1").unwrap().is_bookmarked, expected);
        assert_eq!(
            query::bookmarked_job_ids(&state).contains(&"j1".to_string()),
            expected
        );
        assert!(!state.find("j2").unwrap().is_bookmarked);
    }
}

#[tokio::test]
async fn test_status_counts_track_every_transition() {
    let harness = TestHarness::authenticated();
    harness.transport.respond(
        Method::Get,
        endpoints::APPLICATIONS,
        200,
        application_page_json(&[("a1", "applied"), ("a2", "under-review"), ("a3", "applied")]),
    );
    let steps = [
        ("a1", "under-review"),
        ("a1", "interview"),
        ("a2", "rejected"),
        ("a1", "accepted"),
        ("a3", "withdrawn"),
    ];
    for (id, status) in steps {
        harness.transport.respond(
            Method::Patch,
            &endpoints::application(id),
            200,
            ApplicationBuilder::new(id).status(status).build(),
        );
    }
    let applications = harness.ctx.applications();
    applications.search().await.unwrap();

    for (id, status) in steps {
        let target: ApplicationStatus =
            serde_json::from_value(serde_json::Value::String(status.to_string())).unwrap();
        applications
            .transition_status(id, target, None)
            .await
            .unwrap();

        let state = applications.snapshot();
        assert_eq!(
            state.statistics.total(),
            state.applications.len() as u64,
            "counts drifted after {} -> {}",
            id,
            status
        );
        assert_eq!(state.find(id).unwrap().status, target);
    }

    let counts = applications.statistics();
    assert_eq!(counts.accepted, 1);
    assert_eq!(counts.rejected, 1);
    assert_eq!(counts.withdrawn, 1);
    assert_eq!(counts.applied, 0);
}

#[tokio::test]
async fn test_applied_to_interview_moves_one_unit() {
    let harness = TestHarness::authenticated();
    harness.transport.respond(
        Method::Get,
        endpoints::APPLICATIONS,
        200,
        application_page_json(&[("a1", "applied"), ("a2", "applied")]),
    );
    harness.transport.respond(
        Method::Patch,
        &endpoints::application("a1"),
        200,
        ApplicationBuilder::new("a1").status("interview").build(),
    );
    let applications = harness.ctx.applications();
    applications.search().await.unwrap();
    let before = applications.statistics();

    applications
        .transition_status("a1", ApplicationStatus::Interview, None)
        .await
        .unwrap();

    let after = applications.statistics();
    assert_eq!(after.applied, before.applied - 1);
    assert_eq!(after.interview, before.interview + 1);
    assert_eq!(
        applications.snapshot().find("a1").unwrap().status,
        ApplicationStatus::Interview
    );
}

#[tokio::test]
async fn test_stale_list_response_is_dropped() {
    let harness = TestHarness::authenticated();
    let slow = harness.transport.hold(Method::Get, endpoints::JOBS);
    let fast = harness.transport.hold(Method::Get, endpoints::JOBS);
    let jobs = Arc::clone(harness.ctx.jobs());

    let first = tokio::spawn({
        let jobs = jobs.clone();
        async move { jobs.fetch_list(&JobFilters::default(), 1, 20).await }
    });
    while harness.transport.requests_to(Method::Get, endpoints::JOBS) < 1 {
        tokio::task::yield_now().await;
    }
    let second = tokio::spawn({
        let jobs = jobs.clone();
        async move { jobs.fetch_list(&JobFilters::default(), 2, 20).await }
    });
    while harness.transport.requests_to(Method::Get, endpoints::JOBS) < 2 {
        tokio::task::yield_now().await;
    }

    fast.release(200, job_page_json(&[("j21", false)], 2, 2));
    let newest = second.await.unwrap().unwrap();
    slow.release(200, job_page_json(&[("j1", false), ("j2", false)], 1, 2));
    let stale = first.await.unwrap();

    assert_eq!(newest.page, 2);
    assert!(matches!(stale, Err(ClientError::Superseded)));
    let state = jobs.snapshot();
    assert_eq!(state.pagination.page, 2);
    assert_eq!(state.jobs.len(), 1);
    assert_eq!(state.jobs[0].id, "j21");
    assert!(!state.is_loading);
}

#[tokio::test]
async fn test_load_more_advances_until_last_page() {
    let harness = TestHarness::authenticated();
    harness.transport.respond(
        Method::Get,
        endpoints::JOBS,
        200,
        job_page_json(&[("j1", false)], 1, 2),
    );
    harness.transport.respond(
        Method::Get,
        endpoints::JOBS,
        200,
        job_page_json(&[("j2", false)], 2, 2),
    );
    let jobs = harness.ctx.jobs();
    jobs.search().await.unwrap();

    let page = jobs.load_more().await.unwrap();
    assert_eq!(page.page, 2);
    assert!(!page.has_more());

    jobs.load_more().await.unwrap();
    assert_eq!(harness.transport.requests_to(Method::Get, endpoints::JOBS), 2);
    assert_eq!(jobs.snapshot().jobs[0].id, "j2");
}

#[tokio::test]
async fn test_cleared_search_text_is_not_sent() {
    let harness = TestHarness::authenticated();
    harness.transport.respond(
        Method::Get,
        endpoints::JOBS,
        200,
        job_page_json(&[("j1", false)], 1, 1),
    );
    let jobs = harness.ctx.jobs();
    jobs.set_filters(JobFilters {
        search: Some("rust".to_string()),
        ..Default::default()
    });
    jobs.search().await.unwrap();
    let sent = harness.transport.last_request(Method::Get, endpoints::JOBS).unwrap();
    assert_eq!(sent.query.get("search"), Some("rust"));

    jobs.set_filters(JobFilters {
        search: Some(String::new()),
        ..Default::default()
    });
    jobs.search().await.unwrap();

    let sent = harness.transport.last_request(Method::Get, endpoints::JOBS).unwrap();
    assert!(!sent.query.contains("search"));
    assert_eq!(sent.query.get("page"), Some("1"));
    assert!(!query::has_active_filters(&jobs.snapshot()));
}
