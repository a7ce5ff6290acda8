//! End-to-end pipeline tests over a mocked SERP provider.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use aivis_core::company::CompetitorProfile;
use aivis_core::scoring::ScoringPolicy;
use aivis_core::CompanyProfile;
use aivis_intel::{
    run_company_analysis, CancelFlag, IntelError, PipelineConfig, RunStatus,
    SearchIntelligenceService, StageTracker,
};
use aivis_serp::{ProviderConfig, ProviderId, SerpClient};

fn acme() -> CompanyProfile {
    CompanyProfile {
        name: "Acme".to_string(),
        domain: "acme.com".to_string(),
        industry: "project management".to_string(),
        aliases: vec![],
        competitors: vec![CompetitorProfile {
            name: "Rival".to_string(),
            domain: Some("rival.io".to_string()),
        }],
    }
}

fn test_client(base_url: &str) -> Arc<SerpClient> {
    let mut provider = ProviderConfig::new(ProviderId::ValueSerp, "test-key", base_url)
        .expect("valid provider config");
    provider.quota = 100_000;
    Arc::new(
        SerpClient::new(
            vec![provider],
            Duration::from_secs(3600),
            5,
            "aivis-test/0.1",
            0,
            0,
        )
        .expect("client construction should not fail"),
    )
}

fn config() -> PipelineConfig {
    PipelineConfig {
        concurrency: 5,
        run_timeout: Duration::from_secs(10),
        queries_per_category: 2,
        providers: None,
    }
}

fn dominant_brand_body() -> serde_json::Value {
    serde_json::json!({
        "organic_results": [
            {
                "position": 1,
                "link": "https://acme.com/",
                "title": "Acme",
                "snippet": "official site"
            },
            {
                "position": 2,
                "link": "https://blog.example.com/acme",
                "title": "Why teams pick Acme",
                "snippet": "a look at acme"
            }
        ]
    })
}

#[tokio::test]
async fn dominant_brand_scores_high_across_the_board() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dominant_brand_body()))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let tracker = StageTracker::default();
    let outcome = run_company_analysis(
        client,
        uuid::Uuid::new_v4(),
        &acme(),
        &ScoringPolicy::default(),
        &config(),
        &CancelFlag::default(),
        &tracker,
    )
    .await
    .expect("run should complete");

    assert_eq!(tracker.get(), RunStatus::Complete);
    assert_eq!(outcome.fetched.len(), outcome.generated_queries);
    assert!(outcome.failures.is_empty());
    // Every query mentions the brand at position 1, so authority maxes out.
    assert!(
        (outcome.scores.authority - 100.0).abs() < 1e-6,
        "authority was {}",
        outcome.scores.authority
    );
    assert!((outcome.scores.share_of_voice.pct - 100.0).abs() < 1e-6);
    assert_eq!(outcome.scores.visibility.len(), 4);
    for (platform, score) in &outcome.scores.visibility {
        assert!(*score > 0.0, "{platform} scored {score}");
    }
}

#[tokio::test]
async fn empty_result_sets_complete_with_floor_scores() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"organic_results": []})),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let tracker = StageTracker::default();
    let outcome = run_company_analysis(
        client,
        uuid::Uuid::new_v4(),
        &acme(),
        &ScoringPolicy::default(),
        &config(),
        &CancelFlag::default(),
        &tracker,
    )
    .await
    .expect("empty result sets are successes, not failures");

    assert_eq!(tracker.get(), RunStatus::Complete);
    assert_eq!(outcome.fetched.len(), outcome.generated_queries);
    assert!((outcome.scores.authority - 0.0).abs() < f64::EPSILON);
    assert!(outcome.scores.share_of_voice.floored);
    assert!((outcome.scores.share_of_voice.pct - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn failing_provider_fails_the_whole_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let tracker = StageTracker::default();
    let err = run_company_analysis(
        client,
        uuid::Uuid::new_v4(),
        &acme(),
        &ScoringPolicy::default(),
        &config(),
        &CancelFlag::default(),
        &tracker,
    )
    .await
    .expect_err("no successful query means nothing to score");

    assert!(matches!(err, IntelError::AllQueriesFailed));
    assert_eq!(tracker.get(), RunStatus::Failed);
}

#[tokio::test]
async fn pre_raised_cancel_flag_fails_the_run_without_fetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dominant_brand_body()))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let cancel = CancelFlag::default();
    cancel.cancel();
    let tracker = StageTracker::default();
    let err = run_company_analysis(
        client,
        uuid::Uuid::new_v4(),
        &acme(),
        &ScoringPolicy::default(),
        &config(),
        &cancel,
        &tracker,
    )
    .await
    .expect_err("cancelled run must not complete");

    assert!(matches!(err, IntelError::Cancelled));
    assert_eq!(tracker.get(), RunStatus::Failed);
    assert_eq!(
        server.received_requests().await.unwrap().len(),
        0,
        "cancellation before dispatch must not hit the network"
    );
}

#[tokio::test]
async fn slow_provider_times_the_run_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(dominant_brand_body())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let mut cfg = config();
    cfg.run_timeout = Duration::from_millis(50);
    let tracker = StageTracker::default();
    let err = run_company_analysis(
        client,
        uuid::Uuid::new_v4(),
        &acme(),
        &ScoringPolicy::default(),
        &cfg,
        &CancelFlag::default(),
        &tracker,
    )
    .await
    .expect_err("run must respect its timeout");

    assert!(matches!(err, IntelError::RunTimeout(_)));
    assert_eq!(tracker.get(), RunStatus::Failed);
}

#[tokio::test]
async fn service_runs_to_completion_and_reports_scores() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dominant_brand_body()))
        .mount(&server)
        .await;

    let service = SearchIntelligenceService::new(
        test_client(&server.uri()),
        ScoringPolicy::default(),
        config(),
    );
    let run_id = service.start_analysis(acme());

    let mut report = service.report(run_id).expect("run should be known");
    for _ in 0..100 {
        if report.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        report = service.report(run_id).expect("run should stay known");
    }

    assert_eq!(report.status, RunStatus::Complete);
    assert!(report.error.is_none());
    let scores = report.scores.expect("complete run must carry scores");
    assert!(scores.authority > 0.0);
    let outcome = service.outcome(run_id).expect("outcome should be stored");
    assert_eq!(outcome.company_slug, "acme");
}

#[tokio::test]
async fn service_cancel_reaches_the_running_pipeline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(dominant_brand_body())
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;

    let service = SearchIntelligenceService::new(
        test_client(&server.uri()),
        ScoringPolicy::default(),
        config(),
    );
    let run_id = service.start_analysis(acme());
    assert!(service.cancel(run_id), "live run should accept cancellation");

    let mut report = service.report(run_id).expect("run should be known");
    for _ in 0..100 {
        if report.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        report = service.report(run_id).expect("run should stay known");
    }

    assert_eq!(report.status, RunStatus::Failed);
    assert!(report
        .error
        .as_deref()
        .is_some_and(|e| e.contains("cancelled")));
    assert!(!service.cancel(run_id), "terminal run should refuse cancellation");
}

#[tokio::test]
async fn unknown_run_id_has_no_report() {
    let server = MockServer::start().await;
    let service = SearchIntelligenceService::new(
        test_client(&server.uri()),
        ScoringPolicy::default(),
        config(),
    );
    assert!(service.report(uuid::Uuid::new_v4()).is_none());
    assert!(!service.cancel(uuid::Uuid::new_v4()));
}
