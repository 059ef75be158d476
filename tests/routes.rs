use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use serial_test::serial;
use tower::ServiceExt;

use loan_service::observability::metrics::Metrics;
use loan_service::{assemble, create_app, App, Config};

// =============================================================================
// Test Helpers
// =============================================================================

fn test_app() -> App {
    test_app_with(Config::default())
}

fn test_app_with(config: Config) -> App {
    let metrics = Arc::new(Metrics::new("loan_service").expect("metrics registry"));
    assemble(config, metrics).expect("assemble app")
}

async fn get(router: &Router, uri: &str) -> Response {
    router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_json(router: &Router, uri: &str, body: &Value) -> Response {
    router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_string(response).await).expect("Failed to parse JSON")
}

fn sample_value(body: &str, name: &str) -> Option<f64> {
    body.lines().find_map(|line| {
        let (series, value) = line.rsplit_once(' ')?;
        if series == name {
            value.parse().ok()
        } else {
            None
        }
    })
}

fn family_names(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|l| l.strip_prefix("# TYPE "))
        .map(str::to_string)
        .collect()
}

fn sample_loan() -> Value {
    json!({
        "applicant": "Ada Lovelace",
        "email": "ada@example.com",
        "principal_cents": 1_500_000,
        "term_months": 36
    })
}

// =============================================================================
// Assembly
// =============================================================================

#[test]
fn four_groups_with_expected_prefixes() {
    let app = test_app();
    let groups: Vec<_> = app
        .mounted_groups()
        .iter()
        .map(|m| (m.name, m.prefix.clone()))
        .collect();
    assert_eq!(
        groups,
        vec![
            ("metrics", String::new()),
            ("health", String::new()),
            ("loans", "/api".to_string()),
            ("stats", "/api".to_string()),
        ]
    );
}

#[test]
#[serial]
fn create_app_reads_environment() {
    for var in ["APP_NAME", "APP_BIND", "API_PREFIX", "METRICS_NAMESPACE", "LOG_LEVEL"] {
        std::env::remove_var(var);
    }
    std::env::set_var("API_PREFIX", "/internal");
    let app = create_app().expect("create app");
    assert_eq!(app.mounted_groups()[2].prefix, "/internal");
    std::env::remove_var("API_PREFIX");
}

#[test]
#[serial]
fn create_app_surfaces_config_errors() {
    std::env::set_var("API_PREFIX", "no-slash");
    assert!(create_app().is_err());
    std::env::remove_var("API_PREFIX");
}

#[tokio::test]
async fn custom_api_prefix_moves_loans_and_stats() {
    let config = Config {
        api_prefix: "/v2".to_string(),
        ..Config::default()
    };
    let router = test_app_with(config).into_router();

    assert_eq!(get(&router, "/v2/loans").await.status(), StatusCode::OK);
    assert_eq!(get(&router, "/v2/stats").await.status(), StatusCode::OK);
    assert_eq!(get(&router, "/api/loans").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn loans_are_not_mounted_at_root() {
    let router = test_app().into_router();
    assert_eq!(get(&router, "/loans").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(get(&router, "/api/metrics").await.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Metrics Endpoint
// =============================================================================

#[tokio::test]
async fn metrics_returns_text_format() {
    let router = test_app().into_router();
    let response = get(&router, "/metrics").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        prometheus::TEXT_FORMAT
    );
    let body = body_string(response).await;
    assert!(body.contains("# TYPE loan_service_loans_recorded_total counter"));
}

#[tokio::test]
async fn metric_families_are_stable_between_scrapes() {
    let router = test_app().into_router();
    // The first scrape creates the request series for the metrics group itself.
    get(&router, "/metrics").await;

    let first = body_string(get(&router, "/metrics").await).await;
    let second = body_string(get(&router, "/metrics").await).await;
    assert_eq!(family_names(&first), family_names(&second));
    assert_eq!(
        sample_value(&first, "loan_service_loans_recorded_total"),
        sample_value(&second, "loan_service_loans_recorded_total")
    );
}

#[tokio::test]
async fn counters_never_decrease_between_scrapes() {
    let router = test_app().into_router();

    let before = body_string(get(&router, "/metrics").await).await;
    let before = sample_value(&before, "loan_service_loans_recorded_total").unwrap();

    let created = post_json(&router, "/api/loans", &sample_loan()).await;
    assert_eq!(created.status(), StatusCode::CREATED);

    let after = body_string(get(&router, "/metrics").await).await;
    let recorded = sample_value(&after, "loan_service_loans_recorded_total").unwrap();
    assert!(recorded >= before);
    assert_eq!(recorded, before + 1.0);
    assert_eq!(sample_value(&after, "loan_service_loans_on_book"), Some(1.0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn loans_on_book_gauge_matches_book_under_concurrent_posts() {
    let router = test_app().into_router();

    let posts = (0..32).map(|_| {
        let router = router.clone();
        tokio::spawn(async move { post_json(&router, "/api/loans", &sample_loan()).await.status() })
    });
    for status in futures::future::join_all(posts).await {
        assert_eq!(status.unwrap(), StatusCode::CREATED);
    }

    let body = body_string(get(&router, "/metrics").await).await;
    assert_eq!(sample_value(&body, "loan_service_loans_on_book"), Some(32.0));
    let stats = body_json(get(&router, "/api/stats").await).await;
    assert_eq!(stats["loans_on_book"], 32);
}

#[tokio::test]
async fn requests_are_counted_per_group() {
    let router = test_app().into_router();
    get(&router, "/health").await;
    get(&router, "/health").await;

    let body = body_string(get(&router, "/metrics").await).await;
    assert_eq!(
        sample_value(
            &body,
            r#"loan_service_http_requests_total{group="health",method="GET",status="200"}"#
        ),
        Some(2.0)
    );
}

// =============================================================================
// Health Group
// =============================================================================

#[tokio::test]
async fn health_is_always_ok() {
    let router = test_app().into_router();
    let response = get(&router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "OK");
}

#[tokio::test]
async fn readiness_follows_lifecycle() {
    let app = test_app();
    let state = app.state().clone();
    let router = app.into_router();

    let response = get(&router, "/readyz").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_string(response).await, "NOT_READY");

    state.set_ready(true);
    let response = get(&router, "/readyz").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "READY");

    state.start_draining();
    let response = get(&router, "/readyz").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_string(response).await, "DRAINING");
}

#[tokio::test]
async fn build_reports_name_and_version() {
    let router = test_app().into_router();
    let json = body_json(get(&router, "/_build").await).await;
    assert_eq!(json["name"], "loan-service");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// Loans Group
// =============================================================================

#[tokio::test]
async fn record_then_fetch_loan() {
    let router = test_app().into_router();

    let created = post_json(&router, "/api/loans", &sample_loan()).await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let loan = body_json(created).await;
    assert_eq!(loan["applicant"], "Ada Lovelace");
    assert_eq!(loan["principal_cents"], 1_500_000);
    let id = loan["id"].as_str().unwrap().to_string();

    let fetched = get(&router, &format!("/api/loans/{id}")).await;
    assert_eq!(fetched.status(), StatusCode::OK);
    assert_eq!(body_json(fetched).await, loan);

    let listed = body_json(get(&router, "/api/loans").await).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_loan_is_not_found() {
    let router = test_app().into_router();
    let response = get(&router, "/api/loans/does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "NOT_FOUND");
}

#[tokio::test]
async fn undecodable_body_is_a_client_error() {
    let router = test_app().into_router();
    let response = post_json(&router, "/api/loans", &json!({"applicant": "x"})).await;
    assert!(response.status().is_client_error());
}

// =============================================================================
// Stats Group
// =============================================================================

#[tokio::test]
async fn stats_reflect_counters() {
    let router = test_app().into_router();
    post_json(&router, "/api/loans", &sample_loan()).await;
    post_json(&router, "/api/loans", &sample_loan()).await;
    get(&router, "/health").await;

    let json = body_json(get(&router, "/api/stats").await).await;
    assert_eq!(json["loans_recorded"], 2);
    assert_eq!(json["loans_on_book"], 2);
    assert_eq!(json["requests"]["loans"], 2);
    assert_eq!(json["requests"]["health"], 1);
    assert!(json["uptime_seconds"].is_u64());
}
