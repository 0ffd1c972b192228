use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use grid_control::testing::{fake_capture, fake_kernels, fake_workflow, failing_kernel};
use grid_control::{Kernels, Pipeline};
use grid_core::test_fixtures::sample_document;
use grid_store::StateStore;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::routes::make_router;
use crate::state::AppState;

fn seeded_store(dir: &TempDir) -> StateStore {
    let store = StateStore::new(dir.path().join("state.json"));
    store.save(&sample_document()).unwrap();
    store
}

fn make_test_app() -> (TempDir, Router) {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let pipeline = Pipeline::new(store.clone(), fake_kernels(&store), "2025", Some(7));
    (dir, make_router(AppState::new(pipeline)))
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_returns_200() {
    let (_dir, app) = make_test_app();
    let (status, json) = send(app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["state_file_exists"], true);
}

#[tokio::test]
async fn test_district_emissions_defaults_year() {
    let (_dir, app) = make_test_app();
    let (status, json) = send(app, "GET", "/api/emissions/district/Kolar", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["year"], "2025");
    assert_eq!(json["total_emission"], 3000.0);
    assert_eq!(json["breakdown"]["industrial_percentage"], 20.0);
}

#[tokio::test]
async fn test_unknown_district_is_404() {
    let (_dir, app) = make_test_app();
    let (status, json) = send(
        app,
        "GET",
        "/api/emissions/district/Atlantis?year=2025",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "District not found");
    assert_eq!(json["kind"], "NotFound");
}

#[tokio::test]
async fn test_all_emissions_lists_generated_districts() {
    let (_dir, app) = make_test_app();
    let (status, json) = send(app, "GET", "/api/emissions/all?year=2025", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_districts"], 2);
    assert_eq!(json["districts"][0]["district"], "Bengaluru Urban");
}

#[tokio::test]
async fn test_generate_then_query() {
    let (_dir, app) = make_test_app();
    let (status, json) = send(
        app.clone(),
        "POST",
        "/api/emissions/generate?year=2025",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["generated"], 24);

    let (_, json) = send(app, "GET", "/api/emissions/district/Mysuru?year=2025", None).await;
    assert!(json["total_emission"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_dispersion_simulate_uses_defaults() {
    let (_dir, app) = make_test_app();
    let (status, json) = send(app, "POST", "/api/dispersion/simulate", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["simulation_params"]["steps"], 20);
    assert_eq!(json["simulation_params"]["wind"]["direction"], "NE");
    assert_eq!(json["simulation_params"]["year"], "2025");
    assert_eq!(json["total_districts"], 3);
}

#[tokio::test]
async fn test_dispersion_rejects_bad_params_with_400() {
    let (_dir, app) = make_test_app();
    let (status, json) = send(
        app.clone(),
        "POST",
        "/api/dispersion/simulate",
        Some(json!({ "steps": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "ConfigurationError");

    let (status, _) = send(
        app,
        "POST",
        "/api/dispersion/simulate",
        Some(json!({ "wind_direction": "upward" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mistyped_body_is_400_configuration_error() {
    let (_dir, app) = make_test_app();
    let cases = [
        ("/api/dispersion/simulate", json!({ "steps": "ten" })),
        ("/api/capture/simulate", json!({ "year": 2025 })),
        ("/api/workflow/run", json!({ "staged": "yes" })),
        ("/api/workflow/compare", json!({ "scenario_names": "a,b" })),
    ];
    for (uri, body) in cases {
        let (status, json) = send(app.clone(), "POST", uri, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json["kind"], "ConfigurationError", "{uri}");
        assert!(json["error"].as_str().unwrap().starts_with("invalid request body"));
    }
}

#[tokio::test]
async fn test_body_without_json_content_type_is_400() {
    let (_dir, app) = make_test_app();
    let (status, json) = send(app.clone(), "POST", "/api/capture/simulate", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "ConfigurationError");

    let request = Request::builder()
        .method("POST")
        .uri("/api/dispersion/simulate")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_kernel_failure_is_500_with_stderr() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let before = std::fs::read(store.path()).unwrap();
    let kernels = Kernels {
        diffusion: failing_kernel(store.clone(), "bad wind value"),
        capture: fake_capture(store.clone()),
        workflow: fake_workflow(store.clone()),
    };
    let app = make_router(AppState::new(Pipeline::new(
        store.clone(),
        kernels,
        "2025",
        Some(7),
    )));

    let (status, json) = send(app, "POST", "/api/dispersion/simulate", Some(json!({}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["kind"], "SimulationFailure");
    assert_eq!(json["error"], "Dispersion simulation failed: bad wind value");
    assert_eq!(std::fs::read(store.path()).unwrap(), before);
}

#[tokio::test]
async fn test_results_for_absent_year_are_empty() {
    let (_dir, app) = make_test_app();
    let (status, json) = send(app, "GET", "/api/dispersion/results?year=1999", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"], json!([]));
    assert_eq!(json["total_districts"], 0);
}

#[tokio::test]
async fn test_capture_simulate_then_results() {
    let (_dir, app) = make_test_app();
    let (status, json) = send(
        app.clone(),
        "POST",
        "/api/capture/simulate",
        Some(json!({
            "scenario_name": "tree_planting",
            "year": "2025",
            "interventions": { "tree_planting": 0.5 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["scenario_name"], "tree_planting");

    let (status, json) = send(
        app,
        "GET",
        "/api/capture/results/tree_planting?year=2025",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["scenario_name"], "tree_planting");
    assert_eq!(json["total_districts"], 3);
    assert_eq!(json["results"][0]["co2_before_capture"], 540.0);
}

#[tokio::test]
async fn test_capture_rejects_blank_scenario() {
    let (_dir, app) = make_test_app();
    let (status, _) = send(
        app,
        "POST",
        "/api/capture/simulate",
        Some(json!({ "scenario_name": " " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_workflow_run_reaches_capture_done() {
    let (_dir, app) = make_test_app();
    let (status, json) = send(
        app,
        "POST",
        "/api/workflow/run",
        Some(json!({ "scenario_name": "baseline", "capture": { "anything": 1 } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["state"], "CAPTURE_DONE");
    assert_eq!(json["scenario_name"], "baseline");
    assert_eq!(json["transitions"][1], "EMISSION_DONE");
}

#[tokio::test]
async fn test_staged_workflow_returns_stage_results() {
    let (_dir, app) = make_test_app();
    let (status, json) = send(
        app,
        "POST",
        "/api/workflow/run",
        Some(json!({
            "scenario_name": "tree_planting",
            "year": "2025",
            "staged": true,
            "dispersion": { "steps": 10, "wind_direction": "sw" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "CAPTURE_DONE");
    assert_eq!(json["dispersion"].as_array().unwrap().len(), 26);
    assert_eq!(json["capture"].as_array().unwrap().len(), 26);
}

#[tokio::test]
async fn test_compare_uses_default_scenarios() {
    let (_dir, app) = make_test_app();
    let (status, json) = send(app, "POST", "/api/workflow/compare", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["scenario_names"], json!(["baseline", "tree_planting"]));
}

#[tokio::test]
async fn test_compare_rejects_empty_list() {
    let (_dir, app) = make_test_app();
    let (status, json) = send(
        app,
        "POST",
        "/api/workflow/compare",
        Some(json!({ "scenario_names": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "ConfigurationError");
}

#[tokio::test]
async fn test_missing_store_is_500() {
    let dir = TempDir::new().unwrap();
    let store = StateStore::new(dir.path().join("absent.json"));
    let app = make_router(AppState::new(Pipeline::new(
        store.clone(),
        fake_kernels(&store),
        "2025",
        None,
    )));
    let (status, json) = send(app, "GET", "/api/dispersion/results", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["kind"], "StoreIOFailure");
}
