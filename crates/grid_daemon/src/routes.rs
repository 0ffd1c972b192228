use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderValue, Method},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use grid_core::{CaptureParams, ComparisonParams, SimulationRequest, DEFAULT_SCENARIO};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
pub fn make_router(state: AppState) -> Router {
    make_router_with_cors(state, "http://localhost:5173".parse().ok())
}

/// `cors_origin` of `None` allows any origin.
pub fn make_router_with_cors(state: AppState, cors_origin: Option<HeaderValue>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    let cors = match cors_origin {
        Some(origin) => cors.allow_origin(origin),
        None => cors.allow_origin(Any),
    };

    Router::new()
        .route("/api/health", get(health_handler))
        .route(
            "/api/emissions/district/:district_name",
            get(district_emissions_handler),
        )
        .route("/api/emissions/all", get(all_emissions_handler))
        .route("/api/emissions/generate", post(generate_emissions_handler))
        .route("/api/dispersion/simulate", post(dispersion_simulate_handler))
        .route("/api/dispersion/results", get(dispersion_results_handler))
        .route("/api/capture/simulate", post(capture_simulate_handler))
        .route(
            "/api/capture/results/:scenario_name",
            get(capture_results_handler),
        )
        .route("/api/workflow/run", post(workflow_run_handler))
        .route("/api/workflow/compare", post(workflow_compare_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run a blocking pipeline call off the async runtime.
async fn blocking<T, F>(state: &AppState, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&grid_control::Pipeline) -> Result<T, grid_control::PipelineError> + Send + 'static,
{
    let pipeline = state.pipeline.clone();
    Ok(tokio::task::spawn_blocking(move || f(&pipeline)).await??)
}

#[derive(Debug, Default, Deserialize)]
pub struct YearQuery {
    pub year: Option<String>,
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

pub async fn health_handler(State(app_state): State<AppState>) -> Json<Value> {
    let store = app_state.pipeline.store();
    Json(json!({
        "status": "ok",
        "state_file": store.path().display().to_string(),
        "state_file_exists": store.exists(),
        "default_year": app_state.pipeline.default_year(),
    }))
}

// ---------------------------------------------------------------------------
// Emissions
// ---------------------------------------------------------------------------

pub async fn district_emissions_handler(
    State(app_state): State<AppState>,
    Path(district_name): Path<String>,
    Query(query): Query<YearQuery>,
) -> ApiResult<Response> {
    let year = app_state.year_or_default(query.year);
    let view = blocking(&app_state, move |p| p.emission_for_district(&district_name, &year)).await?;
    match view {
        Some(view) => Ok(Json(view).into_response()),
        None => Err(ApiError::NotFound("District not found".to_string())),
    }
}

pub async fn all_emissions_handler(
    State(app_state): State<AppState>,
    Query(query): Query<YearQuery>,
) -> ApiResult<Json<Value>> {
    let year = app_state.year_or_default(query.year);
    let lookup_year = year.clone();
    let districts = blocking(&app_state, move |p| p.emission_for_all_districts(&lookup_year)).await?;
    Ok(Json(json!({
        "year": year,
        "total_districts": districts.len(),
        "districts": districts,
    })))
}

pub async fn generate_emissions_handler(
    State(app_state): State<AppState>,
    Query(query): Query<YearQuery>,
) -> ApiResult<Json<Value>> {
    let year = app_state.year_or_default(query.year);
    let target = year.clone();
    let generated = blocking(&app_state, move |p| p.ensure_emissions(&target)).await?;
    Ok(Json(json!({
        "success": true,
        "year": year,
        "generated": generated,
    })))
}

// ---------------------------------------------------------------------------
// Dispersion
// ---------------------------------------------------------------------------

pub async fn dispersion_simulate_handler(
    State(app_state): State<AppState>,
    payload: Result<Json<SimulationRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let year = app_state.year_or_default(request.year.clone());
    let params = request
        .dispersion_params(&year)
        .map_err(grid_control::PipelineError::from)?;
    let outcome = blocking(&app_state, move |p| p.run_dispersion(&params)).await?;
    Ok(Json(outcome).into_response())
}

pub async fn dispersion_results_handler(
    State(app_state): State<AppState>,
    Query(query): Query<YearQuery>,
) -> ApiResult<Json<Value>> {
    let year = app_state.year_or_default(query.year);
    let lookup_year = year.clone();
    let results = blocking(&app_state, move |p| p.dispersion_results(&lookup_year)).await?;
    Ok(Json(json!({
        "year": year,
        "total_districts": results.len(),
        "results": results,
    })))
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

fn default_scenario() -> String {
    DEFAULT_SCENARIO.to_string()
}

#[derive(Debug, Deserialize)]
pub struct CaptureBody {
    #[serde(default = "default_scenario")]
    pub scenario_name: String,
    #[serde(default)]
    pub year: Option<String>,
    /// Accepted for compatibility; the capture kernel reads its own scenario definitions.
    #[serde(default)]
    pub interventions: Option<Map<String, Value>>,
}

pub async fn capture_simulate_handler(
    State(app_state): State<AppState>,
    payload: Result<Json<CaptureBody>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = payload?;
    let year = app_state.year_or_default(body.year);
    let params = CaptureParams::new(&body.scenario_name, &year)
        .map_err(grid_control::PipelineError::from)?;
    if let Some(interventions) = &body.interventions {
        tracing::debug!(?interventions, "ignoring request-supplied interventions");
    }
    let outcome = blocking(&app_state, move |p| p.run_capture(&params)).await?;
    Ok(Json(outcome).into_response())
}

pub async fn capture_results_handler(
    State(app_state): State<AppState>,
    Path(scenario_name): Path<String>,
    Query(query): Query<YearQuery>,
) -> ApiResult<Json<Value>> {
    let year = app_state.year_or_default(query.year);
    let lookup_year = year.clone();
    let results = blocking(&app_state, move |p| p.capture_results(&lookup_year)).await?;
    Ok(Json(json!({
        "scenario_name": scenario_name,
        "year": year,
        "total_districts": results.len(),
        "results": results,
    })))
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct WorkflowBody {
    #[serde(default = "default_scenario")]
    pub scenario_name: String,
    #[serde(default)]
    pub year: Option<String>,
    /// Dispersion parameters. Used by the staged workflow; otherwise only validated.
    #[serde(default)]
    pub dispersion: Option<SimulationRequest>,
    /// Accepted for compatibility and not forwarded.
    #[serde(default)]
    pub capture: Option<Value>,
    /// Drive each stage through its own kernel instead of the end-to-end kernel.
    #[serde(default)]
    pub staged: bool,
}

pub async fn workflow_run_handler(
    State(app_state): State<AppState>,
    payload: Result<Json<WorkflowBody>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = payload?;
    let year = app_state.year_or_default(body.year);
    let dispersion = body
        .dispersion
        .unwrap_or_default()
        .dispersion_params(&year)
        .map_err(grid_control::PipelineError::from)?;
    if body.capture.is_some() {
        tracing::debug!("ignoring request-supplied capture config");
    }

    if body.staged {
        let scenario_name = body.scenario_name;
        let outcome =
            blocking(&app_state, move |p| p.run_staged_workflow(&dispersion, &scenario_name))
                .await?;
        return Ok(Json(outcome).into_response());
    }

    let params = CaptureParams::new(&body.scenario_name, &year)
        .map_err(grid_control::PipelineError::from)?;
    let outcome = blocking(&app_state, move |p| p.run_workflow(&params)).await?;
    Ok(Json(outcome).into_response())
}

fn default_comparison() -> Vec<String> {
    vec!["baseline".to_string(), "tree_planting".to_string()]
}

#[derive(Debug, Deserialize)]
pub struct CompareBody {
    #[serde(default = "default_comparison")]
    pub scenario_names: Vec<String>,
    #[serde(default)]
    pub year: Option<String>,
}

pub async fn workflow_compare_handler(
    State(app_state): State<AppState>,
    payload: Result<Json<CompareBody>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = payload?;
    let year = app_state.year_or_default(body.year);
    let params = ComparisonParams::new(&body.scenario_names, &year)
        .map_err(grid_control::PipelineError::from)?;
    let outcome = blocking(&app_state, move |p| p.compare_scenarios(&params)).await?;
    Ok(Json(outcome).into_response())
}
