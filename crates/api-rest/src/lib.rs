//! # API REST
//!
//! REST API for the CH-ELM case consolidation service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialisation, CORS, status mapping)
//!
//! The handlers are thin: every operation delegates to [`CaseService`] or the
//! patient directory; no case logic lives here.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use chelm_core::{CaseError, CaseRecord, CaseService, RawReportEvent, ReportKind};
use chelm_pseudonym::{AhvNumber, PatientDirectory};
use chelm_types::{PathogenCode, PatientId};

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub case_service: CaseService,
    pub patient_directory: Arc<dyn PatientDirectory>,
}

// ---------- Request/Response models ----------

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// One incoming report event, as delivered by the upstream extraction layer.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitReportReq {
    pub report_id: String,
    pub patient_id: String,
    pub pathogen_code: String,
    #[serde(default)]
    pub pathogen_description: Option<String>,
    /// ISO-8601 timestamp or plain `YYYY-MM-DD` date.
    pub event_timestamp: String,
    /// "lab" or "clinical".
    pub report_kind: String,
    #[serde(default)]
    pub lab_interpretation: Option<String>,
    #[serde(default)]
    pub clinical_manifestation: Option<String>,
    pub canton: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitReportRes {
    pub case_id: String,
    /// True if this report created the case.
    pub created: bool,
    pub case_class: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CaseRes {
    pub case_id: String,
    pub patient_id: String,
    pub pathogen_code: String,
    pub pathogen_description: String,
    pub case_date: String,
    pub case_class: String,
    pub case_status: String,
    pub canton: String,
    pub lb_date: Option<String>,
    pub lb_interpretation: Option<String>,
    pub kb_date: Option<String>,
    pub kb_manifestation: Option<String>,
}

impl From<CaseRecord> for CaseRes {
    fn from(case: CaseRecord) -> Self {
        Self {
            case_id: case.case_id.to_string(),
            patient_id: case.patient_id.to_string(),
            pathogen_code: case.pathogen_code.to_string(),
            pathogen_description: case.pathogen_description,
            case_date: case.case_date.to_string(),
            case_class: case.case_class.to_string(),
            case_status: case.case_status,
            canton: case.canton.to_string(),
            lb_date: case.lb_date.map(|d| d.to_string()),
            lb_interpretation: case.lb_interpretation,
            kb_date: case.kb_date.map(|d| d.to_string()),
            kb_manifestation: case.kb_manifestation,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CasesListRes {
    pub cases: Vec<CaseRes>,
    pub total_count: usize,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CasesQuery {
    pub patient_id: String,
    pub pathogen_code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CaseReportsRes {
    pub case_id: String,
    pub report_ids: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCaseStatusReq {
    pub case_status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolvePatientReq {
    /// Swiss AHV number, formatted or bare digits.
    pub ahv_number: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResolvePatientRes {
    /// Stable opaque pseudonym for this patient.
    pub patient_id: String,
    /// True if this call minted a new pseudonym.
    pub created: bool,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        submit_report,
        get_case,
        list_cases,
        get_case_reports,
        update_case_status,
        resolve_patient,
    ),
    components(schemas(
        HealthRes,
        SubmitReportReq,
        SubmitReportRes,
        CaseRes,
        CasesListRes,
        CaseReportsRes,
        UpdateCaseStatusReq,
        ResolvePatientReq,
        ResolvePatientRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with all case endpoints and the Swagger UI.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/reports", post(submit_report))
        .route("/cases", get(list_cases))
        .route("/cases/:id", get(get_case))
        .route("/cases/:id/reports", get(get_case_reports))
        .route("/cases/:id/status", put(update_case_status))
        .route("/patients/resolve", post(resolve_patient))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn map_error(context: &'static str, e: CaseError) -> (StatusCode, &'static str) {
    match e {
        CaseError::Validation(_) => {
            tracing::warn!("{context}: {e}");
            (StatusCode::BAD_REQUEST, "Invalid request")
        }
        CaseError::NotFound(_) => (StatusCode::NOT_FOUND, "Case not found"),
        CaseError::Conflict { .. } => {
            tracing::error!("{context}: {e}");
            (StatusCode::CONFLICT, "Concurrent case creation")
        }
        CaseError::Storage(_) => {
            tracing::error!("{context}: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "CH-ELM case API is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/reports",
    request_body = SubmitReportReq,
    responses(
        (status = 200, description = "Report consolidated into a case", body = SubmitReportRes),
        (status = 400, description = "Bad request"),
        (status = 409, description = "Concurrent case creation"),
        (status = 500, description = "Internal server error")
    )
)]
/// Submit one report event for case consolidation
///
/// Runs the full pipeline: normalisation, window matching, find-or-create,
/// idempotent linking and classification. Redelivering the same report is
/// safe and returns the same case.
///
/// # Errors
/// Returns `400 Bad Request` for malformed events (missing identifiers,
/// unparseable dates) and `500 Internal Server Error` for storage failures.
#[axum::debug_handler]
async fn submit_report(
    State(state): State<AppState>,
    Json(req): Json<SubmitReportReq>,
) -> Result<Json<SubmitReportRes>, (StatusCode, &'static str)> {
    let report_kind = match req.report_kind.as_str() {
        "lab" => ReportKind::Lab,
        "clinical" => ReportKind::Clinical,
        other => {
            tracing::warn!("unknown report_kind: {other}");
            return Err((StatusCode::BAD_REQUEST, "Invalid request"));
        }
    };

    let raw = RawReportEvent {
        report_id: req.report_id,
        patient_id: req.patient_id,
        pathogen_code: req.pathogen_code,
        pathogen_description: req.pathogen_description,
        event_timestamp: req.event_timestamp,
        report_kind,
        lab_interpretation: req.lab_interpretation,
        clinical_manifestation: req.clinical_manifestation,
        canton: req.canton,
    };

    match state.case_service.process_report(raw) {
        Ok(processed) => Ok(Json(SubmitReportRes {
            case_id: processed.case_id.to_string(),
            created: processed.created,
            case_class: processed.classification.case_class.to_string(),
        })),
        Err(e) => Err(map_error("submit report", e)),
    }
}

#[utoipa::path(
    get,
    path = "/cases/{id}",
    params(("id" = String, Path, description = "Case UUID")),
    responses(
        (status = 200, description = "Case retrieved", body = CaseRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Case not found")
    )
)]
/// Get a case by its id
#[axum::debug_handler]
async fn get_case(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<CaseRes>, (StatusCode, &'static str)> {
    let case_id = parse_case_id(&id)?;
    match state.case_service.get_case(case_id) {
        Ok(case) => Ok(Json(case.into())),
        Err(e) => Err(map_error("get case", e)),
    }
}

#[utoipa::path(
    get,
    path = "/cases",
    params(CasesQuery),
    responses(
        (status = 200, description = "Cases for one patient/pathogen scope", body = CasesListRes),
        (status = 400, description = "Bad request")
    )
)]
/// List all cases for one patient and pathogen
#[axum::debug_handler]
async fn list_cases(
    State(state): State<AppState>,
    Query(query): Query<CasesQuery>,
) -> Result<Json<CasesListRes>, (StatusCode, &'static str)> {
    let patient_id = PatientId::new(&query.patient_id).map_err(|e| {
        tracing::warn!("list cases: {e}");
        (StatusCode::BAD_REQUEST, "Invalid patient_id")
    })?;
    let pathogen_code = PathogenCode::new(&query.pathogen_code).map_err(|e| {
        tracing::warn!("list cases: {e}");
        (StatusCode::BAD_REQUEST, "Invalid pathogen_code")
    })?;

    match state
        .case_service
        .get_cases_by_patient_and_pathogen(&patient_id, &pathogen_code)
    {
        Ok(cases) => {
            let cases: Vec<CaseRes> = cases.into_iter().map(Into::into).collect();
            let total_count = cases.len();
            Ok(Json(CasesListRes { cases, total_count }))
        }
        Err(e) => Err(map_error("list cases", e)),
    }
}

#[utoipa::path(
    get,
    path = "/cases/{id}/reports",
    params(("id" = String, Path, description = "Case UUID")),
    responses(
        (status = 200, description = "Report ids linked to the case", body = CaseReportsRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Case not found")
    )
)]
/// List the report ids linked to a case
#[axum::debug_handler]
async fn get_case_reports(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<CaseReportsRes>, (StatusCode, &'static str)> {
    let case_id = parse_case_id(&id)?;
    match state.case_service.get_case_reports(case_id) {
        Ok(report_ids) => Ok(Json(CaseReportsRes {
            case_id: case_id.to_string(),
            report_ids: report_ids.into_iter().map(String::from).collect(),
        })),
        Err(e) => Err(map_error("get case reports", e)),
    }
}

#[utoipa::path(
    put,
    path = "/cases/{id}/status",
    params(("id" = String, Path, description = "Case UUID")),
    request_body = UpdateCaseStatusReq,
    responses(
        (status = 200, description = "Case status updated", body = CaseRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Case not found")
    )
)]
/// Update a case's lifecycle status
#[axum::debug_handler]
async fn update_case_status(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<UpdateCaseStatusReq>,
) -> Result<Json<CaseRes>, (StatusCode, &'static str)> {
    let case_id = parse_case_id(&id)?;
    if req.case_status.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "case_status cannot be empty"));
    }
    match state
        .case_service
        .update_case_status(case_id, req.case_status.trim())
    {
        Ok(case) => Ok(Json(case.into())),
        Err(e) => Err(map_error("update case status", e)),
    }
}

#[utoipa::path(
    post,
    path = "/patients/resolve",
    request_body = ResolvePatientReq,
    responses(
        (status = 200, description = "Patient pseudonym resolved", body = ResolvePatientRes),
        (status = 400, description = "Bad request"),
        (status = 500, description = "Internal server error")
    )
)]
/// Resolve an AHV number to a stable patient pseudonym
///
/// The same AHV number always resolves to the same pseudonym; unknown
/// numbers mint a fresh one. Raw identity data never reaches the case store.
#[axum::debug_handler]
async fn resolve_patient(
    State(state): State<AppState>,
    Json(req): Json<ResolvePatientReq>,
) -> Result<Json<ResolvePatientRes>, (StatusCode, &'static str)> {
    let ahv = AhvNumber::new(&req.ahv_number).map_err(|e| {
        tracing::warn!("resolve patient: {e}");
        (StatusCode::BAD_REQUEST, "Invalid AHV number")
    })?;

    match state.patient_directory.resolve(&ahv) {
        Ok(resolved) => Ok(Json(ResolvePatientRes {
            patient_id: resolved.patient_id.to_string(),
            created: resolved.created,
        })),
        Err(e) => {
            tracing::error!("resolve patient: {e}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal error"))
        }
    }
}

fn parse_case_id(id: &str) -> Result<uuid::Uuid, (StatusCode, &'static str)> {
    uuid::Uuid::parse_str(id).map_err(|e| {
        tracing::warn!("invalid case UUID: {e}");
        (StatusCode::BAD_REQUEST, "Invalid case UUID")
    })
}
