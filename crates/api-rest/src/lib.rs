//! # API REST
//!
//! REST API implementation for MedInfo.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status codes)
//!
//! Uses `api-shared` for the wire types and `medinfo-core` for everything else.

#![warn(rust_2018_idioms)]

use api_shared::{
    HealthRes, HealthService, HistoryRes, ListMedicinesRes, LoginMode, LoginReq, Medicine,
    Profile, SearchOutcomeKind, SearchParams, SearchRes, SessionRes, Summary, TrendingRes,
};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use medinfo_core::constants::TRENDING_QUERIES;
use medinfo_core::input::{scan_image, ImageSource};
use medinfo_core::{catalogue, MedinfoError, Services};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

type ApiError = (StatusCode, &'static str);

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_medicines,
        get_medicine,
        trending,
        search,
        scan,
        list_history,
        clear_history,
        remove_history_entry,
        login,
        demo_login,
        logout,
        profile,
    ),
    components(schemas(
        HealthRes,
        Medicine,
        ListMedicinesRes,
        Summary,
        SearchOutcomeKind,
        SearchRes,
        HistoryRes,
        TrendingRes,
        LoginMode,
        LoginReq,
        Profile,
        SessionRes,
    ))
)]
struct ApiDoc;

/// Build the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/medicines", get(list_medicines))
        .route("/medicines/:id", get(get_medicine))
        .route("/trending", get(trending))
        .route("/search", get(search))
        .route("/scan", post(scan))
        .route("/history", get(list_history).delete(clear_history))
        .route("/history/:entry", delete(remove_history_entry))
        .route("/session/login", post(login))
        .route("/session/demo", post(demo_login))
        .route("/session/logout", post(logout))
        .route("/profile", get(profile))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn internal(context: &str, e: MedinfoError) -> ApiError {
    tracing::error!("{} error: {:?}", context, e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/medicines",
    responses(
        (status = 200, description = "Every medicine in the catalogue", body = ListMedicinesRes)
    )
)]
async fn list_medicines() -> Json<ListMedicinesRes> {
    Json(ListMedicinesRes {
        medicines: catalogue::all().iter().map(Medicine::from).collect(),
    })
}

#[utoipa::path(
    get,
    path = "/medicines/{id}",
    params(("id" = u32, Path, description = "Medicine identifier")),
    responses(
        (status = 200, description = "Medicine details", body = Medicine),
        (status = 404, description = "Unknown medicine")
    )
)]
async fn get_medicine(Path(id): Path<u32>) -> Result<Json<Medicine>, ApiError> {
    catalogue::find_by_id(id)
        .map(|m| Json(Medicine::from(m)))
        .ok_or((StatusCode::NOT_FOUND, "Medicine not found"))
}

#[utoipa::path(
    get,
    path = "/trending",
    responses(
        (status = 200, description = "Suggested queries", body = TrendingRes)
    )
)]
async fn trending() -> Json<TrendingRes> {
    Json(TrendingRes {
        queries: TRENDING_QUERIES.iter().map(|q| q.to_string()).collect(),
    })
}

#[utoipa::path(
    get,
    path = "/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Local matches, a remote summary, or nothing", body = SearchRes)
    )
)]
/// Run a query through the pipeline.
///
/// This is also the deep-link entry point: `/search?q=aspirin` behaves exactly like typing
/// the query. A missing or blank `q` yields the `no_query` outcome.
async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<SearchRes> {
    let raw = params.q.unwrap_or_default();
    let outcome = state.services.pipeline.search(&raw).await;
    Json(SearchRes::new(Some(raw), &outcome))
}

#[utoipa::path(
    post,
    path = "/scan",
    request_body(content = String, description = "Raw image bytes", content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Search results for the best OCR token", body = SearchRes),
        (status = 400, description = "Empty image"),
        (status = 422, description = "The image could not be processed"),
        (status = 503, description = "No OCR engine configured")
    )
)]
/// OCR an uploaded image and search for the best candidate token.
async fn scan(State(state): State<AppState>, body: Bytes) -> Result<Json<SearchRes>, ApiError> {
    let Some(ocr) = state.services.ocr.clone() else {
        return Err((StatusCode::SERVICE_UNAVAILABLE, "Image search is not available"));
    };
    if body.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Empty image"));
    }

    let image = ImageSource::Frame(body.to_vec());
    let progress = |p: u8| tracing::debug!("OCR progress {}%", p);
    let candidate = match scan_image(ocr.as_ref(), &image, &progress).await {
        Ok(candidate) => candidate,
        Err(e) => {
            tracing::error!("Scan error: {:?}", e);
            return Err((StatusCode::UNPROCESSABLE_ENTITY, "Could not process image"));
        }
    };

    let outcome = state.services.pipeline.search(candidate.as_str()).await;
    Ok(Json(SearchRes::new(Some(candidate.into_string()), &outcome)))
}

#[utoipa::path(
    get,
    path = "/history",
    responses(
        (status = 200, description = "Recent queries, most recent first", body = HistoryRes)
    )
)]
async fn list_history(State(state): State<AppState>) -> Json<HistoryRes> {
    Json(HistoryRes {
        entries: state.services.pipeline.history(),
    })
}

#[utoipa::path(
    delete,
    path = "/history",
    responses(
        (status = 200, description = "History cleared", body = HistoryRes),
        (status = 500, description = "Internal server error")
    )
)]
async fn clear_history(State(state): State<AppState>) -> Result<Json<HistoryRes>, ApiError> {
    state
        .services
        .pipeline
        .clear_history()
        .map_err(|e| internal("Clear history", e))?;
    Ok(Json(HistoryRes {
        entries: Vec::new(),
    }))
}

#[utoipa::path(
    delete,
    path = "/history/{entry}",
    params(("entry" = String, Path, description = "Query to forget")),
    responses(
        (status = 200, description = "Entry removed", body = HistoryRes),
        (status = 404, description = "Entry not in history"),
        (status = 500, description = "Internal server error")
    )
)]
async fn remove_history_entry(
    State(state): State<AppState>,
    Path(entry): Path<String>,
) -> Result<Json<HistoryRes>, ApiError> {
    let pipeline = &state.services.pipeline;
    let removed = pipeline
        .remove_history_entry(&entry)
        .map_err(|e| internal("Remove history entry", e))?;
    if !removed {
        return Err((StatusCode::NOT_FOUND, "Entry not in history"));
    }
    Ok(Json(HistoryRes {
        entries: pipeline.history(),
    }))
}

#[utoipa::path(
    post,
    path = "/session/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Signed in", body = SessionRes),
        (status = 400, description = "Missing name, email or password"),
        (status = 500, description = "Internal server error")
    )
)]
/// Sign in or register. Any non-empty credentials are accepted.
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginReq>,
) -> Result<Json<SessionRes>, ApiError> {
    match state.services.session.sign_in(req.into_credentials()) {
        Ok(profile) => Ok(Json(SessionRes::from_profile(Some(profile)))),
        Err(MedinfoError::InvalidInput(reason)) => {
            tracing::error!("Login rejected: {}", reason);
            Err((StatusCode::BAD_REQUEST, "Name, email and password are required"))
        }
        Err(e) => Err(internal("Login", e)),
    }
}

#[utoipa::path(
    post,
    path = "/session/demo",
    responses(
        (status = 200, description = "Signed in as the demo user", body = SessionRes),
        (status = 500, description = "Internal server error")
    )
)]
async fn demo_login(State(state): State<AppState>) -> Result<Json<SessionRes>, ApiError> {
    let profile = state
        .services
        .session
        .demo_sign_in()
        .map_err(|e| internal("Demo login", e))?;
    Ok(Json(SessionRes::from_profile(Some(profile))))
}

#[utoipa::path(
    post,
    path = "/session/logout",
    responses(
        (status = 200, description = "Signed out", body = SessionRes),
        (status = 500, description = "Internal server error")
    )
)]
async fn logout(State(state): State<AppState>) -> Result<Json<SessionRes>, ApiError> {
    state
        .services
        .session
        .sign_out()
        .map_err(|e| internal("Logout", e))?;
    Ok(Json(SessionRes::from_profile(None)))
}

#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "Profile of the signed-in user", body = Profile),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Internal server error")
    )
)]
async fn profile(State(state): State<AppState>) -> Result<Json<Profile>, ApiError> {
    match state.services.session.current_profile() {
        Ok(Some(profile)) => Ok(Json(profile.into())),
        Ok(None) => Err((StatusCode::UNAUTHORIZED, "Not signed in")),
        Err(e) => Err(internal("Profile", e)),
    }
}
