use anyhow::Context;
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::{SchoolDetails, SchoolInput, SearchQuery};
use super::repo_types::School;
use super::services;
use crate::{
    auth::AuthUser,
    error::AppResult,
    extract::{ApiJson, ApiPath, ApiQuery},
    state::AppState,
};

pub fn read_router() -> Router<AppState> {
    Router::new()
        .route("/schools", get(list_schools))
        .route("/schools/search", get(search_schools))
        .route("/schools/:slug", get(get_school))
}

pub fn write_router() -> Router<AppState> {
    Router::new().route(
        "/me/school",
        get(get_my_school).post(create_my_school).put(update_my_school),
    )
}

#[instrument(skip(state))]
pub async fn list_schools(State(state): State<AppState>) -> AppResult<Json<Vec<School>>> {
    let schools = services::list_schools(state.schools.as_ref()).await?;
    Ok(Json(schools))
}

#[instrument(skip(state))]
pub async fn search_schools(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> AppResult<Json<Vec<School>>> {
    let schools = services::search_schools(state.schools.as_ref(), &query.q).await?;
    Ok(Json(schools))
}

#[instrument(skip(state))]
pub async fn get_school(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> AppResult<Json<SchoolDetails>> {
    let school = services::school_by_slug(state.schools.as_ref(), &slug).await?;
    Ok(Json(services::school_details(school, state.today())))
}

#[instrument(skip(state))]
pub async fn get_my_school(
    State(state): State<AppState>,
    AuthUser(admin_id): AuthUser,
) -> AppResult<Json<SchoolDetails>> {
    let school = services::my_school(state.schools.as_ref(), admin_id).await?;
    Ok(Json(services::school_details(school, state.today())))
}

/// POST /me/school
#[instrument(skip(state, input))]
pub async fn create_my_school(
    State(state): State<AppState>,
    AuthUser(admin_id): AuthUser,
    ApiJson(input): ApiJson<SchoolInput>,
) -> AppResult<(StatusCode, HeaderMap, Json<SchoolDetails>)> {
    let school = services::create_school(state.schools.as_ref(), admin_id, input).await?;

    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(&format!("/api/v1/schools/{}", school.slug))
        .context("location header")?;
    headers.insert(header::LOCATION, location);

    Ok((
        StatusCode::CREATED,
        headers,
        Json(services::school_details(school, state.today())),
    ))
}

#[instrument(skip(state, input))]
pub async fn update_my_school(
    State(state): State<AppState>,
    AuthUser(admin_id): AuthUser,
    ApiJson(input): ApiJson<SchoolInput>,
) -> AppResult<Json<SchoolDetails>> {
    let school = services::update_school(state.schools.as_ref(), admin_id, input).await?;
    Ok(Json(services::school_details(school, state.today())))
}
