use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::calendar::Season;
use super::dto::{MenuOfTheDay, SchoolMenuResponse, SeasonQuery, WeekEditRequest, WeeklyMenuResponse};
use super::services;
use crate::{
    auth::AuthUser,
    error::AppResult,
    extract::{ApiJson, ApiPath, ApiQuery},
    schools::services::{my_school, school_by_slug},
    state::AppState,
};

// --- public routes ---

pub fn read_router() -> Router<AppState> {
    Router::new()
        .route("/schools/:slug/menu", get(school_menu_today))
        .route("/schools/:slug/menu/:week/:day", get(school_menu_at))
}

// --- administrator routes ---

pub fn write_router() -> Router<AppState> {
    Router::new()
        .route("/me/menu", get(my_menu_today))
        .route("/me/menu/:week/:season", get(get_week).put(update_week))
}

#[instrument(skip(state))]
pub async fn school_menu_today(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> AppResult<Json<SchoolMenuResponse>> {
    let school = school_by_slug(state.schools.as_ref(), &slug).await?;
    let menu = services::get_menu_for(state.meals.as_ref(), &school, state.today()).await?;
    Ok(Json(SchoolMenuResponse { school, menu }))
}

/// GET /schools/:slug/menu/:week/:day?season=winter|spring
#[instrument(skip(state))]
pub async fn school_menu_at(
    State(state): State<AppState>,
    ApiPath((slug, week, day)): ApiPath<(String, i16, i16)>,
    ApiQuery(query): ApiQuery<SeasonQuery>,
) -> AppResult<Json<SchoolMenuResponse>> {
    let school = school_by_slug(state.schools.as_ref(), &slug).await?;
    let menu = services::get_menu_at(
        state.meals.as_ref(),
        &school,
        week,
        day,
        query.season,
        state.today(),
    )
    .await?;
    Ok(Json(SchoolMenuResponse { school, menu }))
}

#[instrument(skip(state))]
pub async fn my_menu_today(
    State(state): State<AppState>,
    AuthUser(admin_id): AuthUser,
) -> AppResult<Json<MenuOfTheDay>> {
    let school = my_school(state.schools.as_ref(), admin_id).await?;
    let menu = services::get_menu_for(state.meals.as_ref(), &school, state.today()).await?;
    Ok(Json(menu))
}

#[instrument(skip(state))]
pub async fn get_week(
    State(state): State<AppState>,
    AuthUser(admin_id): AuthUser,
    ApiPath((week, season)): ApiPath<(i16, Season)>,
) -> AppResult<Json<WeeklyMenuResponse>> {
    let school = my_school(state.schools.as_ref(), admin_id).await?;
    let meals = services::get_or_create_week(state.meals.as_ref(), &school, week, season).await?;
    Ok(Json(WeeklyMenuResponse {
        week,
        season,
        menu_type: school.menu_type,
        meals,
    }))
}

#[instrument(skip(state, body))]
pub async fn update_week(
    State(state): State<AppState>,
    AuthUser(admin_id): AuthUser,
    ApiPath((week, season)): ApiPath<(i16, Season)>,
    ApiJson(body): ApiJson<WeekEditRequest>,
) -> AppResult<Json<WeeklyMenuResponse>> {
    let school = my_school(state.schools.as_ref(), admin_id).await?;
    let meals = services::update_week(state.meals.as_ref(), &school, week, season, body.days).await?;
    Ok(Json(WeeklyMenuResponse {
        week,
        season,
        menu_type: school.menu_type,
        meals,
    }))
}
