use axum::{Extension, extract::State, response::IntoResponse};

use parley_core::{identity, retrieval};
use parley_types::api::{Claims, SearchQuery, UpdateProfileRequest};

use crate::error::ApiError;
use crate::extract::{Json, Query};
use crate::state::{AppState, run_blocking};

pub async fn search(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let requester = claims.sub;
    let hits = run_blocking(&state, move |s| {
        retrieval::search_users(&s.db, &query.q, requester)
    })
    .await?;
    Ok(Json(hits))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let user = run_blocking(&state, move |s| identity::get_user(&s.db, user_id)).await?;
    Ok(Json(user))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let user = run_blocking(&state, move |s| {
        identity::update_profile(&s.db, user_id, req.about_me.as_deref(), req.avatar.as_deref())
    })
    .await?;
    Ok(Json(user))
}
