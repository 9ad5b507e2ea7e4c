use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;

use parley_core::{relationships, retrieval};
use parley_types::api::{Claims, FriendRequestBody, FriendRequestView, UserSummary};
use parley_types::models::EdgeId;

use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::state::{AppState, run_blocking};

pub async fn list_friends(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = claims.sub;
    let friends = run_blocking(&state, move |s| {
        retrieval::get_friends_view(&s.db, &s.chat, user, Utc::now())
    })
    .await?;
    Ok(Json(friends))
}

pub async fn list_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = claims.sub;
    let incoming = run_blocking(&state, move |s| {
        relationships::list_incoming_requests(&s.db, user)
    })
    .await?;

    let views: Vec<FriendRequestView> = incoming
        .into_iter()
        .map(|(from, edge)| FriendRequestView {
            edge_id: edge.id,
            from: UserSummary {
                id: from.id,
                username: from.username,
                avatar: from.avatar,
            },
            created_at: edge.created_at,
        })
        .collect();
    Ok(Json(views))
}

pub async fn send_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<FriendRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let target = req.user_id.ok_or(ApiError::MissingData)?;
    let requester = claims.sub;

    let edge = run_blocking(&state, move |s| {
        relationships::send_friend_request(&s.db, requester, target)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(edge)))
}

pub async fn accept_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(edge_id): Path<EdgeId>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = claims.sub;
    let edge = run_blocking(&state, move |s| {
        relationships::accept_friend_request(&s.db, actor, edge_id)
    })
    .await?;
    Ok(Json(edge))
}

pub async fn block(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(edge_id): Path<EdgeId>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = claims.sub;
    let edge = run_blocking(&state, move |s| {
        relationships::block_friend(&s.db, actor, edge_id)
    })
    .await?;
    Ok(Json(edge))
}

pub async fn unblock(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(edge_id): Path<EdgeId>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = claims.sub;
    let edge = run_blocking(&state, move |s| {
        relationships::unblock_friend(&s.db, actor, edge_id)
    })
    .await?;
    Ok(Json(edge))
}
