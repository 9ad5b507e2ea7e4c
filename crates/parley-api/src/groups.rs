use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};

use parley_core::{ChatError, conversations, groups, retrieval};
use parley_types::api::{
    AddMemberRequest, Claims, CreateGroupRequest, SendGroupMessageRequest, SendMessageResponse,
    SentMessage, ToggleAdminRequest, ToggleAdminResponse,
};
use parley_types::models::GroupId;

use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::state::{AppState, run_blocking};

pub async fn list_groups(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = claims.sub;
    let groups = run_blocking(&state, move |s| groups::list_user_groups(&s.db, user)).await?;
    Ok(Json(groups))
}

pub async fn create_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = claims.sub;
    let group = run_blocking(&state, move |s| {
        groups::create_group(&s.db, owner, &req.name, &req.description)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<GroupId>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = claims.sub;
    let members = run_blocking(&state, move |s| {
        let members = groups::list_group_members(&s.db, group_id)?;
        if !members.iter().any(|m| m.user_id == viewer) {
            return Err(ChatError::Forbidden(
                "only group members can see the member list".into(),
            ));
        }
        Ok(members)
    })
    .await?;
    Ok(Json(members))
}

pub async fn add_member(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<GroupId>,
    Json(req): Json<AddMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = claims.sub;
    let member = run_blocking(&state, move |s| {
        groups::add_member(&s.db, group_id, actor, &req.username)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn toggle_admin(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<GroupId>,
    Json(req): Json<ToggleAdminRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = claims.sub;
    let user_id = req.user_id;
    let role = run_blocking(&state, move |s| {
        groups::toggle_admin(&s.db, group_id, actor, user_id)
    })
    .await?;
    Ok(Json(ToggleAdminResponse {
        group_id,
        user_id,
        role,
    }))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<GroupId>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = claims.sub;
    let entries = run_blocking(&state, move |s| {
        retrieval::get_group_conversation(&s.db, &s.message_key, viewer, group_id)
    })
    .await?;
    Ok(Json(entries))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<GroupId>,
    Json(req): Json<SendGroupMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let body = req.message.ok_or(ApiError::MissingData)?;
    let sender = claims.sub;

    let message = run_blocking(&state, move |s| {
        conversations::send_group_message(&s.db, &s.message_key, &s.chat, sender, group_id, &body)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            status: "success",
            message: SentMessage {
                id: message.id,
                body: message.body,
                timestamp: message.timestamp,
                sender: claims.username,
            },
        }),
    ))
}
