use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};

use parley_core::{conversations, retrieval};
use parley_types::api::{
    Claims, ConversationQuery, SendMessageRequest, SendMessageResponse, SentMessage,
    UnreadCountResponse,
};
use parley_types::models::MessageId;

use crate::error::ApiError;
use crate::extract::{Json, Path, Query};
use crate::state::{AppState, run_blocking};

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(recipient_id), Some(body)) = (req.recipient_id, req.message) else {
        return Err(ApiError::MissingData);
    };

    let sender = claims.sub;
    let message = run_blocking(&state, move |s| {
        conversations::send_direct_message(&s.db, &s.message_key, sender, recipient_id, &body)
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

pub async fn get_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ConversationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let other = query.user_id.ok_or(ApiError::MissingData)?;
    let viewer = claims.sub;

    let entries = run_blocking(&state, move |s| {
        retrieval::get_conversation(&s.db, &s.message_key, viewer, other)
    })
    .await?;

    Ok(Json(entries))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(message_id): Path<MessageId>,
) -> Result<impl IntoResponse, ApiError> {
    let reader = claims.sub;
    run_blocking(&state, move |s| conversations::mark_read(&s.db, message_id, reader)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = claims.sub;
    let unread = run_blocking(&state, move |s| conversations::unread_count(&s.db, user)).await?;
    Ok(Json(UnreadCountResponse { unread }))
}
