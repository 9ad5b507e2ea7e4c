//! HTTP adapter over `parley-core`.
//!
//! Handlers decode requests, run the core operation on the blocking pool
//! and encode the result. Authorization beyond "who is calling" lives in
//! the core.

pub mod auth;
pub mod error;
pub mod extract;
pub mod friends;
pub mod groups;
pub mod messages;
pub mod middleware;
pub mod state;
pub mod users;

use axum::{
    Router,
    routing::{get, post},
};

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// All routes, with authentication applied to everything but `/auth`.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/friends", get(friends::list_friends))
        .route(
            "/friends/requests",
            get(friends::list_requests).post(friends::send_request),
        )
        .route("/friends/requests/{edge_id}/accept", post(friends::accept_request))
        .route("/friends/requests/{edge_id}/block", post(friends::block))
        .route("/friends/requests/{edge_id}/unblock", post(friends::unblock))
        .route("/users/search", get(users::search))
        .route("/users/me", get(users::me).put(users::update_me))
        .route("/messages", get(messages::get_messages).post(messages::send_message))
        .route("/messages/unread", get(messages::unread_count))
        .route("/messages/{message_id}/read", post(messages::mark_read))
        .route("/groups", get(groups::list_groups).post(groups::create_group))
        .route(
            "/groups/{group_id}/members",
            get(groups::list_members).post(groups::add_member),
        )
        .route("/groups/{group_id}/admins", post(groups::toggle_admin))
        .route(
            "/groups/{group_id}/messages",
            get(groups::get_messages).post(groups::send_message),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}
