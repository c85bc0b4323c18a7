// handlers.rs
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::error::PollError;
use crate::models::{
    CreatePollRequest, LoginRequest, Poll, PollResults, UpdatePollRequest, User, VoteRequest,
};
use crate::session::AuthState;
use crate::state::SharedState;

/// Copies the logged-in user out so the session lock is not held across
/// backend calls.
async fn logged_in_user(state: &SharedState) -> Result<User, PollError> {
    state.session.read().await.require_user().cloned()
}

pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<User>, PollError> {
    let mut session = state.session.write().await;
    let user = session.login(&payload.email)?;
    Ok(Json(user.clone()))
}

pub async fn logout(State(state): State<SharedState>) -> StatusCode {
    state.session.write().await.logout();
    StatusCode::NO_CONTENT
}

pub async fn session_state(State(state): State<SharedState>) -> Json<AuthState> {
    Json(state.session.read().await.state().clone())
}

pub async fn list_polls(State(state): State<SharedState>) -> Result<Json<Vec<Poll>>, PollError> {
    Ok(Json(state.polls.list_polls().await?))
}

pub async fn get_poll(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Poll>, PollError> {
    Ok(Json(state.polls.get_poll(&id).await?))
}

pub async fn poll_results(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<PollResults>, PollError> {
    Ok(Json(state.polls.results(&id).await?))
}

pub async fn create_poll(
    State(state): State<SharedState>,
    Json(payload): Json<CreatePollRequest>,
) -> Result<(StatusCode, Json<Poll>), PollError> {
    let user = logged_in_user(&state).await?;
    state
        .config
        .limits
        .check_new_poll(&payload.title, &payload.description, &payload.options)
        .map_err(PollError::Validation)?;

    let poll = state
        .polls
        .create_poll(
            Some(&user),
            &payload.title,
            &payload.description,
            &payload.options,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(poll)))
}

pub async fn update_poll(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdatePollRequest>,
) -> Result<Json<Poll>, PollError> {
    let user = logged_in_user(&state).await?;
    let stored = state.polls.get_poll(&id).await?;
    if !stored.is_owned_by(&user) {
        return Err(PollError::Forbidden);
    }
    state
        .config
        .limits
        .check_edit(&payload.title, &payload.description, &payload.options)
        .map_err(PollError::Validation)?;

    // identity fields are taken from the stored poll
    let updated = Poll {
        title: payload.title,
        description: payload.description,
        options: payload.options,
        ..stored
    };
    Ok(Json(state.polls.update_poll(Some(&user), updated).await?))
}

pub async fn vote(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<Poll>, PollError> {
    logged_in_user(&state).await?;
    Ok(Json(state.polls.vote(&id, &payload.option_id).await?))
}
