// routes.rs
use axum::{
    routing::{get, post},
    Router,
};
use http::Method;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers;
use crate::items;
use crate::state::SharedState;

pub fn create_routes(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any);

    let api = Router::new()
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/session", get(handlers::session_state))
        .route("/polls", get(handlers::list_polls).post(handlers::create_poll))
        .route(
            "/polls/{id}",
            get(handlers::get_poll).put(handlers::update_poll),
        )
        .route("/polls/{id}/vote", post(handlers::vote))
        .route("/polls/{id}/results", get(handlers::poll_results))
        .route("/items", get(items::list_items).post(items::create_item));

    Router::new()
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
