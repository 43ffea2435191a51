use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::identity::IdentityProvider;
use crate::middleware::{access_gate, AccountDirectory};
use crate::store::Db;

/// Shared application state. The identity and account seams are trait
/// objects so the whole router can run against stubs in tests.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub identity: Arc<dyn IdentityProvider>,
    pub accounts: Arc<dyn AccountDirectory>,
}

pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth", get(handlers::auth::current))
        // Users
        .route("/users", get(handlers::users::list))
        .route("/users/create", post(handlers::users::create))
        .route("/users/edit/:user_id", put(handlers::users::edit))
        .route("/users/delete/:user_id", delete(handlers::users::remove))
        .route("/users/:user_id", get(handlers::users::detail))
        .route("/users/:user_id/messages", get(handlers::users::messages))
        // Villages
        .route("/villages", get(handlers::villages::list))
        .route("/villages/create", post(handlers::villages::create))
        .route("/villages/edit/:village_id", put(handlers::villages::edit))
        .route("/villages/leave/:village_id", put(handlers::villages::leave))
        .route(
            "/villages/delete/:village_id",
            delete(handlers::villages::remove),
        )
        .route("/villages/:village_id", get(handlers::villages::detail))
        // Messages
        .route("/messages", get(handlers::messages::list))
        .route("/messages/create", post(handlers::messages::create))
        .route("/messages/edit/:message_id", put(handlers::messages::edit))
        .route(
            "/messages/delete/:message_id",
            delete(handlers::messages::remove),
        )
        .route("/messages/:message_id", get(handlers::messages::detail))
        // Every protected route passes through the access gate first
        .route_layer(from_fn_with_state(state.clone(), access_gate));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1", protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
