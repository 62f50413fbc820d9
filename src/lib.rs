pub mod auth;
pub mod collections;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod genres;
pub mod models;
pub mod movies;
pub mod retry;
pub mod routes;
pub mod tally;
pub mod users;
pub mod validation;

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    auth::JwtKeys,
    collections::CollectionStore,
    config::Config,
    movies::MovieProxy,
    retry::{BasicAuth, RetryingClient},
    tally::RequestTally,
    users::UserStore,
};

pub struct AppState {
    pub config: Arc<Config>,
    pub jwt: JwtKeys,
    pub users: UserStore,
    pub collections: CollectionStore,
    pub tally: RequestTally,
    pub movies: Arc<MovieProxy>,
}

impl AppState {
    pub fn new(config: Arc<Config>, db: DatabaseConnection, http: wreq::Client) -> Self {
        let upstream = RetryingClient::new(http, config.movies_retry.clone());
        let movies = MovieProxy::new(
            upstream,
            config.movies_api_url.clone(),
            BasicAuth {
                username: config.movies_username.clone(),
                password: config.movies_password.clone(),
            },
            config.movies_rps,
        );

        Self {
            jwt: JwtKeys::new(&config.jwt_secret, config.jwt_ttl_minutes),
            users: UserStore::new(db.clone()),
            collections: CollectionStore::new(db.clone()),
            tally: RequestTally::new(db),
            movies: Arc::new(movies),
            config,
        }
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/register/", post(routes::register))
        .route("/login/", post(routes::login))
        .route("/movies/", get(routes::list_movies))
        .route("/collection/", get(routes::list_collections).post(routes::create_collection))
        .route(
            "/collection/{collection_uuid}/",
            get(routes::get_collection)
                .put(routes::update_collection)
                .delete(routes::delete_collection),
        )
        .route("/request-count/", get(routes::request_count))
        .route("/request-count/reset/", post(routes::reset_request_count))
        .layer(middleware::from_fn_with_state(state.clone(), tally::count_requests))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http())
}
