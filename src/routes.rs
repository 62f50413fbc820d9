use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json,
    extract::{FromRequest, Path, Query, State},
    http::{HeaderMap, StatusCode, header::HOST},
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    config::Config,
    error::{AppError, AppResult},
    genres::FAVOURITE_GENRE_LIMIT,
    models::{
        CollectionCreated, CollectionDetail, CollectionInput, CollectionPatch,
        CollectionsOverview, CollectionsResponse, Credentials, Message, RequestCount,
        TokenResponse,
    },
};

/// `Json` whose rejections render as this service's `{error}` bodies.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(creds): ApiJson<Credentials>,
) -> AppResult<(StatusCode, Json<TokenResponse>)> {
    let user = state.users.register(&creds.username, &creds.password).await?;
    let access_token = state.jwt.issue(user.id, &user.username).context("issuing access token")?;
    Ok((StatusCode::CREATED, Json(TokenResponse { access_token })))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(creds): ApiJson<Credentials>,
) -> AppResult<Json<TokenResponse>> {
    let user = state.users.authenticate(&creds.username, &creds.password).await?;
    let access_token = state.jwt.issue(user.id, &user.username).context("issuing access token")?;
    Ok(Json(TokenResponse { access_token }))
}

#[derive(Debug, Deserialize)]
pub struct MoviesQuery {
    page: Option<String>,
}

pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    headers: HeaderMap,
    Query(q): Query<MoviesQuery>,
) -> AppResult<Json<Value>> {
    let page = match q.page.as_deref().map(str::trim) {
        None | Some("") => 1,
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|p| *p >= 1)
            .ok_or_else(|| AppError::BadRequest("Invalid page number.".to_string()))?,
    };

    let base = public_base(&state.config, &headers);
    let body = state.movies.list_movies(page, &base).await?;
    Ok(Json(body))
}

pub async fn list_collections(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<CollectionsResponse>> {
    let collections = state.collections.list_for_user(user.user_id).await?;
    let favourite = state.collections.favourite_genres(user.user_id, FAVOURITE_GENRE_LIMIT).await?;

    Ok(Json(CollectionsResponse {
        is_success: true,
        data: CollectionsOverview { collections, favourite_genres: favourite.join(", ") },
    }))
}

pub async fn create_collection(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(input): ApiJson<CollectionInput>,
) -> AppResult<(StatusCode, Json<CollectionCreated>)> {
    let created = state.collections.create(user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(CollectionCreated { collection_uuid: created.uuid })))
}

pub async fn get_collection(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(collection_uuid): Path<String>,
) -> AppResult<Json<CollectionDetail>> {
    let uuid = parse_path_uuid(&collection_uuid)?;
    Ok(Json(state.collections.get_detail(user.user_id, uuid).await?))
}

pub async fn update_collection(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(collection_uuid): Path<String>,
    ApiJson(patch): ApiJson<CollectionPatch>,
) -> AppResult<Json<CollectionDetail>> {
    let uuid = parse_path_uuid(&collection_uuid)?;
    Ok(Json(state.collections.update(user.user_id, uuid, patch).await?))
}

pub async fn delete_collection(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(collection_uuid): Path<String>,
) -> AppResult<StatusCode> {
    let uuid = parse_path_uuid(&collection_uuid)?;
    state.collections.delete(user.user_id, uuid).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn request_count(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> AppResult<Json<RequestCount>> {
    Ok(Json(RequestCount { requests: state.tally.read().await? }))
}

pub async fn reset_request_count(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> AppResult<Json<Message>> {
    state.tally.reset().await?;
    tracing::info!("request count reset");
    Ok(Json(Message { message: "Request count reset successfully".to_string() }))
}

fn parse_path_uuid(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest("Invalid UUID format.".to_string()))
}

/// Absolute base URL clients use to reach this service.
fn public_base(config: &Config, headers: &HeaderMap) -> String {
    if let Some(url) = &config.public_url {
        return url.clone();
    }
    let host = headers.get(HOST).and_then(|v| v.to_str().ok()).unwrap_or("localhost");
    let scheme =
        headers.get("x-forwarded-proto").and_then(|v| v.to_str().ok()).unwrap_or("http");
    format!("{scheme}://{host}")
}
