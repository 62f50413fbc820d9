use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sea_orm::{
    DatabaseConnection, EntityTrait, Set,
    sea_query::{Expr, OnConflict},
};

use crate::{AppState, entities::request_counter, error::AppResult};

const COUNTER_ID: i32 = 1;

/// Global request counter kept as a single row so every instance sharing the
/// database sees the same tally.
#[derive(Clone)]
pub struct RequestTally {
    db: DatabaseConnection,
}

impl RequestTally {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Adds one in a single `INSERT .. ON CONFLICT DO UPDATE` statement, so
    /// concurrent requests cannot lose updates.
    pub async fn increment(&self) -> AppResult<()> {
        self.upsert(
            1,
            Expr::col((request_counter::Entity, request_counter::Column::Count)).add(1),
        )
        .await
    }

    pub async fn read(&self) -> AppResult<i64> {
        let row = request_counter::Entity::find_by_id(COUNTER_ID).one(&self.db).await?;
        Ok(row.map(|r| r.count).unwrap_or(0))
    }

    pub async fn reset(&self) -> AppResult<()> {
        self.upsert(0, Expr::value(0)).await
    }

    async fn upsert(&self, seed: i64, on_conflict: sea_orm::sea_query::SimpleExpr) -> AppResult<()> {
        let row = request_counter::ActiveModel { id: Set(COUNTER_ID), count: Set(seed) };
        request_counter::Entity::insert(row)
            .on_conflict(
                OnConflict::column(request_counter::Column::Id)
                    .value(request_counter::Column::Count, on_conflict)
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }
}

/// Counts every inbound request before it reaches a handler.
pub async fn count_requests(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if let Err(err) = state.tally.increment().await {
        tracing::error!(error = %err, "failed to increment request tally");
    }
    next.run(request).await
}
