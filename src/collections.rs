use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait, sea_query::JoinType,
};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::{
    entities::{collection, movie},
    error::{AppError, AppResult},
    genres,
    models::{CollectionDetail, CollectionInput, CollectionPatch, CollectionSummary, MovieView},
    validation::{
        FieldErrors, MovieChange, missing_for_insert, movie_key, validate_collection_patch,
        validate_new_collection,
    },
};

/// Owns collections and their movies. Every lookup is scoped to the owning
/// user, so another user's collection is indistinguishable from a missing one.
#[derive(Clone)]
pub struct CollectionStore {
    db: DatabaseConnection,
}

impl CollectionStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<CollectionSummary>> {
        let rows = collection::Entity::find()
            .filter(collection::Column::UserId.eq(user_id))
            .order_by_asc(collection::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(CollectionSummary::from).collect())
    }

    /// Creates a collection and all of its movies, or nothing at all.
    pub async fn create(&self, user_id: i32, input: CollectionInput) -> AppResult<collection::Model> {
        let staged = validate_new_collection(input).map_err(AppError::Validation)?;

        let txn = self.db.begin().await?;

        let created = collection::ActiveModel {
            user_id: Set(user_id),
            uuid: Set(Uuid::new_v4().to_string()),
            title: Set(staged.title),
            description: Set(staged.description),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let movie_count = staged.movies.len();
        if movie_count > 0 {
            let rows = staged.movies.into_iter().map(|m| movie::ActiveModel {
                uuid: Set(m.uuid.to_string()),
                title: Set(m.title),
                description: Set(m.description),
                genres: Set(m.genres),
                collection_id: Set(created.id),
                ..Default::default()
            });
            movie::Entity::insert_many(rows).exec(&txn).await?;
        }

        txn.commit().await?;

        debug!(collection = %created.uuid, movies = movie_count, "created collection");
        Ok(created)
    }

    pub async fn get_detail(&self, user_id: i32, uuid: Uuid) -> AppResult<CollectionDetail> {
        let found = find_owned(&self.db, user_id, uuid).await?;
        detail(&self.db, found).await
    }

    /// Applies a partial update. Movies are upserted by `(collection, uuid)`;
    /// movies absent from the patch are left alone.
    pub async fn update(
        &self,
        user_id: i32,
        uuid: Uuid,
        patch: CollectionPatch,
    ) -> AppResult<CollectionDetail> {
        let txn = self.db.begin().await?;

        let existing = find_owned(&txn, user_id, uuid).await?;
        let change = validate_collection_patch(patch).map_err(AppError::Validation)?;

        let (updates, inserts) = match change.movies {
            Some(movies) => stage_movie_upserts(&txn, existing.id, movies).await?,
            None => (Vec::new(), Vec::new()),
        };

        let mut active: collection::ActiveModel = existing.clone().into();
        if let Some(title) = change.title {
            active.title = Set(title);
        }
        if let Some(description) = change.description {
            active.description = Set(description);
        }
        let updated = if active.is_changed() { active.update(&txn).await? } else { existing };

        let (updated_count, inserted_count) = (updates.len(), inserts.len());
        for row in updates {
            if row.is_changed() {
                row.update(&txn).await?;
            }
        }
        if !inserts.is_empty() {
            movie::Entity::insert_many(inserts).exec(&txn).await?;
        }

        let out = detail(&txn, updated).await?;
        txn.commit().await?;

        debug!(
            collection = %uuid,
            movies_updated = updated_count,
            movies_inserted = inserted_count,
            "updated collection"
        );
        Ok(out)
    }

    /// Deletes a collection together with its movies.
    pub async fn delete(&self, user_id: i32, uuid: Uuid) -> AppResult<()> {
        let txn = self.db.begin().await?;

        let existing = find_owned(&txn, user_id, uuid).await?;

        let removed = movie::Entity::delete_many()
            .filter(movie::Column::CollectionId.eq(existing.id))
            .exec(&txn)
            .await?;
        collection::Entity::delete_by_id(existing.id).exec(&txn).await?;

        txn.commit().await?;

        debug!(collection = %uuid, movies = removed.rows_affected, "deleted collection");
        Ok(())
    }

    /// Top `limit` genre tags across every movie the user owns.
    pub async fn favourite_genres(&self, user_id: i32, limit: usize) -> AppResult<Vec<String>> {
        let tags: Vec<Option<String>> = movie::Entity::find()
            .select_only()
            .column(movie::Column::Genres)
            .join(JoinType::InnerJoin, movie::Relation::Collection.def())
            .filter(collection::Column::UserId.eq(user_id))
            .order_by_asc(movie::Column::Id)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(genres::top_genres(tags.iter().map(Option::as_deref), limit))
    }
}

async fn find_owned<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    uuid: Uuid,
) -> AppResult<collection::Model> {
    collection::Entity::find()
        .filter(collection::Column::Uuid.eq(uuid.to_string()))
        .filter(collection::Column::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Collection not found".to_string()))
}

async fn detail<C: ConnectionTrait>(conn: &C, found: collection::Model) -> AppResult<CollectionDetail> {
    let movies = movie::Entity::find()
        .filter(movie::Column::CollectionId.eq(found.id))
        .order_by_asc(movie::Column::Id)
        .all(conn)
        .await?;

    Ok(CollectionDetail {
        title: found.title,
        description: found.description,
        movies: movies.into_iter().map(MovieView::from).collect(),
    })
}

/// Splits movie changes into updates of existing rows and inserts of new ones.
/// Nothing is written here; a new movie missing required fields fails the
/// whole update.
async fn stage_movie_upserts<C: ConnectionTrait>(
    conn: &C,
    collection_id: i32,
    changes: Vec<MovieChange>,
) -> AppResult<(Vec<movie::ActiveModel>, Vec<movie::ActiveModel>)> {
    let keys: Vec<String> = changes.iter().map(|c| c.uuid.to_string()).collect();
    let mut stored: HashMap<String, movie::Model> = movie::Entity::find()
        .filter(movie::Column::CollectionId.eq(collection_id))
        .filter(movie::Column::Uuid.is_in(keys))
        .all(conn)
        .await?
        .into_iter()
        .map(|m| (m.uuid.clone(), m))
        .collect();

    let mut errors = FieldErrors::new();
    let mut updates = Vec::new();
    let mut inserts = Vec::new();

    for (index, change) in changes.into_iter().enumerate() {
        let key = change.uuid.to_string();
        if let Some(row) = stored.remove(&key) {
            let mut active: movie::ActiveModel = row.into();
            if let Some(title) = change.title {
                active.title = Set(title);
            }
            if let Some(description) = change.description {
                active.description = Set(description);
            }
            if let Some(genres) = change.genres {
                active.genres = Set(genres);
            }
            updates.push(active);
            continue;
        }

        if let Some(missing) = missing_for_insert(&change) {
            errors.insert(movie_key(index), json!({ "errors": missing, "title": change.title }));
            continue;
        }

        inserts.push(movie::ActiveModel {
            uuid: Set(key),
            title: Set(change.title.unwrap_or_default()),
            description: Set(change.description.unwrap_or_default()),
            genres: Set(change.genres.flatten()),
            collection_id: Set(collection_id),
            ..Default::default()
        });
    }

    if errors.is_empty() { Ok((updates, inserts)) } else { Err(AppError::Validation(errors)) }
}
