use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000002_create_collection_table::Collection;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movie::Table)
                    .if_not_exists()
                    .col(pk_auto(Movie::Id))
                    .col(string(Movie::Uuid))
                    .col(string_len(Movie::Title, 100))
                    .col(text(Movie::Description))
                    .col(string_len_null(Movie::Genres, 255))
                    .col(integer(Movie::CollectionId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_collection_id")
                            .from(Movie::Table, Movie::CollectionId)
                            .to(Collection::Table, Collection::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_collection_uuid_unique")
                    .table(Movie::Table)
                    .col(Movie::CollectionId)
                    .col(Movie::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Movie::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Movie {
    Table,
    Id,
    Uuid,
    Title,
    Description,
    Genres,
    CollectionId,
}
