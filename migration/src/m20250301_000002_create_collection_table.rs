use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_user_table::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Collection::Table)
                    .if_not_exists()
                    .col(pk_auto(Collection::Id))
                    .col(integer(Collection::UserId))
                    .col(string_uniq(Collection::Uuid))
                    .col(string_len(Collection::Title, 100))
                    .col(text(Collection::Description))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_collection_user_id")
                            .from(Collection::Table, Collection::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_collection_user_id")
                    .table(Collection::Table)
                    .col(Collection::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Collection::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
pub enum Collection {
    Table,
    Id,
    UserId,
    Uuid,
    Title,
    Description,
}
