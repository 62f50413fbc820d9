use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RequestCounter::Table)
                    .if_not_exists()
                    .col(integer(RequestCounter::Id).primary_key())
                    .col(big_integer(RequestCounter::Count).default(0))
                    .to_owned(),
            )
            .await?;

        // The tally is a single global row.
        manager
            .exec_stmt(
                Query::insert()
                    .into_table(RequestCounter::Table)
                    .columns([RequestCounter::Id, RequestCounter::Count])
                    .values_panic([1.into(), 0.into()])
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(RequestCounter::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum RequestCounter {
    Table,
    Id,
    Count,
}
