//! Create election table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Election::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Election::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Election::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Election::Description).text())
                    .col(
                        ColumnDef::new(Election::StartsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Election::EndsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Election::Status)
                            .string_len(16)
                            .not_null()
                            .default("upcoming"),
                    )
                    .col(
                        ColumnDef::new(Election::ResultsPublished)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Election::CreatedBy).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Election::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Election::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Index: status (for listing elections by phase)
        manager
            .create_index(
                Index::create()
                    .name("idx_election_status")
                    .table(Election::Table)
                    .col(Election::Status)
                    .to_owned(),
            )
            .await?;

        // Index: created_at (for pagination)
        manager
            .create_index(
                Index::create()
                    .name("idx_election_created_at")
                    .table(Election::Table)
                    .col(Election::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Election::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Election {
    Table,
    Id,
    Title,
    Description,
    StartsAt,
    EndsAt,
    Status,
    ResultsPublished,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}
