//! Create position table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Position::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Position::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Position::ElectionId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Position::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Position::Description).text())
                    .col(
                        ColumnDef::new(Position::Seats)
                            .integer()
                            .not_null()
                            .default(1)
                            .check(Expr::col(Position::Seats).gte(1)),
                    )
                    .col(
                        ColumnDef::new(Position::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_position_election")
                            .from(Position::Table, Position::ElectionId)
                            .to(Election::Table, Election::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: election_id (for listing an election's positions)
        manager
            .create_index(
                Index::create()
                    .name("idx_position_election_id")
                    .table(Position::Table)
                    .col(Position::ElectionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Position::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Position {
    Table,
    Id,
    ElectionId,
    Title,
    Description,
    Seats,
    CreatedAt,
}

#[derive(Iden)]
enum Election {
    Table,
    Id,
}
