//! Create candidate table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Candidate::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Candidate::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Candidate::PositionId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Candidate::VoterId).string_len(64).not_null())
                    .col(ColumnDef::new(Candidate::Manifesto).text())
                    .col(
                        ColumnDef::new(Candidate::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Candidate::Votes)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Candidate::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Candidate::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_candidate_position")
                            .from(Candidate::Table, Candidate::PositionId)
                            .to(Position::Table, Position::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (position_id, voter_id) - one candidacy per voter per position
        manager
            .create_index(
                Index::create()
                    .name("idx_candidate_position_voter")
                    .table(Candidate::Table)
                    .col(Candidate::PositionId)
                    .col(Candidate::VoterId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: voter_id (for listing a voter's candidacies)
        manager
            .create_index(
                Index::create()
                    .name("idx_candidate_voter_id")
                    .table(Candidate::Table)
                    .col(Candidate::VoterId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Candidate::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Candidate {
    Table,
    Id,
    PositionId,
    VoterId,
    Manifesto,
    Status,
    Votes,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Position {
    Table,
    Id,
}
