//! Create vote table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vote::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Vote::ElectionId).string_len(32).not_null())
                    .col(ColumnDef::new(Vote::PositionId).string_len(32).not_null())
                    .col(ColumnDef::new(Vote::VoterId).string_len(64).not_null())
                    .col(ColumnDef::new(Vote::CandidateId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Vote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_election")
                            .from(Vote::Table, Vote::ElectionId)
                            .to(Election::Table, Election::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_position")
                            .from(Vote::Table, Vote::PositionId)
                            .to(Position::Table, Position::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_candidate")
                            .from(Vote::Table, Vote::CandidateId)
                            .to(Candidate::Table, Candidate::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (election_id, position_id, voter_id) - one vote per voter per position
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_election_position_voter")
                    .table(Vote::Table)
                    .col(Vote::ElectionId)
                    .col(Vote::PositionId)
                    .col(Vote::VoterId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: candidate_id (for counting a candidate's votes)
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_candidate_id")
                    .table(Vote::Table)
                    .col(Vote::CandidateId)
                    .to_owned(),
            )
            .await?;

        // Index: (election_id, voter_id) (for turnout and remaining positions)
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_election_voter")
                    .table(Vote::Table)
                    .col(Vote::ElectionId)
                    .col(Vote::VoterId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vote::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Vote {
    Table,
    Id,
    ElectionId,
    PositionId,
    VoterId,
    CandidateId,
    CreatedAt,
}

#[derive(Iden)]
enum Election {
    Table,
    Id,
}

#[derive(Iden)]
enum Position {
    Table,
    Id,
}

#[derive(Iden)]
enum Candidate {
    Table,
    Id,
}
