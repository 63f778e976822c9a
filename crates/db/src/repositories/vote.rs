//! Vote repository.

use std::sync::Arc;

use ballotbox_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QuerySelect, sea_query::Expr,
};

use super::candidate::is_unique_violation;
use crate::entities::{Vote, vote};

/// Vote repository for database operations.
///
/// Votes are append-only: there is no update or delete.
#[derive(Clone)]
pub struct VoteRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a vote on the given connection or transaction.
    ///
    /// The unique index on (election, position, voter) decides whether this
    /// voter already voted; a violation is reported as
    /// [`AppError::AlreadyVoted`].
    pub async fn insert_in<C: ConnectionTrait>(
        conn: &C,
        model: vote::ActiveModel,
    ) -> AppResult<vote::Model> {
        model.insert(conn).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::AlreadyVoted
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Check whether a voter has voted for a position.
    pub async fn has_voted(
        &self,
        election_id: &str,
        position_id: &str,
        voter_id: &str,
    ) -> AppResult<bool> {
        let count = Vote::find()
            .filter(vote::Column::ElectionId.eq(election_id))
            .filter(vote::Column::PositionId.eq(position_id))
            .filter(vote::Column::VoterId.eq(voter_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// IDs of the positions a voter has already voted for in an election.
    pub async fn find_voted_position_ids(
        &self,
        election_id: &str,
        voter_id: &str,
    ) -> AppResult<Vec<String>> {
        Vote::find()
            .select_only()
            .column(vote::Column::PositionId)
            .filter(vote::Column::ElectionId.eq(election_id))
            .filter(vote::Column::VoterId.eq(voter_id))
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count the distinct voters who cast at least one vote in an election.
    pub async fn count_distinct_voters(&self, election_id: &str) -> AppResult<u64> {
        Vote::find()
            .select_only()
            .column(vote::Column::VoterId)
            .distinct()
            .filter(vote::Column::ElectionId.eq(election_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count all vote rows of an election.
    pub async fn count_by_election(&self, election_id: &str) -> AppResult<u64> {
        Vote::find()
            .filter(vote::Column::ElectionId.eq(election_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count vote rows per candidate across an election.
    ///
    /// Candidates without votes are absent from the result.
    pub async fn count_by_candidate_in<C: ConnectionTrait>(
        conn: &C,
        election_id: &str,
    ) -> AppResult<Vec<(String, i64)>> {
        Vote::find()
            .select_only()
            .column(vote::Column::CandidateId)
            .column_as(Expr::col(vote::Column::Id).count(), "count")
            .filter(vote::Column::ElectionId.eq(election_id))
            .group_by(vote::Column::CandidateId)
            .into_tuple()
            .all(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};

    #[tokio::test]
    async fn test_has_voted() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[btreemap! {
                    "num_items" => Value::BigInt(Some(1)),
                }]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let voted = repo.has_voted("e1", "p1", "voter1").await.unwrap();

        assert!(voted);
    }

    #[tokio::test]
    async fn test_count_distinct_voters() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[btreemap! {
                    "num_items" => Value::BigInt(Some(50)),
                }]])
                .into_connection(),
        );

        let repo = VoteRepository::new(db);
        let voters = repo.count_distinct_voters("e1").await.unwrap();

        assert_eq!(voters, 50);
    }
}
