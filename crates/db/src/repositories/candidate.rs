//! Candidate repository.

use std::sync::Arc;

use ballotbox_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, SqlErr, sea_query::Expr,
};

use crate::entities::candidate::CandidateStatus;
use crate::entities::{Candidate, candidate, position};

/// Candidate repository for database operations.
#[derive(Clone)]
pub struct CandidateRepository {
    db: Arc<DatabaseConnection>,
}

impl CandidateRepository {
    /// Create a new candidate repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a candidate by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<candidate::Model>> {
        Self::find_by_id_in(self.db.as_ref(), id).await
    }

    /// Find a candidate by ID on the given connection or transaction.
    pub async fn find_by_id_in<C: ConnectionTrait>(
        conn: &C,
        id: &str,
    ) -> AppResult<Option<candidate::Model>> {
        Candidate::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a candidate by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<candidate::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Candidate not found: {id}")))
    }

    /// Create a new candidacy.
    ///
    /// A second candidacy for the same (position, voter) trips the unique
    /// index and is reported as [`AppError::DuplicateCandidacy`].
    pub async fn create(&self, model: candidate::ActiveModel) -> AppResult<candidate::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateCandidacy
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// List the candidates of a position in registration order.
    ///
    /// With `approved_only`, only candidates on the ballot are returned.
    pub async fn find_by_position(
        &self,
        position_id: &str,
        approved_only: bool,
    ) -> AppResult<Vec<candidate::Model>> {
        let mut query = Candidate::find().filter(candidate::Column::PositionId.eq(position_id));
        if approved_only {
            query = query.filter(candidate::Column::Status.eq(CandidateStatus::Approved));
        }

        query
            .order_by_asc(candidate::Column::CreatedAt)
            .order_by_asc(candidate::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Approved candidates of a position ranked by votes, ties by ID.
    pub async fn find_ranked_by_position(
        &self,
        position_id: &str,
    ) -> AppResult<Vec<candidate::Model>> {
        Candidate::find()
            .filter(candidate::Column::PositionId.eq(position_id))
            .filter(candidate::Column::Status.eq(CandidateStatus::Approved))
            .order_by_desc(candidate::Column::Votes)
            .order_by_asc(candidate::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count approved candidates per position of an election.
    pub async fn count_approved_by_election(
        &self,
        election_id: &str,
    ) -> AppResult<Vec<(String, i64)>> {
        Candidate::find()
            .select_only()
            .column(candidate::Column::PositionId)
            .column_as(Expr::col((candidate::Entity, candidate::Column::Id)).count(), "count")
            .join(
                sea_orm::JoinType::InnerJoin,
                candidate::Relation::Position.def(),
            )
            .filter(position::Column::ElectionId.eq(election_id))
            .filter(candidate::Column::Status.eq(CandidateStatus::Approved))
            .group_by(candidate::Column::PositionId)
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All candidates standing in an election, any status.
    pub async fn find_by_election_in<C: ConnectionTrait>(
        conn: &C,
        election_id: &str,
    ) -> AppResult<Vec<candidate::Model>> {
        Candidate::find()
            .join(
                sea_orm::JoinType::InnerJoin,
                candidate::Relation::Position.def(),
            )
            .filter(position::Column::ElectionId.eq(election_id))
            .order_by_asc(candidate::Column::Id)
            .all(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Move a candidate to `to` if its current status is one of `from`.
    ///
    /// Returns `false` when no row matched.
    pub async fn transition(
        &self,
        id: &str,
        from: &[CandidateStatus],
        to: CandidateStatus,
    ) -> AppResult<bool> {
        let result = Candidate::update_many()
            .col_expr(candidate::Column::Status, Expr::value(to))
            .col_expr(
                candidate::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(candidate::Column::Id.eq(id))
            .filter(candidate::Column::Status.is_in(from.iter().copied()))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected == 1)
    }

    /// Add one to an approved candidate's counter.
    ///
    /// Runs `votes = votes + 1` in the database. Returns `false` when the
    /// candidate is missing or no longer approved.
    pub async fn increment_votes<C: ConnectionTrait>(conn: &C, id: &str) -> AppResult<bool> {
        let result = Candidate::update_many()
            .col_expr(
                candidate::Column::Votes,
                Expr::col(candidate::Column::Votes).add(1),
            )
            .filter(candidate::Column::Id.eq(id))
            .filter(candidate::Column::Status.eq(CandidateStatus::Approved))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected == 1)
    }

    /// Overwrite a candidate's counter.
    pub async fn set_votes<C: ConnectionTrait>(conn: &C, id: &str, votes: i64) -> AppResult<()> {
        Candidate::update_many()
            .col_expr(candidate::Column::Votes, Expr::value(votes))
            .filter(candidate::Column::Id.eq(id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

/// Check whether a database error is a unique index violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_candidate(id: &str, votes: i64) -> candidate::Model {
        candidate::Model {
            id: id.to_string(),
            position_id: "p1".to_string(),
            voter_id: format!("voter-{id}"),
            manifesto: None,
            status: CandidateStatus::Approved,
            votes,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_ranked_by_position() {
        let c1 = create_test_candidate("c1", 5);
        let c2 = create_test_candidate("c2", 3);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[c1, c2]])
                .into_connection(),
        );

        let repo = CandidateRepository::new(db);
        let result = repo.find_ranked_by_position("p1").await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].votes, 5);
    }

    #[tokio::test]
    async fn test_increment_votes_guarded_by_status() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let incremented = CandidateRepository::increment_votes(&db, "c1").await.unwrap();

        assert!(!incremented);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<candidate::Model>::new()])
                .into_connection(),
        );

        let repo = CandidateRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
