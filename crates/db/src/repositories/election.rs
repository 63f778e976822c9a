//! Election repository.

use std::sync::Arc;

use ballotbox_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, sea_query::Expr,
};

use crate::entities::election::ElectionStatus;
use crate::entities::{Election, election};

/// Election repository for database operations.
#[derive(Clone)]
pub struct ElectionRepository {
    db: Arc<DatabaseConnection>,
}

impl ElectionRepository {
    /// Create a new election repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an election by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<election::Model>> {
        Self::find_by_id_in(self.db.as_ref(), id).await
    }

    /// Find an election by ID on the given connection or transaction.
    pub async fn find_by_id_in<C: ConnectionTrait>(
        conn: &C,
        id: &str,
    ) -> AppResult<Option<election::Model>> {
        Election::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an election by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<election::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Election not found: {id}")))
    }

    /// Get an election by ID on the given connection or transaction.
    pub async fn get_by_id_in<C: ConnectionTrait>(
        conn: &C,
        id: &str,
    ) -> AppResult<election::Model> {
        Self::find_by_id_in(conn, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Election not found: {id}")))
    }

    /// Create a new election.
    pub async fn create(&self, model: election::ActiveModel) -> AppResult<election::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List elections, newest first, optionally restricted to one status.
    pub async fn find_recent(
        &self,
        status: Option<ElectionStatus>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<election::Model>> {
        let mut query = Election::find();
        if let Some(status) = status {
            query = query.filter(election::Column::Status.eq(status));
        }

        query
            .order_by_desc(election::Column::CreatedAt)
            .order_by_desc(election::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Move an election to `to` if its current status is one of `from`.
    ///
    /// The check and the write are a single conditional `UPDATE`, so two
    /// concurrent callers cannot both succeed. Returns `false` when no row
    /// matched.
    pub async fn transition(
        &self,
        id: &str,
        from: &[ElectionStatus],
        to: ElectionStatus,
    ) -> AppResult<bool> {
        let result = Election::update_many()
            .col_expr(election::Column::Status, Expr::value(to))
            .col_expr(
                election::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(election::Column::Id.eq(id))
            .filter(election::Column::Status.is_in(from.iter().copied()))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected == 1)
    }

    /// Mark the results of a completed election as visible to voters.
    pub async fn publish_results(&self, id: &str) -> AppResult<bool> {
        let result = Election::update_many()
            .col_expr(election::Column::ResultsPublished, Expr::value(true))
            .col_expr(
                election::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(election::Column::Id.eq(id))
            .filter(election::Column::Status.eq(ElectionStatus::Completed))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected == 1)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_election(id: &str, status: ElectionStatus) -> election::Model {
        election::Model {
            id: id.to_string(),
            title: "Board election".to_string(),
            description: None,
            starts_at: Utc::now().into(),
            ends_at: Utc::now().into(),
            status,
            results_published: false,
            created_by: "admin1".to_string(),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<election::Model>::new()])
                .into_connection(),
        );

        let repo = ElectionRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_recent() {
        let e1 = create_test_election("e1", ElectionStatus::Upcoming);
        let e2 = create_test_election("e2", ElectionStatus::Active);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[e2, e1]])
                .into_connection(),
        );

        let repo = ElectionRepository::new(db);
        let result = repo.find_recent(None, 10, 0).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "e2");
    }

    #[tokio::test]
    async fn test_transition_reports_matched_row() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 0,
                    },
                ])
                .into_connection(),
        );

        let repo = ElectionRepository::new(db);
        let first = repo
            .transition("e1", &[ElectionStatus::Upcoming], ElectionStatus::Nomination)
            .await
            .unwrap();
        let second = repo
            .transition("e1", &[ElectionStatus::Upcoming], ElectionStatus::Nomination)
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
    }
}
