//! Position repository.

use std::sync::Arc;

use ballotbox_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};

use crate::entities::{Position, position};

/// Position repository for database operations.
#[derive(Clone)]
pub struct PositionRepository {
    db: Arc<DatabaseConnection>,
}

impl PositionRepository {
    /// Create a new position repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a position by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<position::Model>> {
        Self::find_by_id_in(self.db.as_ref(), id).await
    }

    /// Find a position by ID on the given connection or transaction.
    pub async fn find_by_id_in<C: ConnectionTrait>(
        conn: &C,
        id: &str,
    ) -> AppResult<Option<position::Model>> {
        Position::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a position by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<position::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Position not found: {id}")))
    }

    /// Create a new position.
    pub async fn create(&self, model: position::ActiveModel) -> AppResult<position::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a position.
    pub async fn update(&self, model: position::ActiveModel) -> AppResult<position::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List the positions of an election in creation order.
    pub async fn find_by_election(&self, election_id: &str) -> AppResult<Vec<position::Model>> {
        Position::find()
            .filter(position::Column::ElectionId.eq(election_id))
            .order_by_asc(position::Column::CreatedAt)
            .order_by_asc(position::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_position(id: &str, election_id: &str) -> position::Model {
        position::Model {
            id: id.to_string(),
            election_id: election_id.to_string(),
            title: "Treasurer".to_string(),
            description: None,
            seats: 1,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_election() {
        let p1 = create_test_position("p1", "e1");
        let p2 = create_test_position("p2", "e1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[p1, p2]])
                .into_connection(),
        );

        let repo = PositionRepository::new(db);
        let result = repo.find_by_election("e1").await.unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|p| p.election_id == "e1"));
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<position::Model>::new()])
                .into_connection(),
        );

        let repo = PositionRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
