//! Election lifecycle service.
//!
//! Owns the election/position aggregate and its phase transitions:
//!
//! ```text
//! upcoming -> nomination -> pending -> active -> completed
//!     \___________\____________\_________\______> cancelled
//! ```
//!
//! `completed` and `cancelled` are terminal. Publishing results flips a flag
//! on a completed election without changing its phase.

use ballotbox_common::{AppError, AppResult, IdGenerator};
use ballotbox_db::entities::election::ElectionStatus;
use ballotbox_db::entities::{election, position};
use ballotbox_db::repositories::{ElectionRepository, PositionRepository};
use chrono::{DateTime, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use super::identity::Actor;

/// Maximum page size for election listings.
const MAX_LIST_LIMIT: u64 = 100;

/// Input for creating an election.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateElectionInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// Input for adding a position to an election.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddPositionInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[serde(default = "default_seats")]
    #[validate(range(min = 1))]
    pub seats: i32,
}

const fn default_seats() -> i32 {
    1
}

/// Input for editing a position.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePositionInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub seats: Option<i32>,
}

/// An election together with its positions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionWithPositions {
    pub election: election::Model,
    pub positions: Vec<position::Model>,
}

/// Service for election setup and phase transitions.
#[derive(Clone)]
pub struct ElectionService {
    election_repo: ElectionRepository,
    position_repo: PositionRepository,
    id_gen: IdGenerator,
}

impl ElectionService {
    /// Create a new election service.
    #[must_use]
    pub const fn new(election_repo: ElectionRepository, position_repo: PositionRepository) -> Self {
        Self {
            election_repo,
            position_repo,
            id_gen: IdGenerator::new(),
        }
    }

    // ==================== Setup ====================

    /// Create an election in the `upcoming` phase.
    pub async fn create_election(
        &self,
        actor: &Actor,
        input: CreateElectionInput,
    ) -> AppResult<election::Model> {
        actor.require_admin()?;
        input.validate()?;

        let title = trimmed_title(&input.title)?;
        if input.starts_at >= input.ends_at {
            return Err(AppError::Validation(
                "Election must start before it ends".to_string(),
            ));
        }

        let now = Utc::now();
        let model = election::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(title),
            description: Set(input.description),
            starts_at: Set(input.starts_at.into()),
            ends_at: Set(input.ends_at.into()),
            status: Set(ElectionStatus::Upcoming),
            results_published: Set(false),
            created_by: Set(actor.voter_id.clone()),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };

        let election = self.election_repo.create(model).await?;
        info!(
            election_id = %election.id,
            admin = %actor.voter_id,
            "Election created"
        );
        Ok(election)
    }

    /// Add a position to an upcoming election.
    pub async fn add_position(
        &self,
        actor: &Actor,
        election_id: &str,
        input: AddPositionInput,
    ) -> AppResult<position::Model> {
        actor.require_admin()?;
        input.validate()?;
        let title = trimmed_title(&input.title)?;

        let election = self.election_repo.get_by_id(election_id).await?;
        ensure_upcoming(&election)?;

        let model = position::ActiveModel {
            id: Set(self.id_gen.generate()),
            election_id: Set(election.id.clone()),
            title: Set(title),
            description: Set(input.description),
            seats: Set(input.seats),
            created_at: Set(Utc::now().into()),
        };

        let position = self.position_repo.create(model).await?;
        info!(
            election_id = %election.id,
            position_id = %position.id,
            seats = position.seats,
            "Position added"
        );
        Ok(position)
    }

    /// Edit a position while its election is still upcoming.
    pub async fn update_position(
        &self,
        actor: &Actor,
        position_id: &str,
        input: UpdatePositionInput,
    ) -> AppResult<position::Model> {
        actor.require_admin()?;
        input.validate()?;
        let title = input.title.as_deref().map(trimmed_title).transpose()?;

        let position = self.position_repo.get_by_id(position_id).await?;
        let election = self.election_repo.get_by_id(&position.election_id).await?;
        ensure_upcoming(&election)?;

        let mut active: position::ActiveModel = position.into();
        if let Some(title) = title {
            active.title = Set(title);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(seats) = input.seats {
            active.seats = Set(seats);
        }

        self.position_repo.update(active).await
    }

    /// Get an election by ID.
    pub async fn get_election(&self, election_id: &str) -> AppResult<election::Model> {
        self.election_repo.get_by_id(election_id).await
    }

    /// Get an election along with its positions.
    pub async fn get_with_positions(&self, election_id: &str) -> AppResult<ElectionWithPositions> {
        let election = self.election_repo.get_by_id(election_id).await?;
        let positions = self.position_repo.find_by_election(election_id).await?;
        Ok(ElectionWithPositions {
            election,
            positions,
        })
    }

    /// List elections, newest first.
    pub async fn list_elections(
        &self,
        status: Option<ElectionStatus>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<election::Model>> {
        self.election_repo
            .find_recent(status, limit.min(MAX_LIST_LIMIT), offset)
            .await
    }

    // ==================== Transitions ====================

    /// `upcoming` -> `nomination`.
    pub async fn open_nominations(
        &self,
        actor: &Actor,
        election_id: &str,
    ) -> AppResult<election::Model> {
        self.transition(
            actor,
            election_id,
            &[ElectionStatus::Upcoming],
            ElectionStatus::Nomination,
        )
        .await
    }

    /// `nomination` -> `pending`. Pending candidacies are left as they are.
    pub async fn close_nominations(
        &self,
        actor: &Actor,
        election_id: &str,
    ) -> AppResult<election::Model> {
        self.transition(
            actor,
            election_id,
            &[ElectionStatus::Nomination],
            ElectionStatus::Pending,
        )
        .await
    }

    /// `pending` -> `active`.
    pub async fn open_voting(&self, actor: &Actor, election_id: &str) -> AppResult<election::Model> {
        self.transition(
            actor,
            election_id,
            &[ElectionStatus::Pending],
            ElectionStatus::Active,
        )
        .await
    }

    /// `active` -> `completed`.
    pub async fn close_voting(
        &self,
        actor: &Actor,
        election_id: &str,
    ) -> AppResult<election::Model> {
        self.transition(
            actor,
            election_id,
            &[ElectionStatus::Active],
            ElectionStatus::Completed,
        )
        .await
    }

    /// Any non-terminal phase -> `cancelled`.
    pub async fn cancel(&self, actor: &Actor, election_id: &str) -> AppResult<election::Model> {
        self.transition(
            actor,
            election_id,
            &[
                ElectionStatus::Upcoming,
                ElectionStatus::Nomination,
                ElectionStatus::Pending,
                ElectionStatus::Active,
            ],
            ElectionStatus::Cancelled,
        )
        .await
    }

    /// Make the results of a completed election visible to voters.
    ///
    /// Publishing twice is a no-op.
    pub async fn publish_results(
        &self,
        actor: &Actor,
        election_id: &str,
    ) -> AppResult<election::Model> {
        actor.require_admin()?;

        let election = self.election_repo.get_by_id(election_id).await?;
        if election.status != ElectionStatus::Completed {
            return Err(AppError::InvalidTransition(format!(
                "results of a {} election cannot be published",
                election.status
            )));
        }
        if election.results_published {
            return Ok(election);
        }

        self.election_repo.publish_results(election_id).await?;
        info!(election_id = %election_id, admin = %actor.voter_id, "Results published");

        self.election_repo.get_by_id(election_id).await
    }

    /// Apply a phase change as a compare-and-set.
    ///
    /// When the conditional update matches nothing, the election is reloaded:
    /// already in `to` succeeds without side effects, anything else is an
    /// invalid transition.
    async fn transition(
        &self,
        actor: &Actor,
        election_id: &str,
        from: &[ElectionStatus],
        to: ElectionStatus,
    ) -> AppResult<election::Model> {
        actor.require_admin()?;

        if self.election_repo.transition(election_id, from, to).await? {
            info!(
                election_id = %election_id,
                status = %to,
                admin = %actor.voter_id,
                "Election phase changed"
            );
            return self.election_repo.get_by_id(election_id).await;
        }

        let election = self.election_repo.get_by_id(election_id).await?;
        if election.status == to {
            return Ok(election);
        }

        if election.status.is_terminal() {
            return Err(AppError::InvalidTransition(format!(
                "election is {} and can no longer change",
                election.status
            )));
        }
        Err(AppError::InvalidTransition(format!(
            "{} -> {}",
            election.status, to
        )))
    }
}

fn trimmed_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title cannot be blank".to_string()));
    }
    Ok(title.to_string())
}

fn ensure_upcoming(election: &election::Model) -> AppResult<()> {
    if election.status == ElectionStatus::Upcoming {
        Ok(())
    } else {
        Err(AppError::PhaseError(format!(
            "Positions can only be changed before nominations open: election is {}",
            election.status
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_election(id: &str, status: ElectionStatus) -> election::Model {
        election::Model {
            id: id.to_string(),
            title: "Annual general election".to_string(),
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

    fn service(db: MockDatabase) -> ElectionService {
        let db = Arc::new(db.into_connection());
        ElectionService::new(
            ElectionRepository::new(db.clone()),
            PositionRepository::new(db),
        )
    }

    #[tokio::test]
    async fn test_transition_requires_admin() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = service.open_nominations(&Actor::voter("v1"), "e1").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_transition_already_in_target_is_ok() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .append_query_results([[create_test_election("e1", ElectionStatus::Nomination)]]),
        );

        let election = service
            .open_nominations(&Actor::admin("admin1"), "e1")
            .await
            .unwrap();

        assert_eq!(election.status, ElectionStatus::Nomination);
    }

    #[tokio::test]
    async fn test_transition_from_wrong_phase() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .append_query_results([[create_test_election("e1", ElectionStatus::Completed)]]),
        );

        let result = service.open_voting(&Actor::admin("admin1"), "e1").await;

        match result {
            Err(AppError::InvalidTransition(message)) => {
                assert!(message.contains("can no longer change"));
            }
            other => panic!("expected invalid transition, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transition_from_earlier_phase_names_both_states() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .append_query_results([[create_test_election("e1", ElectionStatus::Upcoming)]]),
        );

        let result = service.open_voting(&Actor::admin("admin1"), "e1").await;

        match result {
            Err(AppError::InvalidTransition(message)) => {
                assert_eq!(message, "upcoming -> active");
            }
            other => panic!("expected invalid transition, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_election_rejects_inverted_dates() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));
        let now = Utc::now();

        let result = service
            .create_election(
                &Actor::admin("admin1"),
                CreateElectionInput {
                    title: "Board".to_string(),
                    description: None,
                    starts_at: now,
                    ends_at: now - chrono::Duration::days(1),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_add_position_after_nominations_open() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_election("e1", ElectionStatus::Nomination)]]),
        );

        let result = service
            .add_position(
                &Actor::admin("admin1"),
                "e1",
                AddPositionInput {
                    title: "Secretary".to_string(),
                    description: None,
                    seats: 1,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::PhaseError(_))));
    }

    #[tokio::test]
    async fn test_add_position_rejects_zero_seats() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = service
            .add_position(
                &Actor::admin("admin1"),
                "e1",
                AddPositionInput {
                    title: "Secretary".to_string(),
                    description: None,
                    seats: 0,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_blank_position_title_is_rejected() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));
        let admin = Actor::admin("admin1");

        let added = service
            .add_position(
                &admin,
                "e1",
                AddPositionInput {
                    title: "   ".to_string(),
                    description: None,
                    seats: 1,
                },
            )
            .await;
        let updated = service
            .update_position(
                &admin,
                "p1",
                UpdatePositionInput {
                    title: Some("\t ".to_string()),
                    ..UpdatePositionInput::default()
                },
            )
            .await;

        assert!(matches!(added, Err(AppError::Validation(_))));
        assert!(matches!(updated, Err(AppError::Validation(_))));
    }
}
