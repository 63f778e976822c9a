//! Candidacy registry service.

use ballotbox_common::{AppError, AppResult, IdGenerator};
use ballotbox_db::entities::candidate::{self, CandidateStatus};
use ballotbox_db::entities::election::{self, ElectionStatus};
use ballotbox_db::repositories::{CandidateRepository, ElectionRepository, PositionRepository};
use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::identity::Actor;

/// Input for standing as a candidate.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCandidateInput {
    pub position_id: String,
    #[validate(length(max = 4000))]
    pub manifesto: Option<String>,
}

/// Service for candidate applications.
#[derive(Clone)]
pub struct CandidacyService {
    candidate_repo: CandidateRepository,
    position_repo: PositionRepository,
    election_repo: ElectionRepository,
    id_gen: IdGenerator,
}

impl CandidacyService {
    /// Create a new candidacy service.
    #[must_use]
    pub const fn new(
        candidate_repo: CandidateRepository,
        position_repo: PositionRepository,
        election_repo: ElectionRepository,
    ) -> Self {
        Self {
            candidate_repo,
            position_repo,
            election_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Apply to stand for a position while nominations are open.
    ///
    /// A voter gets one candidacy per position. Withdrawn or rejected
    /// candidacies still count, so re-applying fails with
    /// [`AppError::DuplicateCandidacy`].
    pub async fn register_candidate(
        &self,
        voter_id: &str,
        input: RegisterCandidateInput,
    ) -> AppResult<candidate::Model> {
        input.validate()?;

        let position = self.position_repo.get_by_id(&input.position_id).await?;
        let election = self.election_repo.get_by_id(&position.election_id).await?;
        if election.status != ElectionStatus::Nomination {
            return Err(AppError::PhaseError(format!(
                "Nominations are not open: election is {}",
                election.status
            )));
        }

        let model = candidate::ActiveModel {
            id: Set(self.id_gen.generate()),
            position_id: Set(position.id.clone()),
            voter_id: Set(voter_id.to_string()),
            manifesto: Set(input.manifesto),
            status: Set(CandidateStatus::Pending),
            votes: Set(0),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let candidate = self.candidate_repo.create(model).await?;
        info!(
            candidate_id = %candidate.id,
            position_id = %position.id,
            voter_id = %voter_id,
            "Candidacy registered"
        );
        Ok(candidate)
    }

    /// Put a pending candidate on the ballot.
    pub async fn approve(&self, actor: &Actor, candidate_id: &str) -> AppResult<candidate::Model> {
        self.review(actor, candidate_id, CandidateStatus::Approved)
            .await
    }

    /// Turn down a pending candidate.
    pub async fn reject(&self, actor: &Actor, candidate_id: &str) -> AppResult<candidate::Model> {
        self.review(actor, candidate_id, CandidateStatus::Rejected)
            .await
    }

    /// Pull out of the race. Only the candidate may withdraw, and only while
    /// nominations are open.
    pub async fn withdraw(&self, candidate_id: &str, voter_id: &str) -> AppResult<candidate::Model> {
        let candidate = self.candidate_repo.get_by_id(candidate_id).await?;
        if candidate.voter_id != voter_id {
            return Err(AppError::Forbidden(
                "Only the candidate can withdraw a candidacy".to_string(),
            ));
        }

        let election = self.election_for(&candidate).await?;
        if election.status != ElectionStatus::Nomination {
            return Err(AppError::PhaseError(format!(
                "Candidacies can only be withdrawn during nominations: election is {}",
                election.status
            )));
        }

        let withdrawn = self
            .candidate_repo
            .transition(
                candidate_id,
                &[
                    CandidateStatus::Pending,
                    CandidateStatus::Approved,
                    CandidateStatus::Rejected,
                ],
                CandidateStatus::Withdrawn,
            )
            .await?;
        if !withdrawn {
            return Err(AppError::InvalidTransition(
                "candidacy is already withdrawn".to_string(),
            ));
        }

        info!(candidate_id = %candidate_id, voter_id = %voter_id, "Candidacy withdrawn");
        self.candidate_repo.get_by_id(candidate_id).await
    }

    /// List the candidates of a position.
    ///
    /// Voters see approved candidates only. Administrators may pass
    /// `include_all` to see every status.
    pub async fn list_candidates(
        &self,
        actor: &Actor,
        position_id: &str,
        include_all: bool,
    ) -> AppResult<Vec<candidate::Model>> {
        if include_all {
            actor.require_admin()?;
        }

        self.position_repo.get_by_id(position_id).await?;
        self.candidate_repo
            .find_by_position(position_id, !include_all)
            .await
    }

    async fn review(
        &self,
        actor: &Actor,
        candidate_id: &str,
        decision: CandidateStatus,
    ) -> AppResult<candidate::Model> {
        actor.require_admin()?;

        let candidate = self.candidate_repo.get_by_id(candidate_id).await?;
        let election = self.election_for(&candidate).await?;
        if !matches!(
            election.status,
            ElectionStatus::Nomination | ElectionStatus::Pending
        ) {
            return Err(AppError::PhaseError(format!(
                "Candidacies can only be reviewed before voting opens: election is {}",
                election.status
            )));
        }

        let changed = self
            .candidate_repo
            .transition(candidate_id, &[CandidateStatus::Pending], decision)
            .await?;
        if !changed {
            let current = self.candidate_repo.get_by_id(candidate_id).await?;
            return Err(AppError::InvalidTransition(format!(
                "{} -> {}",
                current.status, decision
            )));
        }

        info!(
            candidate_id = %candidate_id,
            status = %decision,
            admin = %actor.voter_id,
            "Candidacy reviewed"
        );
        self.candidate_repo.get_by_id(candidate_id).await
    }

    async fn election_for(&self, candidate: &candidate::Model) -> AppResult<election::Model> {
        let position = self.position_repo.get_by_id(&candidate.position_id).await?;
        self.election_repo.get_by_id(&position.election_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ballotbox_db::entities::position;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_candidate(id: &str, voter_id: &str, status: CandidateStatus) -> candidate::Model {
        candidate::Model {
            id: id.to_string(),
            position_id: "p1".to_string(),
            voter_id: voter_id.to_string(),
            manifesto: None,
            status,
            votes: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_position() -> position::Model {
        position::Model {
            id: "p1".to_string(),
            election_id: "e1".to_string(),
            title: "Chair".to_string(),
            description: None,
            seats: 1,
            created_at: Utc::now().into(),
        }
    }

    fn create_test_election(status: ElectionStatus) -> election::Model {
        election::Model {
            id: "e1".to_string(),
            title: "Board".to_string(),
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

    fn service(db: MockDatabase) -> CandidacyService {
        let db = Arc::new(db.into_connection());
        CandidacyService::new(
            CandidateRepository::new(db.clone()),
            PositionRepository::new(db.clone()),
            ElectionRepository::new(db),
        )
    }

    #[tokio::test]
    async fn test_register_outside_nomination() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_position()]])
                .append_query_results([[create_test_election(ElectionStatus::Active)]]),
        );

        let result = service
            .register_candidate(
                "voter1",
                RegisterCandidateInput {
                    position_id: "p1".to_string(),
                    manifesto: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::PhaseError(_))));
    }

    #[tokio::test]
    async fn test_withdraw_by_other_voter() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[
                create_test_candidate("c1", "voter1", CandidateStatus::Pending),
            ]]),
        );

        let result = service.withdraw("c1", "voter2").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_approve_requires_admin() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = service.approve(&Actor::voter("voter1"), "c1").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_approve_during_voting_is_phase_error() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_candidate(
                    "c1",
                    "voter1",
                    CandidateStatus::Pending,
                )]])
                .append_query_results([[create_test_position()]])
                .append_query_results([[create_test_election(ElectionStatus::Active)]]),
        );

        let result = service.approve(&Actor::admin("admin1"), "c1").await;

        assert!(matches!(result, Err(AppError::PhaseError(_))));
    }

    #[tokio::test]
    async fn test_list_all_statuses_requires_admin() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = service
            .list_candidates(&Actor::voter("voter1"), "p1", true)
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
