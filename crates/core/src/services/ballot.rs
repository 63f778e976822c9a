//! Ballot casting service.
//!
//! Every vote goes through [`record_vote`], inside a database transaction:
//! the vote row is inserted first and the unique index on
//! (election, position, voter) decides whether the voter already voted,
//! then the candidate counter is bumped with `votes = votes + 1`. Either
//! both writes commit or neither does.

use std::collections::HashMap;
use std::sync::Arc;

use ballotbox_common::{AppError, AppResult, IdGenerator};
use ballotbox_db::entities::election::{self, ElectionStatus};
use ballotbox_db::entities::{position, vote};
use ballotbox_db::repositories::{
    CandidateRepository, ElectionRepository, PositionRepository, VoteRepository,
};
use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DatabaseConnection, Set, TransactionTrait};
use serde::Serialize;
use tracing::{info, warn};

use super::identity::Actor;

/// A candidate whose cached counter disagrees with its vote rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterDrift {
    pub candidate_id: String,
    pub position_id: String,
    /// Value of the cached counter.
    pub cached: i64,
    /// Number of vote rows.
    pub counted: i64,
}

/// Service for recording votes and keeping candidate counters honest.
#[derive(Clone)]
pub struct BallotService {
    db: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

impl BallotService {
    /// Create a new ballot service.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }

    /// Record one vote.
    ///
    /// Safe to retry: a repeated call fails with [`AppError::AlreadyVoted`]
    /// and changes nothing.
    pub async fn cast_vote(
        &self,
        election_id: &str,
        position_id: &str,
        voter_id: &str,
        candidate_id: &str,
    ) -> AppResult<vote::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let election = load_active_election(&txn, election_id).await?;
        let position = find_election_position(&txn, &election, position_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Position not found: {position_id}")))?;
        let vote = record_vote(
            &txn,
            &self.id_gen,
            &election,
            &position,
            voter_id,
            candidate_id,
        )
        .await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(
            election_id = %election_id,
            position_id = %position_id,
            voter_id = %voter_id,
            "Vote recorded"
        );
        Ok(vote)
    }

    /// List candidates whose counter differs from their vote rows.
    pub async fn audit_vote_counts(&self, election_id: &str) -> AppResult<Vec<CounterDrift>> {
        ElectionRepository::get_by_id_in(self.db.as_ref(), election_id).await?;
        find_drift(self.db.as_ref(), election_id).await
    }

    /// Rewrite drifted counters to the counted values.
    ///
    /// Returns the corrections that were applied.
    pub async fn reconcile_vote_counts(
        &self,
        actor: &Actor,
        election_id: &str,
    ) -> AppResult<Vec<CounterDrift>> {
        actor.require_admin()?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        ElectionRepository::get_by_id_in(&txn, election_id).await?;
        let drift = find_drift(&txn, election_id).await?;
        for entry in &drift {
            CandidateRepository::set_votes(&txn, &entry.candidate_id, entry.counted).await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if drift.is_empty() {
            info!(election_id = %election_id, "Vote counters consistent");
        } else {
            warn!(
                election_id = %election_id,
                corrected = drift.len(),
                admin = %actor.voter_id,
                "Vote counters repaired"
            );
        }
        Ok(drift)
    }
}

/// Read the election inside the transaction and require the voting phase.
pub(crate) async fn load_active_election<C: ConnectionTrait>(
    conn: &C,
    election_id: &str,
) -> AppResult<election::Model> {
    let election = ElectionRepository::get_by_id_in(conn, election_id).await?;
    if election.status != ElectionStatus::Active {
        return Err(AppError::PhaseError(format!(
            "Voting is not open: election is {}",
            election.status
        )));
    }
    Ok(election)
}

/// Look up a position that belongs to `election`.
pub(crate) async fn find_election_position<C: ConnectionTrait>(
    conn: &C,
    election: &election::Model,
    position_id: &str,
) -> AppResult<Option<position::Model>> {
    Ok(PositionRepository::find_by_id_in(conn, position_id)
        .await?
        .filter(|p| p.election_id == election.id))
}

/// Insert one vote and bump the candidate counter on `conn`.
///
/// `conn` must be a transaction; the caller commits.
pub(crate) async fn record_vote<C: ConnectionTrait>(
    conn: &C,
    id_gen: &IdGenerator,
    election: &election::Model,
    position: &position::Model,
    voter_id: &str,
    candidate_id: &str,
) -> AppResult<vote::Model> {
    let on_ballot = CandidateRepository::find_by_id_in(conn, candidate_id)
        .await?
        .is_some_and(|c| c.position_id == position.id && c.status.is_on_ballot());
    if !on_ballot {
        return Err(AppError::UnknownCandidate(candidate_id.to_string()));
    }

    let now: DateTime<Utc> = Utc::now();
    let vote = VoteRepository::insert_in(
        conn,
        vote::ActiveModel {
            id: Set(id_gen.generate()),
            election_id: Set(election.id.clone()),
            position_id: Set(position.id.clone()),
            voter_id: Set(voter_id.to_string()),
            candidate_id: Set(candidate_id.to_string()),
            created_at: Set(now.into()),
        },
    )
    .await?;

    if !CandidateRepository::increment_votes(conn, candidate_id).await? {
        return Err(AppError::UnknownCandidate(candidate_id.to_string()));
    }

    Ok(vote)
}

async fn find_drift<C: ConnectionTrait>(
    conn: &C,
    election_id: &str,
) -> AppResult<Vec<CounterDrift>> {
    let counted: HashMap<String, i64> = VoteRepository::count_by_candidate_in(conn, election_id)
        .await?
        .into_iter()
        .collect();

    let drift = CandidateRepository::find_by_election_in(conn, election_id)
        .await?
        .into_iter()
        .filter_map(|c| {
            let actual = counted.get(&c.id).copied().unwrap_or(0);
            (c.votes != actual).then(|| CounterDrift {
                candidate_id: c.id,
                position_id: c.position_id,
                cached: c.votes,
                counted: actual,
            })
        })
        .collect();

    Ok(drift)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

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

    #[tokio::test]
    async fn test_cast_vote_outside_voting_phase() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_election(ElectionStatus::Pending)]])
                .into_connection(),
        );
        let service = BallotService::new(db);

        let result = service.cast_vote("e1", "p1", "voter1", "c1").await;

        match result {
            Err(AppError::PhaseError(message)) => {
                assert!(message.starts_with("Voting is not open"));
            }
            other => panic!("expected phase error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reconcile_requires_admin() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = BallotService::new(db);

        let result = service
            .reconcile_vote_counts(&Actor::voter("voter1"), "e1")
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
