//! Tally and turnout reporting.
//!
//! Read-only. Counts come from the candidate counters the ballot service
//! maintains; turnout counts distinct voters in the vote table.

use ballotbox_common::{AppError, AppResult};
use ballotbox_db::entities::election::{self, ElectionStatus};
use ballotbox_db::entities::position;
use ballotbox_db::repositories::{
    CandidateRepository, ElectionRepository, PositionRepository, VoteRepository,
};
use serde::Serialize;

use super::eligibility::EligibilityService;
use super::identity::Actor;

/// One candidate's line in a position tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyRow {
    pub candidate_id: String,
    pub voter_id: String,
    pub votes: i64,
    /// 1-based place; ties keep candidate ID order.
    pub rank: u32,
    /// Whether the place falls within the position's seats.
    pub elected: bool,
}

/// Results for one position.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionTally {
    pub position_id: String,
    pub title: String,
    pub seats: i32,
    pub rows: Vec<TallyRow>,
}

/// Participation in an election.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Turnout {
    pub election_id: String,
    pub voters: u64,
    pub eligible: u64,
    pub percentage: f64,
}

/// Results for a whole election.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionResults {
    pub election: election::Model,
    pub positions: Vec<PositionTally>,
    pub total_votes: u64,
    pub voters: u64,
}

/// Service for results and live monitoring.
#[derive(Clone)]
pub struct TallyService {
    election_repo: ElectionRepository,
    position_repo: PositionRepository,
    candidate_repo: CandidateRepository,
    vote_repo: VoteRepository,
    eligibility: EligibilityService,
}

impl TallyService {
    /// Create a new tally service.
    #[must_use]
    pub const fn new(
        election_repo: ElectionRepository,
        position_repo: PositionRepository,
        candidate_repo: CandidateRepository,
        vote_repo: VoteRepository,
        eligibility: EligibilityService,
    ) -> Self {
        Self {
            election_repo,
            position_repo,
            candidate_repo,
            vote_repo,
            eligibility,
        }
    }

    /// Approved candidates of a position, most votes first.
    pub async fn position_tally(&self, position_id: &str) -> AppResult<PositionTally> {
        let position = self.position_repo.get_by_id(position_id).await?;
        self.tally_for(position).await
    }

    /// Position tally as seen by `actor`, subject to the same visibility
    /// rule as [`Self::election_results`].
    pub async fn position_tally_for(
        &self,
        actor: &Actor,
        position_id: &str,
    ) -> AppResult<PositionTally> {
        let position = self.position_repo.get_by_id(position_id).await?;
        let election = self.election_repo.get_by_id(&position.election_id).await?;
        ensure_results_visible(actor, &election)?;
        self.tally_for(position).await
    }

    /// Turnout against the eligible count reported by the membership source.
    pub async fn election_turnout(&self, election_id: &str) -> AppResult<Turnout> {
        let election = self.election_repo.get_by_id(election_id).await?;
        let eligible = self.eligibility.eligible_voters(&election).await?;
        self.turnout_against(election_id, eligible).await
    }

    /// Turnout against an explicit eligible count.
    pub async fn turnout_against(&self, election_id: &str, eligible: u64) -> AppResult<Turnout> {
        let voters = self.vote_repo.count_distinct_voters(election_id).await?;
        Ok(Turnout {
            election_id: election_id.to_string(),
            voters,
            eligible,
            percentage: turnout_percentage(voters, eligible),
        })
    }

    /// Full results of an election.
    ///
    /// Voters may read them once the election is completed and its results
    /// are published. Administrators may read them at any time.
    pub async fn election_results(
        &self,
        actor: &Actor,
        election_id: &str,
    ) -> AppResult<ElectionResults> {
        let election = self.election_repo.get_by_id(election_id).await?;
        ensure_results_visible(actor, &election)?;

        let mut positions = self.position_repo.find_by_election(election_id).await?;
        positions.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));

        let mut tallies = Vec::with_capacity(positions.len());
        for position in positions {
            tallies.push(self.tally_for(position).await?);
        }

        let total_votes = self.vote_repo.count_by_election(election_id).await?;
        let voters = self.vote_repo.count_distinct_voters(election_id).await?;

        Ok(ElectionResults {
            election,
            positions: tallies,
            total_votes,
            voters,
        })
    }

    async fn tally_for(&self, position: position::Model) -> AppResult<PositionTally> {
        let candidates = self
            .candidate_repo
            .find_ranked_by_position(&position.id)
            .await?;
        let seats = u32::try_from(position.seats).unwrap_or(0);

        let rows = candidates
            .into_iter()
            .zip(1u32..)
            .map(|(candidate, rank)| TallyRow {
                candidate_id: candidate.id,
                voter_id: candidate.voter_id,
                votes: candidate.votes,
                rank,
                elected: rank <= seats,
            })
            .collect();

        Ok(PositionTally {
            position_id: position.id,
            title: position.title,
            seats: position.seats,
            rows,
        })
    }
}

fn ensure_results_visible(actor: &Actor, election: &election::Model) -> AppResult<()> {
    let published = election.status == ElectionStatus::Completed && election.results_published;
    if published || actor.is_admin {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Results have not been published".to_string(),
        ))
    }
}

/// Distinct voters as a percentage of eligible voters; zero when nobody is
/// eligible.
#[must_use]
pub fn turnout_percentage(voters: u64, eligible: u64) -> f64 {
    if eligible == 0 {
        0.0
    } else {
        voters as f64 / eligible as f64 * 100.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::eligibility::FixedEligibility;
    use ballotbox_db::entities::candidate::{self, CandidateStatus};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    #[test]
    fn test_turnout_percentage() {
        assert_eq!(turnout_percentage(0, 0), 0.0);
        assert_eq!(turnout_percentage(5, 0), 0.0);
        assert_eq!(turnout_percentage(50, 200), 25.0);
        assert_eq!(turnout_percentage(200, 200), 100.0);
    }

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
    async fn test_position_tally_marks_elected_by_seats() {
        let position = position::Model {
            id: "p1".to_string(),
            election_id: "e1".to_string(),
            title: "Committee".to_string(),
            description: None,
            seats: 2,
            created_at: Utc::now().into(),
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[position]])
                .append_query_results([[
                    create_test_candidate("c2", 7),
                    create_test_candidate("c1", 4),
                    create_test_candidate("c3", 1),
                ]])
                .into_connection(),
        );
        let service = TallyService::new(
            ElectionRepository::new(db.clone()),
            PositionRepository::new(db.clone()),
            CandidateRepository::new(db.clone()),
            VoteRepository::new(db),
            Arc::new(FixedEligibility::new(0)),
        );

        let tally = service.position_tally("p1").await.unwrap();

        let ranks: Vec<_> = tally.rows.iter().map(|r| (r.rank, r.elected)).collect();
        assert_eq!(ranks, vec![(1, true), (2, true), (3, false)]);
        assert_eq!(tally.rows[0].candidate_id, "c2");
    }
}
