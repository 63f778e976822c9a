//! Sequential voting session.
//!
//! A voter steps through every position still open to them, picks at most
//! one candidate per position, reviews the picks and submits them in one
//! request. The server keeps no session state: navigation happens in a
//! [`BallotDraft`] held by the client, and [`VotingSessionService::submit_batch`]
//! writes the whole ballot in a single transaction or not at all.

use std::collections::HashSet;
use std::sync::Arc;

use ballotbox_common::{AppError, AppResult, IdGenerator};
use ballotbox_db::entities::{candidate, position, vote};
use ballotbox_db::repositories::{
    CandidateRepository, ElectionRepository, PositionRepository, VoteRepository,
};
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::ballot::{find_election_position, load_active_election, record_vote};

/// One position's choice in a submitted ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotSelection {
    pub position_id: String,
    pub candidate_id: String,
}

/// A position with the candidates a voter can choose from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionBallot {
    pub position: position::Model,
    pub candidates: Vec<candidate::Model>,
}

/// Proof of a committed ballot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotReceipt {
    pub receipt_id: String,
    pub election_id: String,
    pub voter_id: String,
    pub votes: Vec<vote::Model>,
    pub submitted_at: DateTime<Utc>,
}

/// Service backing the step-through voting flow.
#[derive(Clone)]
pub struct VotingSessionService {
    db: Arc<DatabaseConnection>,
    election_repo: ElectionRepository,
    position_repo: PositionRepository,
    candidate_repo: CandidateRepository,
    vote_repo: VoteRepository,
    id_gen: IdGenerator,
}

impl VotingSessionService {
    /// Create a new voting session service.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            election_repo: ElectionRepository::new(db.clone()),
            position_repo: PositionRepository::new(db.clone()),
            candidate_repo: CandidateRepository::new(db.clone()),
            vote_repo: VoteRepository::new(db.clone()),
            db,
            id_gen: IdGenerator::new(),
        }
    }

    /// Positions the voter can still vote for, ordered by title.
    ///
    /// A position is listed when it has at least one approved candidate and
    /// the voter has not voted for it yet.
    pub async fn list_remaining_positions(
        &self,
        election_id: &str,
        voter_id: &str,
    ) -> AppResult<Vec<position::Model>> {
        self.election_repo.get_by_id(election_id).await?;

        let contested: HashSet<String> = self
            .candidate_repo
            .count_approved_by_election(election_id)
            .await?
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(position_id, _)| position_id)
            .collect();
        let voted: HashSet<String> = self
            .vote_repo
            .find_voted_position_ids(election_id, voter_id)
            .await?
            .into_iter()
            .collect();

        let mut remaining: Vec<position::Model> = self
            .position_repo
            .find_by_election(election_id)
            .await?
            .into_iter()
            .filter(|p| contested.contains(&p.id) && !voted.contains(&p.id))
            .collect();
        remaining.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));

        Ok(remaining)
    }

    /// A position and its approved candidates.
    pub async fn load_position_ballot(&self, position_id: &str) -> AppResult<PositionBallot> {
        let position = self.position_repo.get_by_id(position_id).await?;
        let candidates = self
            .candidate_repo
            .find_by_position(position_id, true)
            .await?;
        Ok(PositionBallot {
            position,
            candidates,
        })
    }

    /// Record a whole ballot atomically.
    ///
    /// Every selection is checked the way a single vote is, except that a
    /// position outside the election is a validation error. One bad entry
    /// rolls back the lot. Resubmitting a committed ballot fails with
    /// [`AppError::AlreadyVoted`].
    pub async fn submit_batch(
        &self,
        election_id: &str,
        voter_id: &str,
        selections: &[BallotSelection],
    ) -> AppResult<BallotReceipt> {
        if selections.is_empty() {
            return Err(AppError::Validation(
                "Ballot contains no selections".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(selections.len());
        for selection in selections {
            if !seen.insert(selection.position_id.as_str()) {
                return Err(AppError::DuplicateInBatch(selection.position_id.clone()));
            }
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let election = load_active_election(&txn, election_id).await?;
        let mut votes = Vec::with_capacity(selections.len());
        for selection in selections {
            let position = find_election_position(&txn, &election, &selection.position_id)
                .await?
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "Position is not part of this election: {}",
                        selection.position_id
                    ))
                })?;
            let vote = record_vote(
                &txn,
                &self.id_gen,
                &election,
                &position,
                voter_id,
                &selection.candidate_id,
            )
            .await?;
            votes.push(vote);
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(
            election_id = %election_id,
            voter_id = %voter_id,
            votes = votes.len(),
            "Ballot submitted"
        );

        Ok(BallotReceipt {
            receipt_id: self.id_gen.generate_receipt(),
            election_id: election_id.to_string(),
            voter_id: voter_id.to_string(),
            votes,
            submitted_at: Utc::now(),
        })
    }
}

/// Client-side state of a ballot being filled in.
///
/// Pure state machine: nothing here touches storage. Dropping a draft
/// leaves no trace.
#[derive(Debug, Clone)]
pub struct BallotDraft {
    election_id: String,
    steps: Vec<DraftStep>,
    cursor: usize,
}

#[derive(Debug, Clone)]
struct DraftStep {
    ballot: PositionBallot,
    selection: Option<String>,
}

impl BallotDraft {
    /// Start a draft over the given positions, in order.
    #[must_use]
    pub fn new(election_id: impl Into<String>, ballots: Vec<PositionBallot>) -> Self {
        Self {
            election_id: election_id.into(),
            steps: ballots
                .into_iter()
                .map(|ballot| DraftStep {
                    ballot,
                    selection: None,
                })
                .collect(),
            cursor: 0,
        }
    }

    /// The election this draft belongs to.
    #[must_use]
    pub fn election_id(&self) -> &str {
        &self.election_id
    }

    /// The position being filled in, or `None` on the review step.
    #[must_use]
    pub fn current(&self) -> Option<&PositionBallot> {
        self.steps.get(self.cursor).map(|step| &step.ballot)
    }

    /// The candidate picked for the current position.
    #[must_use]
    pub fn current_selection(&self) -> Option<&str> {
        self.steps
            .get(self.cursor)
            .and_then(|step| step.selection.as_deref())
    }

    /// Pick a candidate for the current position, replacing any earlier pick.
    pub fn select(&mut self, candidate_id: &str) -> AppResult<()> {
        let step = self
            .steps
            .get_mut(self.cursor)
            .ok_or_else(|| AppError::BadRequest("No position to vote for".to_string()))?;

        if !step.ballot.candidates.iter().any(|c| c.id == candidate_id) {
            return Err(AppError::UnknownCandidate(candidate_id.to_string()));
        }
        step.selection = Some(candidate_id.to_string());
        Ok(())
    }

    /// Drop the pick for the current position.
    pub fn clear(&mut self) {
        if let Some(step) = self.steps.get_mut(self.cursor) {
            step.selection = None;
        }
    }

    /// Move forward one step. Returns `false` when already on review.
    pub fn next(&mut self) -> bool {
        if self.cursor < self.steps.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Move back one step. Returns `false` on the first position.
    pub fn back(&mut self) -> bool {
        if self.cursor > 0 {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// Whether every position has been stepped past.
    #[must_use]
    pub fn is_review(&self) -> bool {
        self.cursor >= self.steps.len()
    }

    /// Picks made so far, in position order. Skipped positions are absent.
    #[must_use]
    pub fn selections(&self) -> Vec<BallotSelection> {
        self.steps
            .iter()
            .filter_map(|step| {
                step.selection.as_ref().map(|candidate_id| BallotSelection {
                    position_id: step.ballot.position.id.clone(),
                    candidate_id: candidate_id.clone(),
                })
            })
            .collect()
    }

    /// Finish the draft, yielding the batch to submit.
    pub fn into_batch(self) -> AppResult<Vec<BallotSelection>> {
        if !self.is_review() {
            return Err(AppError::BadRequest(
                "Review the ballot before submitting".to_string(),
            ));
        }
        let batch = self.selections();
        if batch.is_empty() {
            return Err(AppError::Validation(
                "Ballot contains no selections".to_string(),
            ));
        }
        Ok(batch)
    }
}
