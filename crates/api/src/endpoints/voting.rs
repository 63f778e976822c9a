//! Voting endpoints.

use axum::{Json, Router, extract::State, routing::post};
use ballotbox_common::AppResult;
use ballotbox_core::{BallotReceipt, BallotSelection, PositionBallot};
use ballotbox_db::entities::vote;
use serde::{Deserialize, Serialize};

use super::candidates::CandidateResponse;
use super::elections::PositionResponse;
use crate::{extractors::AuthVoter, middleware::AppState, response::ApiResponse};

// ==================== Request/Response Types ====================

/// Vote response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub id: String,
    pub election_id: String,
    pub position_id: String,
    pub candidate_id: String,
    pub created_at: String,
}

impl From<vote::Model> for VoteResponse {
    fn from(v: vote::Model) -> Self {
        Self {
            id: v.id,
            election_id: v.election_id,
            position_id: v.position_id,
            candidate_id: v.candidate_id,
            created_at: v.created_at.to_rfc3339(),
        }
    }
}

/// A position with its approved candidates.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionBallotResponse {
    pub position: PositionResponse,
    pub candidates: Vec<CandidateResponse>,
}

impl From<PositionBallot> for PositionBallotResponse {
    fn from(b: PositionBallot) -> Self {
        Self {
            position: b.position.into(),
            candidates: b.candidates.into_iter().map(Into::into).collect(),
        }
    }
}

/// Receipt for a submitted ballot.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptResponse {
    pub receipt_id: String,
    pub election_id: String,
    pub votes: Vec<VoteResponse>,
    pub submitted_at: String,
}

impl From<BallotReceipt> for ReceiptResponse {
    fn from(r: BallotReceipt) -> Self {
        Self {
            receipt_id: r.receipt_id,
            election_id: r.election_id,
            votes: r.votes.into_iter().map(Into::into).collect(),
            submitted_at: r.submitted_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub election_id: String,
    pub position_id: String,
    pub candidate_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemainingRequest {
    pub election_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotRequest {
    pub position_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBallotRequest {
    pub election_id: String,
    pub selections: Vec<BallotSelection>,
}

// ==================== Handlers ====================

/// Cast a single vote as the caller.
async fn cast(
    AuthVoter(actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<CastVoteRequest>,
) -> AppResult<ApiResponse<VoteResponse>> {
    let vote = state
        .ballot_service
        .cast_vote(
            &req.election_id,
            &req.position_id,
            &actor.voter_id,
            &req.candidate_id,
        )
        .await?;

    Ok(ApiResponse::ok(vote.into()))
}

/// Positions the caller has yet to vote for.
async fn remaining(
    AuthVoter(actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<RemainingRequest>,
) -> AppResult<ApiResponse<Vec<PositionResponse>>> {
    let positions = state
        .voting_session_service
        .list_remaining_positions(&req.election_id, &actor.voter_id)
        .await?;

    Ok(ApiResponse::ok(
        positions.into_iter().map(Into::into).collect(),
    ))
}

async fn ballot(
    AuthVoter(_actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<BallotRequest>,
) -> AppResult<ApiResponse<PositionBallotResponse>> {
    let ballot = state
        .voting_session_service
        .load_position_ballot(&req.position_id)
        .await?;

    Ok(ApiResponse::ok(ballot.into()))
}

/// Submit a whole ballot in one go.
async fn submit(
    AuthVoter(actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<SubmitBallotRequest>,
) -> AppResult<ApiResponse<ReceiptResponse>> {
    let receipt = state
        .voting_session_service
        .submit_batch(&req.election_id, &actor.voter_id, &req.selections)
        .await?;

    Ok(ApiResponse::ok(receipt.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cast", post(cast))
        .route("/remaining", post(remaining))
        .route("/ballot", post(ballot))
        .route("/submit", post(submit))
}
