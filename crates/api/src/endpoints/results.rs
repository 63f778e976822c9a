//! Results and monitoring endpoints.

use axum::{Json, Router, extract::State, routing::post};
use ballotbox_common::AppResult;
use ballotbox_core::{CounterDrift, ElectionResults, PositionTally, Turnout};
use serde::{Deserialize, Serialize};

use super::elections::ElectionResponse;
use crate::{extractors::AuthVoter, middleware::AppState, response::ApiResponse};

/// Results of a whole election.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionResultsResponse {
    pub election: ElectionResponse,
    pub positions: Vec<PositionTally>,
    pub total_votes: u64,
    pub voters: u64,
}

impl From<ElectionResults> for ElectionResultsResponse {
    fn from(r: ElectionResults) -> Self {
        Self {
            election: r.election.into(),
            positions: r.positions,
            total_votes: r.total_votes,
            voters: r.voters,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyRequest {
    pub position_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionIdRequest {
    pub election_id: String,
}

async fn tally(
    AuthVoter(actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<TallyRequest>,
) -> AppResult<ApiResponse<PositionTally>> {
    let tally = state
        .tally_service
        .position_tally_for(&actor, &req.position_id)
        .await?;

    Ok(ApiResponse::ok(tally))
}

async fn turnout(
    AuthVoter(_actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<ElectionIdRequest>,
) -> AppResult<ApiResponse<Turnout>> {
    let turnout = state
        .tally_service
        .election_turnout(&req.election_id)
        .await?;

    Ok(ApiResponse::ok(turnout))
}

async fn election(
    AuthVoter(actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<ElectionIdRequest>,
) -> AppResult<ApiResponse<ElectionResultsResponse>> {
    let results = state
        .tally_service
        .election_results(&actor, &req.election_id)
        .await?;

    Ok(ApiResponse::ok(results.into()))
}

/// Compare cached counters with vote rows (admin only).
async fn audit(
    AuthVoter(actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<ElectionIdRequest>,
) -> AppResult<ApiResponse<Vec<CounterDrift>>> {
    actor.require_admin()?;
    let drift = state
        .ballot_service
        .audit_vote_counts(&req.election_id)
        .await?;

    Ok(ApiResponse::ok(drift))
}

/// Rewrite drifted counters (admin only).
async fn reconcile(
    AuthVoter(actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<ElectionIdRequest>,
) -> AppResult<ApiResponse<Vec<CounterDrift>>> {
    let repaired = state
        .ballot_service
        .reconcile_vote_counts(&actor, &req.election_id)
        .await?;

    Ok(ApiResponse::ok(repaired))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tally", post(tally))
        .route("/turnout", post(turnout))
        .route("/election", post(election))
        .route("/audit", post(audit))
        .route("/reconcile", post(reconcile))
}
