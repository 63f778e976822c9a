//! Candidacy endpoints.

use axum::{Json, Router, extract::State, routing::post};
use ballotbox_common::AppResult;
use ballotbox_core::RegisterCandidateInput;
use ballotbox_db::entities::candidate::{self, CandidateStatus};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthVoter, middleware::AppState, response::ApiResponse};

/// Candidate response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResponse {
    pub id: String,
    pub position_id: String,
    pub voter_id: String,
    pub manifesto: Option<String>,
    pub status: CandidateStatus,
    pub votes: i64,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<candidate::Model> for CandidateResponse {
    fn from(c: candidate::Model) -> Self {
        Self {
            id: c.id,
            position_id: c.position_id,
            voter_id: c.voter_id,
            manifesto: c.manifesto,
            status: c.status,
            votes: c.votes,
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateIdRequest {
    pub candidate_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCandidatesRequest {
    pub position_id: String,
    /// Include pending, rejected and withdrawn candidacies (admin only).
    #[serde(default)]
    pub include_all: bool,
}

/// Stand for a position.
async fn register(
    AuthVoter(actor): AuthVoter,
    State(state): State<AppState>,
    Json(input): Json<RegisterCandidateInput>,
) -> AppResult<ApiResponse<CandidateResponse>> {
    let candidate = state
        .candidacy_service
        .register_candidate(&actor.voter_id, input)
        .await?;

    Ok(ApiResponse::ok(candidate.into()))
}

async fn approve(
    AuthVoter(actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<CandidateIdRequest>,
) -> AppResult<ApiResponse<CandidateResponse>> {
    let candidate = state
        .candidacy_service
        .approve(&actor, &req.candidate_id)
        .await?;

    Ok(ApiResponse::ok(candidate.into()))
}

async fn reject(
    AuthVoter(actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<CandidateIdRequest>,
) -> AppResult<ApiResponse<CandidateResponse>> {
    let candidate = state
        .candidacy_service
        .reject(&actor, &req.candidate_id)
        .await?;

    Ok(ApiResponse::ok(candidate.into()))
}

/// Withdraw the caller's own candidacy.
async fn withdraw(
    AuthVoter(actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<CandidateIdRequest>,
) -> AppResult<ApiResponse<CandidateResponse>> {
    let candidate = state
        .candidacy_service
        .withdraw(&req.candidate_id, &actor.voter_id)
        .await?;

    Ok(ApiResponse::ok(candidate.into()))
}

/// List the candidates of a position.
async fn list(
    AuthVoter(actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<ListCandidatesRequest>,
) -> AppResult<ApiResponse<Vec<CandidateResponse>>> {
    let candidates = state
        .candidacy_service
        .list_candidates(&actor, &req.position_id, req.include_all)
        .await?;

    Ok(ApiResponse::ok(
        candidates.into_iter().map(Into::into).collect(),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/approve", post(approve))
        .route("/reject", post(reject))
        .route("/withdraw", post(withdraw))
        .route("/list", post(list))
}
