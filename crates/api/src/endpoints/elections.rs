//! Election endpoints.

use axum::{Json, Router, extract::State, routing::post};
use ballotbox_common::AppResult;
use ballotbox_core::{AddPositionInput, CreateElectionInput, ElectionWithPositions, UpdatePositionInput};
use ballotbox_db::entities::election::ElectionStatus;
use ballotbox_db::entities::{election, position};
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthVoter, middleware::AppState, response::ApiResponse};

// ==================== Request/Response Types ====================

/// Election response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: String,
    pub ends_at: String,
    pub status: ElectionStatus,
    pub results_published: bool,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<election::Model> for ElectionResponse {
    fn from(e: election::Model) -> Self {
        Self {
            id: e.id,
            title: e.title,
            description: e.description,
            starts_at: e.starts_at.to_rfc3339(),
            ends_at: e.ends_at.to_rfc3339(),
            status: e.status,
            results_published: e.results_published,
            created_by: e.created_by,
            created_at: e.created_at.to_rfc3339(),
            updated_at: e.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Position response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionResponse {
    pub id: String,
    pub election_id: String,
    pub title: String,
    pub description: Option<String>,
    pub seats: i32,
    pub created_at: String,
}

impl From<position::Model> for PositionResponse {
    fn from(p: position::Model) -> Self {
        Self {
            id: p.id,
            election_id: p.election_id,
            title: p.title,
            description: p.description,
            seats: p.seats,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

/// Election with its positions.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowElectionResponse {
    #[serde(flatten)]
    pub election: ElectionResponse,
    pub positions: Vec<PositionResponse>,
}

impl From<ElectionWithPositions> for ShowElectionResponse {
    fn from(e: ElectionWithPositions) -> Self {
        Self {
            election: e.election.into(),
            positions: e.positions.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionIdRequest {
    pub election_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListElectionsRequest {
    pub status: Option<ElectionStatus>,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

const fn default_limit() -> u64 {
    10
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePositionRequest {
    pub election_id: String,
    #[serde(flatten)]
    pub input: AddPositionInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePositionRequest {
    pub position_id: String,
    #[serde(flatten)]
    pub input: UpdatePositionInput,
}

// ==================== Handlers ====================

/// Create an election.
async fn create(
    AuthVoter(actor): AuthVoter,
    State(state): State<AppState>,
    Json(input): Json<CreateElectionInput>,
) -> AppResult<ApiResponse<ElectionResponse>> {
    let election = state.election_service.create_election(&actor, input).await?;

    Ok(ApiResponse::ok(election.into()))
}

/// Show an election and its positions.
async fn show(
    AuthVoter(_actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<ElectionIdRequest>,
) -> AppResult<ApiResponse<ShowElectionResponse>> {
    let election = state
        .election_service
        .get_with_positions(&req.election_id)
        .await?;

    Ok(ApiResponse::ok(election.into()))
}

/// List elections, newest first.
async fn list(
    AuthVoter(_actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<ListElectionsRequest>,
) -> AppResult<ApiResponse<Vec<ElectionResponse>>> {
    let elections = state
        .election_service
        .list_elections(req.status, req.limit, req.offset)
        .await?;

    Ok(ApiResponse::ok(
        elections.into_iter().map(Into::into).collect(),
    ))
}

/// Add a position.
async fn create_position(
    AuthVoter(actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<CreatePositionRequest>,
) -> AppResult<ApiResponse<PositionResponse>> {
    let position = state
        .election_service
        .add_position(&actor, &req.election_id, req.input)
        .await?;

    Ok(ApiResponse::ok(position.into()))
}

/// Edit a position.
async fn update_position(
    AuthVoter(actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<UpdatePositionRequest>,
) -> AppResult<ApiResponse<PositionResponse>> {
    let position = state
        .election_service
        .update_position(&actor, &req.position_id, req.input)
        .await?;

    Ok(ApiResponse::ok(position.into()))
}

async fn open_nominations(
    AuthVoter(actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<ElectionIdRequest>,
) -> AppResult<ApiResponse<ElectionResponse>> {
    let election = state
        .election_service
        .open_nominations(&actor, &req.election_id)
        .await?;

    Ok(ApiResponse::ok(election.into()))
}

async fn close_nominations(
    AuthVoter(actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<ElectionIdRequest>,
) -> AppResult<ApiResponse<ElectionResponse>> {
    let election = state
        .election_service
        .close_nominations(&actor, &req.election_id)
        .await?;

    Ok(ApiResponse::ok(election.into()))
}

async fn open_voting(
    AuthVoter(actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<ElectionIdRequest>,
) -> AppResult<ApiResponse<ElectionResponse>> {
    let election = state
        .election_service
        .open_voting(&actor, &req.election_id)
        .await?;

    Ok(ApiResponse::ok(election.into()))
}

async fn close_voting(
    AuthVoter(actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<ElectionIdRequest>,
) -> AppResult<ApiResponse<ElectionResponse>> {
    let election = state
        .election_service
        .close_voting(&actor, &req.election_id)
        .await?;

    Ok(ApiResponse::ok(election.into()))
}

/// Make results visible to voters.
async fn publish_results(
    AuthVoter(actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<ElectionIdRequest>,
) -> AppResult<ApiResponse<ElectionResponse>> {
    let election = state
        .election_service
        .publish_results(&actor, &req.election_id)
        .await?;

    Ok(ApiResponse::ok(election.into()))
}

async fn cancel(
    AuthVoter(actor): AuthVoter,
    State(state): State<AppState>,
    Json(req): Json<ElectionIdRequest>,
) -> AppResult<ApiResponse<ElectionResponse>> {
    let election = state
        .election_service
        .cancel(&actor, &req.election_id)
        .await?;

    Ok(ApiResponse::ok(election.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        // Setup
        .route("/create", post(create))
        .route("/show", post(show))
        .route("/list", post(list))
        .route("/positions/create", post(create_position))
        .route("/positions/update", post(update_position))
        // Phases
        .route("/open-nominations", post(open_nominations))
        .route("/close-nominations", post(close_nominations))
        .route("/open-voting", post(open_voting))
        .route("/close-voting", post(close_voting))
        .route("/publish-results", post(publish_results))
        .route("/cancel", post(cancel))
}
