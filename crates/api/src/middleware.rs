//! API middleware.

use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use ballotbox_core::{
    BallotService, CandidacyService, ElectionService, EligibilityService, IdentityService,
    TallyService, VotingSessionService,
};
use ballotbox_db::repositories::{
    CandidateRepository, ElectionRepository, PositionRepository, VoteRepository,
};
use sea_orm::DatabaseConnection;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// Election setup and phase transitions.
    pub election_service: ElectionService,
    /// Candidate applications.
    pub candidacy_service: CandidacyService,
    /// Single votes and counter repair.
    pub ballot_service: BallotService,
    /// Step-through voting and batch submission.
    pub voting_session_service: VotingSessionService,
    /// Results and turnout.
    pub tally_service: TallyService,
    /// Bearer token resolution.
    pub identity: IdentityService,
}

impl AppState {
    /// Wire every service onto one connection pool.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        identity: IdentityService,
        eligibility: EligibilityService,
    ) -> Self {
        let election_repo = ElectionRepository::new(db.clone());
        let position_repo = PositionRepository::new(db.clone());
        let candidate_repo = CandidateRepository::new(db.clone());
        let vote_repo = VoteRepository::new(db.clone());

        Self {
            election_service: ElectionService::new(election_repo.clone(), position_repo.clone()),
            candidacy_service: CandidacyService::new(
                candidate_repo.clone(),
                position_repo.clone(),
                election_repo.clone(),
            ),
            ballot_service: BallotService::new(db.clone()),
            voting_session_service: VotingSessionService::new(db),
            tally_service: TallyService::new(
                election_repo,
                position_repo,
                candidate_repo,
                vote_repo,
                eligibility,
            ),
            identity,
        }
    }
}

/// Authentication middleware.
///
/// Resolves `Authorization: Bearer <token>` and stores the resulting
/// [`ballotbox_core::Actor`] in the request extensions. Requests without a
/// valid token pass through unauthenticated.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let bearer = req.headers().typed_get::<Authorization<Bearer>>();

    if let Some(Authorization(bearer)) = bearer {
        match state.identity.resolve(bearer.token()).await {
            Ok(Some(actor)) => {
                req.extensions_mut().insert(actor);
            }
            Ok(None) => tracing::debug!("Unknown bearer token"),
            Err(e) => tracing::warn!(error = %e, "Identity lookup failed"),
        }
    }

    next.run(req).await
}
