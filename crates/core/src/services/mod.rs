//! Business logic services.

#![allow(missing_docs)]

pub mod ballot;
pub mod candidacy;
pub mod eligibility;
pub mod identity;
pub mod lifecycle;
pub mod tally;
pub mod voting_session;

pub use ballot::{BallotService, CounterDrift};
pub use candidacy::{CandidacyService, RegisterCandidateInput};
pub use eligibility::{EligibilityService, EligibilitySource, FixedEligibility};
pub use identity::{Actor, IdentityProvider, IdentityService, StaticTokenIdentity};
pub use lifecycle::{
    AddPositionInput, CreateElectionInput, ElectionService, ElectionWithPositions,
    UpdatePositionInput,
};
pub use tally::{ElectionResults, PositionTally, TallyRow, TallyService, Turnout};
pub use voting_session::{
    BallotDraft, BallotReceipt, BallotSelection, PositionBallot, VotingSessionService,
};
