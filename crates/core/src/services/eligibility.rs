//! Eligible voter counts for turnout.

use std::sync::Arc;

use async_trait::async_trait;
use ballotbox_common::AppResult;
use ballotbox_common::config::MembershipConfig;
use ballotbox_db::entities::election;

/// Source of the number of members allowed to vote in an election.
#[async_trait]
pub trait EligibilitySource: Send + Sync {
    /// Number of eligible voters for the election.
    async fn eligible_voters(&self, election: &election::Model) -> AppResult<u64>;
}

/// The same eligible count for every election.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedEligibility {
    eligible: u64,
}

impl FixedEligibility {
    #[must_use]
    pub const fn new(eligible: u64) -> Self {
        Self { eligible }
    }

    /// Read the count from the `[membership]` configuration section.
    #[must_use]
    pub const fn from_config(config: &MembershipConfig) -> Self {
        Self::new(config.eligible_voters)
    }
}

#[async_trait]
impl EligibilitySource for FixedEligibility {
    async fn eligible_voters(&self, _election: &election::Model) -> AppResult<u64> {
        Ok(self.eligible)
    }
}

/// Shared eligibility source handle.
pub type EligibilityService = Arc<dyn EligibilitySource>;
