//! Candidate entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status of a candidacy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum CandidateStatus {
    /// Awaiting review by an administrator.
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    /// On the ballot.
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Turned down by an administrator.
    #[sea_orm(string_value = "rejected")]
    Rejected,
    /// Pulled out by the candidate.
    #[sea_orm(string_value = "withdrawn")]
    Withdrawn,
}

impl CandidateStatus {
    /// Check if the candidate appears on ballots and in tallies.
    #[must_use]
    pub const fn is_on_ballot(self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl std::fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_value())
    }
}

/// Candidate - a voter's application to run for a position.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "candidate")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub position_id: String,

    /// The voter standing for the position.
    #[sea_orm(indexed)]
    pub voter_id: String,

    /// Candidate statement shown on the ballot.
    #[sea_orm(column_type = "Text", nullable)]
    pub manifesto: Option<String>,

    pub status: CandidateStatus,

    /// Cached count of vote rows pointing at this candidate.
    pub votes: i64,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::position::Entity",
        from = "Column::PositionId",
        to = "super::position::Column::Id",
        on_delete = "Restrict"
    )]
    Position,
    #[sea_orm(has_many = "super::vote::Entity")]
    Vote,
}

impl Related<super::position::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Position.def()
    }
}

impl Related<super::vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vote.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_matches_db_value() {
        assert_eq!(CandidateStatus::Withdrawn.to_string(), "withdrawn");
        assert_eq!(
            CandidateStatus::Approved.to_string(),
            CandidateStatus::Approved.to_value()
        );
        assert!(CandidateStatus::Approved.is_on_ballot());
        assert!(!CandidateStatus::Pending.is_on_ballot());
    }
}
