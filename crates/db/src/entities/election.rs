//! Election entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle phase of an election.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum ElectionStatus {
    /// Created, positions still being set up.
    #[sea_orm(string_value = "upcoming")]
    #[default]
    Upcoming,
    /// Accepting candidate nominations.
    #[sea_orm(string_value = "nomination")]
    Nomination,
    /// Nominations closed, voting not yet open.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Voting window open.
    #[sea_orm(string_value = "active")]
    Active,
    /// Voting closed.
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Administratively cancelled.
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl ElectionStatus {
    /// Check if no further phase change is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for ElectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_value())
    }
}

/// Election - a time-boxed voting event with one or more positions.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "election")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Scheduled opening of the election.
    pub starts_at: DateTimeWithTimeZone,

    /// Scheduled close of the election.
    pub ends_at: DateTimeWithTimeZone,

    /// Current lifecycle phase.
    #[sea_orm(indexed)]
    pub status: ElectionStatus,

    /// Whether results are visible to non-administrators.
    pub results_published: bool,

    /// Administrator who created the election.
    pub created_by: String,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::position::Entity")]
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
    fn test_terminal_statuses() {
        assert!(ElectionStatus::Completed.is_terminal());
        assert!(ElectionStatus::Cancelled.is_terminal());
        assert!(!ElectionStatus::Upcoming.is_terminal());
        assert!(!ElectionStatus::Active.is_terminal());
    }

    #[test]
    fn test_status_display_matches_db_value() {
        assert_eq!(ElectionStatus::Nomination.to_string(), "nomination");
        assert_eq!(ElectionStatus::Active.to_value(), "active".to_string());
    }
}
