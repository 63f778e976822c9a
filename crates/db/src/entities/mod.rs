//! Database entities.

pub mod candidate;
pub mod election;
pub mod position;
pub mod vote;

pub use candidate::Entity as Candidate;
pub use election::Entity as Election;
pub use position::Entity as Position;
pub use vote::Entity as Vote;
