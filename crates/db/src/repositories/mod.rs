//! Repositories for database access.
//!
//! Methods suffixed `_in` are associated functions that take any
//! [`sea_orm::ConnectionTrait`], so callers can run them inside a
//! [`sea_orm::DatabaseTransaction`].

pub mod candidate;
pub mod election;
pub mod position;
pub mod vote;

pub use candidate::CandidateRepository;
pub use election::ElectionRepository;
pub use position::PositionRepository;
pub use vote::VoteRepository;
