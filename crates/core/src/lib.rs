//! Core business logic for ballotbox.
//!
//! Services here own every rule about elections: which phase allows which
//! action, who may perform it, and how votes reach storage.

pub mod services;

pub use services::*;
