//! Domain models for agentxmap.
//!
//! These are the core types shared across all crates.

pub mod invitation;
pub mod organization;
pub mod tenant;
pub mod user;
