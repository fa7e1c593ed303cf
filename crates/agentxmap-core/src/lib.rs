//! agentxmap Core: domain models, repository traits and shared errors
//! for identity and invitation management.

pub mod context;
pub mod error;
pub mod models;
pub mod repository;
pub mod slug;

pub use context::RequestContext;
pub use error::{AgentXmapError, AgentXmapResult};
pub use slug::slugify;
