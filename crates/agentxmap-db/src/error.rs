//! Database-specific error types and conversions.

use std::collections::HashMap;

use agentxmap_core::error::AgentXmapError;

use crate::schema::UNIQUE_INDEXES;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Malformed {entity} record: {reason}")]
    Decode { entity: String, reason: String },

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unique constraint violated on {entity}")]
    Duplicate { entity: String },

    #[error("Stale write on {entity}: {reason}")]
    Conflict { entity: String, reason: String },
}

impl DbError {
    /// Classify an error returned by a write statement.
    ///
    /// Unique index violations become [`DbError::Duplicate`] naming the
    /// entity that owns the index; anything else is a plain query failure.
    pub(crate) fn from_write(err: surrealdb::Error) -> Self {
        let message = err.to_string();
        if message.contains("already contains") {
            let entity = UNIQUE_INDEXES
                .iter()
                .find(|(index, _)| message.contains(index))
                .map(|(_, entity)| *entity)
                .unwrap_or("record");
            return DbError::Duplicate {
                entity: entity.to_string(),
            };
        }
        DbError::Query(message)
    }

    /// Classify the errors of a failed multi-statement transaction.
    ///
    /// Every statement of a cancelled transaction reports an error; the
    /// one that caused the rollback is preferred when it can be identified.
    pub(crate) fn from_transaction(errors: HashMap<usize, surrealdb::Error>) -> Self {
        let mut errors: Vec<(usize, surrealdb::Error)> = errors.into_iter().collect();
        errors.sort_by_key(|(index, _)| *index);

        let cause = errors
            .iter()
            .position(|(_, e)| e.to_string().contains("already contains"))
            .or_else(|| {
                errors
                    .iter()
                    .position(|(_, e)| !e.to_string().contains("not executed"))
            })
            .unwrap_or(0);

        match errors.into_iter().nth(cause) {
            Some((_, err)) => Self::from_write(err),
            None => DbError::Query("transaction failed".into()),
        }
    }

    pub(crate) fn decode(entity: &str, reason: impl std::fmt::Display) -> Self {
        DbError::Decode {
            entity: entity.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<DbError> for AgentXmapError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => AgentXmapError::NotFound { entity, id },
            DbError::Duplicate { entity } => AgentXmapError::AlreadyExists { entity },
            DbError::Conflict { entity, reason } => AgentXmapError::Conflict { entity, reason },
            other => AgentXmapError::Database(other.to_string()),
        }
    }
}
