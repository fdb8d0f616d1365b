use std::{fmt, io};

use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;
use tokio::sync::mpsc::error::SendError as TokioSendError;

use crate::event::GraphEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum RankGraphError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("Invalid preference: {0}")]
    InvalidPreference(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Graph store unavailable: {0}")]
    StoreUnavailable(String),
}

impl RankGraphError {
    /// Errors that are part of the normal preference workflow rather than store or identity
    /// failures.
    pub fn is_soft(&self) -> bool {
        matches!(self, RankGraphError::InvalidPreference(_))
    }
}

impl From<toml::de::Error> for RankGraphError {
    fn from(src: toml::de::Error) -> RankGraphError {
        RankGraphError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for RankGraphError {
    fn from(src: toml::ser::Error) -> RankGraphError {
        RankGraphError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for RankGraphError {
    fn from(src: JsonError) -> RankGraphError {
        RankGraphError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<io::Error> for RankGraphError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => RankGraphError::NotFound(format!("{x}")),
            _ => RankGraphError::StoreUnavailable(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<fmt::Error> for RankGraphError {
    fn from(x: fmt::Error) -> Self {
        RankGraphError::Serialization(format!("{x}"))
    }
}

impl From<TokioSendError<GraphEvent>> for RankGraphError {
    fn from(x: TokioSendError<GraphEvent>) -> Self {
        RankGraphError::StoreUnavailable(format!(
            "Channel update send Error, could not transmit graph event {:?}",
            x.0
        ))
    }
}
