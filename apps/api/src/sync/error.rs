use thiserror::Error;

use crate::client::RemoteError;
use crate::models::roadmap::ResourceKey;
use crate::progression::{CommandError, IneligibleReason};

/// Errors surfaced to the learner-facing side of the toggle flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Cannot change resource {key}: {reason}")]
    IneligibleTransition {
        key: ResourceKey,
        reason: IneligibleReason,
    },

    #[error("A change to resource {0} is still being saved")]
    ToggleInProgress(ResourceKey),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Server rejected the change: {message}")]
    ServerError { status: Option<u16>, message: String },

    #[error("Roadmap is out of date: {0}")]
    StaleRoadmap(String),
}

impl SyncError {
    /// True when the same request may succeed if tried again later.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SyncError::ToggleInProgress(_) | SyncError::NetworkFailure(_)
        )
    }

    /// The local snapshot no longer matches the server and must be refetched.
    pub fn requires_refresh(&self) -> bool {
        matches!(self, SyncError::StaleRoadmap(_))
    }
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Http(e) => SyncError::NetworkFailure(e.to_string()),
            RemoteError::Api { status, message } => match status {
                404 | 410 => SyncError::StaleRoadmap(message),
                s if s >= 500 => SyncError::NetworkFailure(format!("status {s}: {message}")),
                s => SyncError::ServerError {
                    status: Some(s),
                    message,
                },
            },
            RemoteError::Parse(e) => SyncError::ServerError {
                status: None,
                message: format!("unreadable response: {e}"),
            },
        }
    }
}

impl From<CommandError> for SyncError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::IneligibleTransition { key, reason } => {
                SyncError::IneligibleTransition { key, reason }
            }
            CommandError::UnknownResource(_) | CommandError::ModuleOutOfRange { .. } => {
                SyncError::StaleRoadmap(err.to_string())
            }
            other => SyncError::ServerError {
                status: None,
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let api = |status| RemoteError::Api {
            status,
            message: "boom".to_string(),
        };
        assert!(matches!(SyncError::from(api(404)), SyncError::StaleRoadmap(_)));
        assert!(matches!(SyncError::from(api(503)), SyncError::NetworkFailure(_)));
        assert_eq!(
            SyncError::from(api(409)),
            SyncError::ServerError {
                status: Some(409),
                message: "boom".to_string()
            }
        );
    }

    #[test]
    fn test_command_error_mapping() {
        let key = ResourceKey::new(0, 1, 2);
        let err = SyncError::from(CommandError::UnknownResource(key));
        assert!(err.requires_refresh());
        assert!(!err.is_recoverable());

        let err = SyncError::from(CommandError::IneligibleTransition {
            key,
            reason: IneligibleReason::NotFrontier,
        });
        assert!(matches!(err, SyncError::IneligibleTransition { .. }));
        assert!(!err.is_recoverable());
        assert!(SyncError::ToggleInProgress(key).is_recoverable());
    }
}
