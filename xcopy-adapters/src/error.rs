// SPDX-License-Identifier: GPL-3.0-only

use std::fmt::Display;

use thiserror::Error;
use xcopy_contracts::{OperationKind, StorageError};

/// Failure reported by a vendor management API binding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("rejected by array: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("authentication failed: {0}")]
    Authentication(String),
}

impl ApiError {
    /// Throttling responses are the only errors the transport retries.
    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Wraps the failure with the operation and the identifiers involved.
    pub fn into_storage_error(self, operation: OperationKind, subject: impl Display) -> StorageError {
        match self {
            Self::NotFound(detail) => {
                StorageError::not_found(format!("{operation}: {subject} not found: {detail}"))
            }
            other => StorageError::transport(operation.as_str(), subject, other),
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use xcopy_contracts::StorageErrorKind;

    #[test]
    fn not_found_keeps_its_kind() {
        let error = ApiError::NotFound("volume 17".to_string())
            .into_storage_error(OperationKind::Map, "volume pvc-1");
        assert_eq!(error.kind, StorageErrorKind::NotFound);
        assert!(error.message.contains("map"));
        assert!(error.message.contains("pvc-1"));
    }

    #[test]
    fn other_failures_become_transport_errors() {
        let error = ApiError::Rejected("lun in use".to_string())
            .into_storage_error(OperationKind::Unmap, "volume pvc-1 from host esx-01");
        assert_eq!(error.kind, StorageErrorKind::BackendTransport);
        assert_eq!(
            error.message,
            "unmap failed for volume pvc-1 from host esx-01: rejected by array: lun in use"
        );
    }

    #[test]
    fn only_rate_limits_are_throttled() {
        assert!(ApiError::RateLimited("429".to_string()).is_throttled());
        assert!(!ApiError::Transport("reset".to_string()).is_throttled());
        assert!(!ApiError::Authentication("401".to_string()).is_throttled());
    }
}
