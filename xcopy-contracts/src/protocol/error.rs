// SPDX-License-Identifier: GPL-3.0-only

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageErrorKind {
    /// Volume, host or matching adapter identifier does not exist
    NotFound,
    /// Missing mapping context fact or unparsable identifier
    InvalidState,
    /// Mapping refers to a host cluster rather than a host
    UnsupportedMapping,
    /// Failure reported by the array management API
    BackendTransport,
}

impl StorageErrorKind {
    pub fn code(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::InvalidState => 409,
            Self::UnsupportedMapping => 501,
            Self::BackendTransport => 502,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind:?}: {message}")]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::NotFound, message)
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::InvalidState, message)
    }

    pub fn unsupported_mapping(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::UnsupportedMapping, message)
    }

    /// Wraps a backend API failure with the operation and identifiers involved.
    pub fn transport(operation: &str, subject: impl Display, source: impl Display) -> Self {
        Self::new(
            StorageErrorKind::BackendTransport,
            format!("{operation} failed for {subject}: {source}"),
        )
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == StorageErrorKind::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_roundtrips() {
        let error = StorageError::not_found("volume 17");
        let json = serde_json::to_string(&error).expect("serialize error");
        let parsed: StorageError = serde_json::from_str(&json).expect("deserialize error");
        assert_eq!(parsed, error);
    }

    #[test]
    fn transport_error_names_operation_and_subject() {
        let error = StorageError::transport("map", "volume 17 -> host esx-01", "HTTP 500");
        assert_eq!(error.kind, StorageErrorKind::BackendTransport);
        assert_eq!(error.message, "map failed for volume 17 -> host esx-01: HTTP 500");
        assert!(!error.is_not_found());
    }

    #[test]
    fn storage_error_kind_codes_are_stable() {
        assert_eq!(StorageErrorKind::NotFound.code(), 404);
        assert_eq!(StorageErrorKind::InvalidState.code(), 409);
        assert_eq!(StorageErrorKind::UnsupportedMapping.code(), 501);
        assert_eq!(StorageErrorKind::BackendTransport.code(), 502);
    }
}
