// SPDX-License-Identifier: GPL-3.0-only

use thiserror::Error;
use xcopy_contracts::{OperationKind, StorageError};

#[derive(Debug, Error)]
pub enum TestingError {
    #[error("spec not found for '{spec_name}' in resources/lab-specs")]
    SpecNotFound { spec_name: String },
    #[error("invalid spec '{spec_name}': {reason}")]
    SpecInvalid { spec_name: String, reason: String },
    #[error("lab io error: {reason}")]
    LabIo { reason: String },
    #[error("{operation} failed: {source}")]
    Step {
        operation: OperationKind,
        #[source]
        source: StorageError,
    },
    #[error("adapter setup failed: {0}")]
    Setup(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, TestingError>;
