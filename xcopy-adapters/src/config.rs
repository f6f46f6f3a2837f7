// SPDX-License-Identifier: GPL-3.0-only

//! Backend connection configuration
//!
//! Supplied once when an adapter is built. Values come from a TOML document and
//! may be overridden from the environment, where the populator receives its
//! storage secret.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use xcopy_contracts::StorageError;
use xcopy_types::BackendKind;

use crate::retry::RetryPolicy;

pub const ENV_HOSTNAME: &str = "XCOPY_STORAGE_HOSTNAME";
pub const ENV_USERNAME: &str = "XCOPY_STORAGE_USERNAME";
pub const ENV_PASSWORD: &str = "XCOPY_STORAGE_PASSWORD";
pub const ENV_SKIP_SSL_VERIFICATION: &str = "XCOPY_STORAGE_SKIP_SSL_VERIFICATION";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Management endpoint (host name or URL)
    pub hostname: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub insecure_skip_tls_verify: bool,
    /// PowerFlex system the volumes live on
    #[serde(default)]
    pub system_id: Option<String>,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub powerflex: PowerFlexMappingOptions,
}

impl BackendConfig {
    pub fn new(kind: BackendKind, hostname: &str, username: &str, password: &str) -> Self {
        Self {
            kind,
            hostname: hostname.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            insecure_skip_tls_verify: false,
            system_id: None,
            retry: RetrySettings::default(),
            powerflex: PowerFlexMappingOptions::default(),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, StorageError> {
        toml::from_str(raw).map_err(|e| {
            StorageError::invalid_state(format!("invalid backend configuration: {e}"))
        })
    }

    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            StorageError::not_found(format!(
                "backend configuration {} unreadable: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Applies `XCOPY_STORAGE_*` variables over the loaded values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| {
            std::env::var(name)
                .ok()
                .filter(|value| !value.trim().is_empty())
        });
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(hostname) = lookup(ENV_HOSTNAME) {
            self.hostname = hostname;
        }
        if let Some(username) = lookup(ENV_USERNAME) {
            self.username = username;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.password = password;
        }
        if let Some(skip) = lookup(ENV_SKIP_SSL_VERIFICATION) {
            self.insecure_skip_tls_verify = matches!(skip.trim(), "true" | "1" | "yes");
        }
    }

    pub fn validate(&self) -> Result<(), StorageError> {
        if self.hostname.trim().is_empty() {
            return Err(StorageError::invalid_state(format!(
                "{} backend requires a hostname",
                self.kind
            )));
        }
        if self.username.trim().is_empty() {
            return Err(StorageError::invalid_state(format!(
                "{} backend requires a username",
                self.kind
            )));
        }
        if self.kind == BackendKind::PowerFlex
            && self.system_id.as_deref().is_none_or(|id| id.trim().is_empty())
        {
            return Err(StorageError::invalid_state(
                "powerflex backend requires a system_id",
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.to_policy()
    }

    pub fn credentials(&self) -> Credentials<'_> {
        Credentials {
            endpoint: &self.hostname,
            username: &self.username,
            password: &self.password,
            insecure_skip_tls_verify: self.insecure_skip_tls_verify,
        }
    }
}

/// Login material handed to a vendor API binding.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Credentials<'a> {
    pub endpoint: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub insecure_skip_tls_verify: bool,
}

impl std::fmt::Debug for Credentials<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("insecure_skip_tls_verify", &self.insecure_skip_tls_verify)
            .finish()
    }
}

/// Backoff applied to throttled API calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            initial_delay_ms: policy.initial_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            backoff_multiplier: policy.backoff_multiplier,
        }
    }
}

impl RetrySettings {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms.max(self.initial_delay_ms)),
            backoff_multiplier: if self.backoff_multiplier >= 1.0 {
                self.backoff_multiplier
            } else {
                1.0
            },
        }
    }
}

/// SDC access granted by a PowerFlex volume mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessMode {
    #[default]
    ReadWrite,
    ReadOnly,
    NoAccess,
}

impl AccessMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadWrite => "ReadWrite",
            Self::ReadOnly => "ReadOnly",
            Self::NoAccess => "NoAccess",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerFlexMappingOptions {
    /// Keep existing SDC mappings when adding the cloning SDC
    pub allow_multiple_mappings: bool,
    pub access_mode: AccessMode,
}

impl Default for PowerFlexMappingOptions {
    fn default() -> Self {
        Self {
            allow_multiple_mappings: true,
            access_mode: AccessMode::ReadWrite,
        }
    }
}
