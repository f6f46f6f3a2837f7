// SPDX-License-Identifier: GPL-3.0-only

use std::fmt;
use std::sync::Arc;

use tracing::info;
use xcopy_contracts::{CopyOffloadAdapter, StorageError};
use xcopy_types::BackendKind;

use crate::config::BackendConfig;
use crate::infinibox::{InfiniboxApi, InfiniboxClonner};
use crate::powerflex::{PowerFlexApi, PowerFlexClonner};
use crate::primera3par::{Par3Api, Par3Clonner};

/// Vendor API binding handed over by the SDK layer.
#[derive(Clone)]
pub enum BackendClient {
    Primera3Par(Arc<dyn Par3Api>),
    PowerFlex(Arc<dyn PowerFlexApi>),
    Infinibox(Arc<dyn InfiniboxApi>),
}

impl BackendClient {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Primera3Par(_) => BackendKind::Primera3Par,
            Self::PowerFlex(_) => BackendKind::PowerFlex,
            Self::Infinibox(_) => BackendKind::Infinibox,
        }
    }
}

impl fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BackendClient").field(&self.kind()).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterRoute {
    pub kind: BackendKind,
    pub adapter: &'static str,
    pub endpoint: String,
}

impl AdapterRoute {
    pub fn for_config(config: &BackendConfig) -> Self {
        let adapter = match config.kind {
            BackendKind::Primera3Par => "par3-clonner",
            BackendKind::PowerFlex => "powerflex-clonner",
            BackendKind::Infinibox => "infinibox-clonner",
        };
        Self {
            kind: config.kind,
            adapter,
            endpoint: config.hostname.clone(),
        }
    }
}

impl fmt::Display for AdapterRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} via {} at {}", self.kind, self.adapter, self.endpoint)
    }
}

/// Builds the adapter for the configured backend kind.
///
/// Construction authenticates; no adapter is returned without a session.
pub fn build_adapter(
    config: &BackendConfig,
    client: BackendClient,
) -> Result<Arc<dyn CopyOffloadAdapter>, StorageError> {
    config.validate()?;

    if client.kind() != config.kind {
        return Err(StorageError::invalid_state(format!(
            "configured backend is {} but the client binding is for {}",
            config.kind,
            client.kind()
        )));
    }

    let route = AdapterRoute::for_config(config);
    let adapter: Arc<dyn CopyOffloadAdapter> = match client {
        BackendClient::Primera3Par(api) => Arc::new(Par3Clonner::connect(api, config)?),
        BackendClient::PowerFlex(api) => Arc::new(PowerFlexClonner::connect(api, config)?),
        BackendClient::Infinibox(api) => Arc::new(InfiniboxClonner::connect(api, config)?),
    };

    info!(
        backend = %route.kind,
        adapter = route.adapter,
        endpoint = %route.endpoint,
        "copy offload adapter ready"
    );
    Ok(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_names_adapter_for_each_kind() {
        for kind in BackendKind::ALL {
            let config = BackendConfig::new(kind, "array.example.com", "admin", "secret");
            let route = AdapterRoute::for_config(&config);
            assert_eq!(route.kind, kind);
            assert_eq!(route.endpoint, "array.example.com");
            assert!(route.to_string().contains(route.adapter));
        }
    }
}
