// SPDX-License-Identifier: GPL-3.0-only

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Storage array family served by an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// FC/iSCSI SAN array with hosts and host sets (HPE Primera / 3PAR)
    #[serde(rename = "primera-3par")]
    Primera3Par,
    /// Software-defined block storage addressed through SDCs (Dell PowerFlex)
    #[serde(rename = "powerflex")]
    PowerFlex,
    /// Scale-out block array with hosts and ports (Infinidat InfiniBox)
    #[serde(rename = "infinibox")]
    Infinibox,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [Self::Primera3Par, Self::PowerFlex, Self::Infinibox];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primera3Par => "primera-3par",
            Self::PowerFlex => "powerflex",
            Self::Infinibox => "infinibox",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "primera-3par" | "primera3par" | "3par" | "primera" => Ok(Self::Primera3Par),
            "power-flex" | "powerflex" => Ok(Self::PowerFlex),
            "infinibox" => Ok(Self::Infinibox),
            other => Err(format!("unknown storage backend: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BackendKind;

    #[test]
    fn display_and_parse_agree() {
        for kind in BackendKind::ALL {
            assert_eq!(kind.to_string().parse::<BackendKind>(), Ok(kind));
        }
    }

    #[test]
    fn parses_vendor_aliases() {
        assert_eq!("PowerFlex".parse::<BackendKind>(), Ok(BackendKind::PowerFlex));
        assert_eq!("3par".parse::<BackendKind>(), Ok(BackendKind::Primera3Par));
        assert!("netapp".parse::<BackendKind>().is_err());
    }

    #[test]
    fn serde_name_matches_display() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            kind: BackendKind,
        }
        let parsed: Wrapper = toml::from_str("kind = \"powerflex\"").expect("parse kind");
        assert_eq!(parsed.kind, BackendKind::PowerFlex);
    }
}
