// ─────────────────────────────────────────────────────────────────────
// MagNet — Dataset Tags
// ─────────────────────────────────────────────────────────────────────
//! Dataset selection as a closed set of tags.
//!
//! A run names its dataset as `"<family>/<subset>"` (e.g. `WebKB/Cornell`).
//! Parsing happens once, up front, so an unknown family fails before any
//! Laplacian is built.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MagNetError, MagNetResult};

/// The three WebKB university graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WebKbSubset {
    Cornell,
    Texas,
    Wisconsin,
}

impl WebKbSubset {
    pub fn name(&self) -> &'static str {
        match self {
            WebKbSubset::Cornell => "Cornell",
            WebKbSubset::Texas => "Texas",
            WebKbSubset::Wisconsin => "Wisconsin",
        }
    }
}

impl FromStr for WebKbSubset {
    type Err = MagNetError;

    fn from_str(s: &str) -> MagNetResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cornell" => Ok(WebKbSubset::Cornell),
            "texas" => Ok(WebKbSubset::Texas),
            "wisconsin" => Ok(WebKbSubset::Wisconsin),
            other => Err(MagNetError::Config(format!(
                "unknown WebKB subset {other:?} (expected Cornell, Texas or Wisconsin)"
            ))),
        }
    }
}

/// Supported dataset families.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetKind {
    WebKb(WebKbSubset),
    CoraMl,
    CiteseerNpz,
    /// Synthetic directed graphs stored under `syn/<subset>`.
    Synthetic(String),
}

impl DatasetKind {
    /// Parse a `"<family>/<subset>"` tag.
    pub fn parse(tag: &str) -> MagNetResult<Self> {
        let mut parts = tag.splitn(2, '/');
        let family = parts.next().unwrap_or_default();
        let subset = parts.next().unwrap_or_default().trim_end_matches('/');

        match family {
            "WebKB" => Ok(DatasetKind::WebKb(subset.parse()?)),
            "cora_ml" => Ok(DatasetKind::CoraMl),
            "citeseer_npz" => Ok(DatasetKind::CiteseerNpz),
            "syn" => {
                if subset.is_empty() {
                    return Err(MagNetError::Config(
                        "synthetic dataset tag needs a subset: syn/<name>".to_string(),
                    ));
                }
                Ok(DatasetKind::Synthetic(subset.to_string()))
            }
            _ => Err(MagNetError::Config(format!(
                "unrecognized dataset {tag:?}"
            ))),
        }
    }

    /// Family directory name under the data root.
    pub fn family(&self) -> &'static str {
        match self {
            DatasetKind::WebKb(_) => "WebKB",
            DatasetKind::CoraMl => "cora_ml",
            DatasetKind::CiteseerNpz => "citeseer_npz",
            DatasetKind::Synthetic(_) => "syn",
        }
    }

    /// Subset name (the family name again for single-graph families).
    pub fn subset(&self) -> &str {
        match self {
            DatasetKind::WebKb(s) => s.name(),
            DatasetKind::CoraMl => "cora_ml",
            DatasetKind::CiteseerNpz => "citeseer_npz",
            DatasetKind::Synthetic(s) => s,
        }
    }

    /// Location of the preprocessed dataset file relative to the data root.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(self.family()).join(format!("{}.json", self.subset()))
    }
}

impl FromStr for DatasetKind {
    type Err = MagNetError;

    fn from_str(s: &str) -> MagNetResult<Self> {
        DatasetKind::parse(s)
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::WebKb(s) => write!(f, "WebKB/{}", s.name()),
            DatasetKind::CoraMl => write!(f, "cora_ml"),
            DatasetKind::CiteseerNpz => write!(f, "citeseer_npz"),
            DatasetKind::Synthetic(s) => write!(f, "syn/{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_webkb() {
        let kind = DatasetKind::parse("WebKB/Cornell").unwrap();
        assert_eq!(kind, DatasetKind::WebKb(WebKbSubset::Cornell));
        assert_eq!(kind.to_string(), "WebKB/Cornell");
        assert_eq!(kind.relative_path(), PathBuf::from("WebKB/Cornell.json"));
    }

    #[test]
    fn test_parse_webkb_case_insensitive_subset() {
        let kind = DatasetKind::parse("WebKB/texas").unwrap();
        assert_eq!(kind, DatasetKind::WebKb(WebKbSubset::Texas));
    }

    #[test]
    fn test_parse_single_graph_families() {
        assert_eq!(DatasetKind::parse("cora_ml/").unwrap(), DatasetKind::CoraMl);
        assert_eq!(DatasetKind::parse("cora_ml").unwrap(), DatasetKind::CoraMl);
        assert_eq!(
            DatasetKind::parse("citeseer_npz/").unwrap(),
            DatasetKind::CiteseerNpz
        );
    }

    #[test]
    fn test_parse_synthetic() {
        let kind = DatasetKind::parse("syn/cyclic_0.9").unwrap();
        assert_eq!(kind, DatasetKind::Synthetic("cyclic_0.9".into()));
        assert_eq!(kind.relative_path(), PathBuf::from("syn/cyclic_0.9.json"));
    }

    #[test]
    fn test_reject_unknown_family() {
        let err = DatasetKind::parse("Planetoid/Cora").unwrap_err();
        assert!(matches!(err, MagNetError::Config(_)));
    }

    #[test]
    fn test_reject_unknown_webkb_subset() {
        assert!(DatasetKind::parse("WebKB/Harvard").is_err());
    }

    #[test]
    fn test_reject_synthetic_without_subset() {
        assert!(DatasetKind::parse("syn/").is_err());
        assert!(DatasetKind::parse("syn").is_err());
    }
}
