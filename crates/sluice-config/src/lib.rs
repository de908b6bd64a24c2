//! # Sluice Config
//!
//! YAML configuration parsing and validation for the Sluice controller.
//! A configuration source describes the switch a controller instance
//! governs: its interfaces, VLAN membership, ACL attachments and static
//! routes. Parsing and a sanity check both have to succeed before a
//! [`PolicySnapshot`](sluice_core::PolicySnapshot) is produced; the
//! controller swaps snapshots atomically, so a failed load never disturbs
//! the active one.
//!
//! ## Example
//!
//! ```
//! use sluice_config::parse_and_validate_snapshot;
//!
//! let yaml = r#"
//! version: 1
//! datapath_id: "0x1"
//! interfaces:
//!   1:
//!     native_vlan: 100
//!   2:
//!     tagged_vlans: [100]
//! vlans:
//!   100:
//!     name: office
//! "#;
//!
//! let snapshot = parse_and_validate_snapshot(yaml).unwrap();
//! assert_eq!(snapshot.datapath_id.as_hex(), "0x1");
//! assert_eq!(snapshot.interfaces.len(), 2);
//! ```

mod document;
mod error;
mod parser;

pub mod validation;

pub use document::{ConfigDocument, SUPPORTED_VERSION};
pub use error::ConfigError;
pub use validation::ValidationError;

use sluice_core::PolicySnapshot;
use std::path::Path;

/// Parse and sanity-check a configuration string.
///
/// 1. Parses the YAML into a [`ConfigDocument`] (version-gated)
/// 2. Runs the structural/semantic sanity checks
/// 3. Returns the validated [`PolicySnapshot`] or a [`ConfigError`]
pub fn parse_and_validate_snapshot(yaml: &str) -> Result<PolicySnapshot, ConfigError> {
    let document = parser::parse_document(yaml)?;
    validation::validate_document(&document)?;
    Ok(document.into_snapshot())
}

/// Read, parse and sanity-check a configuration source from disk.
///
/// The controller calls this on every reconfigure, so the source is
/// re-read each time.
pub fn load_snapshot(path: &Path) -> Result<PolicySnapshot, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_and_validate_snapshot(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const VALID: &str = r#"
    datapath_id: "0xab"
    name: lab-switch
    interfaces:
      1: {native_vlan: 100}
    vlans:
      100: {name: lab}
    routes:
      - {ip_dst: "10.0.0.0/8", ip_gw: "10.0.0.1"}
    "#;

    #[test]
    fn load_snapshot_reads_the_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(VALID.as_bytes()).unwrap();

        let snapshot = load_snapshot(file.path()).expect("valid source");
        assert_eq!(snapshot.datapath_id.as_hex(), "0xab");
        assert_eq!(snapshot.name.as_deref(), Some("lab-switch"));
        assert_eq!(snapshot.routes.len(), 1);
    }

    #[test]
    fn load_snapshot_reports_missing_source() {
        let err = load_snapshot(Path::new("/nonexistent/sluice.yaml")).unwrap_err();
        match err {
            ConfigError::Io { path, .. } => assert_eq!(path, "/nonexistent/sluice.yaml"),
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn validation_failure_carries_a_diagnostic() {
        let yaml = r#"
        datapath_id: "0x1"
        interfaces:
          1: {native_vlan: 999}
        "#;

        let err = parse_and_validate_snapshot(yaml).unwrap_err();
        let diagnostic = err.to_string();
        assert!(
            diagnostic.contains("undeclared VLAN 999"),
            "unhelpful diagnostic: {diagnostic}"
        );
    }
}
