use crate::document::{ConfigDocument, SUPPORTED_VERSION};
use crate::error::ConfigError;

/// Parse a YAML string into a [`ConfigDocument`].
///
/// This handles the conversion from YAML text to structured data and the
/// version gate only; deep validation is the validation module's job.
pub fn parse_document(yaml: &str) -> Result<ConfigDocument, ConfigError> {
    let document: ConfigDocument = serde_yaml::from_str(yaml)?;

    if document.version != SUPPORTED_VERSION {
        return Err(ConfigError::UnsupportedVersion(document.version));
    }

    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::DatapathId;

    #[test]
    fn parses_minimal_document() {
        let yaml = r#"
        datapath_id: "0x1"
        interfaces:
          1:
            native_vlan: 100
        vlans:
          100:
            name: office
        "#;

        let document = parse_document(yaml).expect("valid document");
        assert_eq!(document.version, SUPPORTED_VERSION);
        assert_eq!(document.datapath_id, DatapathId(1));
        assert_eq!(document.interfaces[&1].native_vlan, Some(100));
        assert_eq!(document.vlans[&100].name.as_deref(), Some("office"));
        // unicast flooding is on unless the config turns it off
        assert!(document.vlans[&100].unicast_flood);
    }

    #[test]
    fn rejects_invalid_yaml() {
        let yaml = r#"
        datapath_id: "0x1"
        interfaces: [
          1: broken
        "#;

        match parse_document(yaml) {
            Err(ConfigError::Yaml(_)) => {}
            other => panic!("expected Yaml error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unsupported_version() {
        let yaml = r#"
        version: 2
        datapath_id: "0x1"
        interfaces: {}
        "#;

        match parse_document(yaml) {
            Err(ConfigError::UnsupportedVersion(version)) => assert_eq!(version, 2),
            other => panic!("expected UnsupportedVersion, got {other:?}"),
        }
    }
}
