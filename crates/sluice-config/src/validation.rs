//! Structural and semantic sanity checks for parsed configuration.

use crate::document::ConfigDocument;
use crate::error::ConfigError;
use std::error::Error;
use std::fmt;

/// A validation error found while sanity-checking a configuration document.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Error code (a constant identifier)
    pub code: &'static str,

    /// Human-readable error message
    pub message: String,

    /// Optional path to the offending location (e.g. `interfaces[3]`)
    pub path: Option<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{}: {} (at {})", self.code, self.message, path)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl Error for ValidationError {}

/// Validation error codes
pub mod error_codes {
    /// Datapath id is zero
    pub const ZERO_DATAPATH_ID: &str = "ERR_CONFIG_ZERO_DATAPATH_ID";

    /// VLAN id outside the 802.1Q range
    pub const VLAN_OUT_OF_RANGE: &str = "ERR_CONFIG_VLAN_OUT_OF_RANGE";

    /// Interface references a VLAN that is not declared
    pub const UNDECLARED_VLAN: &str = "ERR_CONFIG_UNDECLARED_VLAN";

    /// Interface carries no VLAN at all
    pub const UNASSIGNED_INTERFACE: &str = "ERR_CONFIG_UNASSIGNED_INTERFACE";

    /// Interface references an ACL that is not declared
    pub const UNDECLARED_ACL: &str = "ERR_CONFIG_UNDECLARED_ACL";
}

/// A check over one aspect of the document.
trait Validator {
    fn validate(&self, document: &ConfigDocument) -> Vec<ValidationError>;
}

struct DatapathValidator;

impl Validator for DatapathValidator {
    fn validate(&self, document: &ConfigDocument) -> Vec<ValidationError> {
        if document.datapath_id.0 == 0 {
            return vec![ValidationError {
                code: error_codes::ZERO_DATAPATH_ID,
                message: "datapath_id must be nonzero".to_string(),
                path: Some("datapath_id".to_string()),
            }];
        }
        Vec::new()
    }
}

struct VlanValidator;

impl Validator for VlanValidator {
    fn validate(&self, document: &ConfigDocument) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for vid in document.vlans.keys() {
            if *vid == 0 || *vid >= 4096 {
                errors.push(ValidationError {
                    code: error_codes::VLAN_OUT_OF_RANGE,
                    message: format!("VLAN id {vid} is outside the valid 802.1Q range"),
                    path: Some(format!("vlans[{vid}]")),
                });
            }
        }

        errors
    }
}

struct InterfaceValidator;

impl Validator for InterfaceValidator {
    fn validate(&self, document: &ConfigDocument) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (port, interface) in &document.interfaces {
            let mut referenced: Vec<u16> = interface.tagged_vlans.clone();
            if let Some(native) = interface.native_vlan {
                referenced.push(native);
            }

            if referenced.is_empty() {
                errors.push(ValidationError {
                    code: error_codes::UNASSIGNED_INTERFACE,
                    message: format!("interface {port} carries no VLAN"),
                    path: Some(format!("interfaces[{port}]")),
                });
            }

            for vid in referenced {
                if !document.vlans.contains_key(&vid) {
                    errors.push(ValidationError {
                        code: error_codes::UNDECLARED_VLAN,
                        message: format!("interface {port} references undeclared VLAN {vid}"),
                        path: Some(format!("interfaces[{port}]")),
                    });
                }
            }
        }

        errors
    }
}

struct AclValidator;

impl Validator for AclValidator {
    fn validate(&self, document: &ConfigDocument) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (port, interface) in &document.interfaces {
            if let Some(acl) = &interface.acl_in {
                if !document.acls.contains_key(acl) {
                    errors.push(ValidationError {
                        code: error_codes::UNDECLARED_ACL,
                        message: format!("interface {port} references undeclared ACL {acl:?}"),
                        path: Some(format!("interfaces[{port}]")),
                    });
                }
            }
        }

        errors
    }
}

/// Sanity-check a parsed configuration document.
pub fn validate_document(document: &ConfigDocument) -> Result<(), ConfigError> {
    let validators: Vec<Box<dyn Validator>> = vec![
        Box::new(DatapathValidator),
        Box::new(VlanValidator),
        Box::new(InterfaceValidator),
        Box::new(AclValidator),
    ];

    let mut errors = Vec::new();
    for validator in validators {
        errors.extend(validator.validate(document));
    }

    if !errors.is_empty() {
        return Err(ConfigError::from_validation_errors(errors));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;

    fn document(yaml: &str) -> ConfigDocument {
        parse_document(yaml).expect("document parses")
    }

    #[test]
    fn accepts_consistent_document() {
        let doc = document(
            r#"
            datapath_id: "0x1"
            interfaces:
              1:
                native_vlan: 100
              2:
                tagged_vlans: [100, 200]
                acl_in: office-only
            vlans:
              100: {name: office}
              200: {name: guest}
            acls:
              office-only:
                rules:
                  - {allow: true, dl_type: 0x800}
            "#,
        );

        assert!(validate_document(&doc).is_ok());
    }

    #[test]
    fn rejects_zero_datapath_id() {
        let doc = document(
            r#"
            datapath_id: "0x0"
            interfaces:
              1: {native_vlan: 100}
            vlans:
              100: {}
            "#,
        );

        match validate_document(&doc) {
            Err(ConfigError::Validation(err)) => {
                assert_eq!(err.code, error_codes::ZERO_DATAPATH_ID)
            }
            other => panic!("expected ZERO_DATAPATH_ID, got {other:?}"),
        }
    }

    #[test]
    fn rejects_undeclared_vlan_reference() {
        let doc = document(
            r#"
            datapath_id: "0x1"
            interfaces:
              1: {native_vlan: 300}
            vlans:
              100: {}
            "#,
        );

        match validate_document(&doc) {
            Err(ConfigError::Validation(err)) => {
                assert_eq!(err.code, error_codes::UNDECLARED_VLAN);
                assert_eq!(err.path.as_deref(), Some("interfaces[1]"));
            }
            other => panic!("expected UNDECLARED_VLAN, got {other:?}"),
        }
    }

    #[test]
    fn rejects_interface_without_vlans() {
        let doc = document(
            r#"
            datapath_id: "0x1"
            interfaces:
              7: {name: spare}
            "#,
        );

        match validate_document(&doc) {
            Err(ConfigError::Validation(err)) => {
                assert_eq!(err.code, error_codes::UNASSIGNED_INTERFACE)
            }
            other => panic!("expected UNASSIGNED_INTERFACE, got {other:?}"),
        }
    }

    #[test]
    fn collects_multiple_errors() {
        let doc = document(
            r#"
            datapath_id: "0x0"
            interfaces:
              1: {native_vlan: 5000}
              2: {}
            vlans:
              5000: {}
            "#,
        );

        match validate_document(&doc) {
            Err(ConfigError::MultipleValidation(errors)) => {
                assert!(errors.len() >= 3, "got: {errors:?}");
                let display = ConfigError::MultipleValidation(errors).to_string();
                assert!(display.contains("multiple validation errors"));
            }
            other => panic!("expected MultipleValidation, got {other:?}"),
        }
    }
}
