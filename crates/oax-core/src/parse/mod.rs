pub mod media_type;
pub mod parameter;
pub mod server;

use serde_json::Value;

use crate::document::Version;
use crate::error::DocumentError;

/// Parse a description document from YAML. The dialect is checked but the
/// document is returned as a plain tree.
pub fn from_yaml(input: &str) -> Result<Value, DocumentError> {
    let root: Value = serde_yaml_ng::from_str(input)?;
    detect_version(&root)?;
    Ok(root)
}

/// Parse a description document from JSON.
pub fn from_json(input: &str) -> Result<Value, DocumentError> {
    let root: Value = serde_json::from_str(input)?;
    detect_version(&root)?;
    Ok(root)
}

/// Identify the dialect from the top-level `swagger` or `openapi` key.
pub fn detect_version(root: &Value) -> Result<Version, DocumentError> {
    if let Some(swagger) = root.get("swagger") {
        return match version_string(swagger) {
            Some(v) if v == "2" || v.starts_with("2.") => Ok(Version::V2),
            _ => Err(DocumentError::UnsupportedVersion(format!("swagger {swagger}"))),
        };
    }
    if let Some(openapi) = root.get("openapi") {
        return match version_string(openapi) {
            Some(v) if v == "3" || v.starts_with("3.") => Ok(Version::V3),
            _ => Err(DocumentError::UnsupportedVersion(format!("openapi {openapi}"))),
        };
    }
    let keys = root
        .as_object()
        .map(|o| o.keys().cloned().collect::<Vec<_>>().join(", "))
        .unwrap_or_else(|| "not an object".to_string());
    Err(DocumentError::Unrecognized(keys))
}

fn version_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_version() {
        assert_eq!(detect_version(&json!({"swagger": "2.0"})).unwrap(), Version::V2);
        assert_eq!(detect_version(&json!({"swagger": 2})).unwrap(), Version::V2);
        assert_eq!(detect_version(&json!({"openapi": "3.1.0"})).unwrap(), Version::V3);
        assert_eq!(detect_version(&json!({"openapi": "3.0.3"})).unwrap(), Version::V3);
    }

    #[test]
    fn test_rejects_other_versions() {
        let err = detect_version(&json!({"openapi": "4.0.0"})).unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedVersion(_)));
        let err = detect_version(&json!({"swagger": "1.2"})).unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedVersion(_)));
        let err = detect_version(&json!({"info": {}})).unwrap_err();
        assert!(matches!(err, DocumentError::Unrecognized(_)));
    }

    #[test]
    fn test_from_yaml() {
        let root = from_yaml("openapi: 3.0.0\ninfo: {title: t, version: '1'}\npaths: {}\n").unwrap();
        assert_eq!(root["info"]["title"], "t");
        assert!(from_yaml("openapi: [\n").is_err());
    }

    #[test]
    fn test_from_json() {
        let root = from_json(r#"{"swagger": "2.0", "paths": {}}"#).unwrap();
        assert_eq!(root["swagger"], "2.0");
        assert!(matches!(
            from_json("{}").unwrap_err(),
            DocumentError::Unrecognized(_)
        ));
    }
}
