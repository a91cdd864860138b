//! High-performance JSON operations using sonic-rs.

use crate::{Error, Result};
use serde::{Serialize, de::DeserializeOwned};

/// Deserialize JSON string.
///
/// # Errors
/// Returns error if JSON is invalid.
pub fn from_json<T: DeserializeOwned>(s: &str) -> Result<T> {
    sonic_rs::from_str(s).map_err(Error::from)
}

/// Deserialize JSON bytes.
///
/// # Errors
/// Returns error if JSON is invalid.
pub fn from_json_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    sonic_rs::from_slice(bytes).map_err(Error::from)
}

/// Serialize to compact JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    sonic_rs::to_string(value).map_err(Error::from)
}

/// Serialize to pretty JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    sonic_rs::to_string_pretty(value).map_err(Error::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Manifest {
        name: String,
        #[serde(default)]
        require: BTreeMap<String, String>,
        #[serde(rename = "minimum-stability", default)]
        minimum_stability: Option<crate::Stability>,
    }

    #[test]
    fn reads_manifest_shape() {
        let manifest: Manifest = from_json(
            r#"{"name": "acme/app", "require": {"php": ">=8.1"}, "minimum-stability": "beta"}"#,
        )
        .unwrap();
        assert_eq!(manifest.name, "acme/app");
        assert_eq!(manifest.require["php"], ">=8.1");
        assert_eq!(manifest.minimum_stability, Some(crate::Stability::Beta));
    }

    #[test]
    fn slice_and_string_agree() {
        let raw = br#"{"name": "acme/app"}"#;
        let a: Manifest = from_json_slice(raw).unwrap();
        let b: Manifest = from_json(std::str::from_utf8(raw).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn pretty_output_is_multiline() {
        let manifest = Manifest {
            name: "acme/app".into(),
            require: BTreeMap::from([("psr/log".into(), "^3.0".into())]),
            minimum_stability: None,
        };
        let pretty = to_json_pretty(&manifest).unwrap();
        assert!(pretty.contains('\n'));
        assert_eq!(from_json::<Manifest>(&pretty).unwrap(), manifest);
        assert!(!to_json(&manifest).unwrap().contains('\n'));
    }

    #[test]
    fn invalid_json_is_an_error() {
        let err = from_json::<Manifest>("{\"name\": ").unwrap_err();
        assert!(matches!(err, crate::Error::Json(_)));
    }
}
