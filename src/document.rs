//! Read-only, path-addressable view over a JSON document.

use crate::path;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// A parsed JSON document that can be queried with dotted paths.
///
/// Lookups never fail: a missing path, or a body that was not valid JSON,
/// yields an empty document whose accessors return zero values (`""`,
/// `None`, an empty list).
///
/// # Examples
///
/// ```
/// use nxapi::Document;
///
/// let doc = Document::parse(r#"{"imdata":[{"l1PhysIf":{"attributes":{"id":"eth1/1"}}}]}"#);
///
/// assert_eq!(doc.get("imdata.0.l1PhysIf.attributes.id").str(), "eth1/1");
/// assert_eq!(doc.get("imdata.1.l1PhysIf.attributes.id").str(), "");
/// assert!(!doc.get("totalCount").exists());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    value: Option<Value>,
}

impl Document {
    /// Parses `json` leniently. Invalid or empty input gives an empty document.
    pub fn parse(json: &str) -> Self {
        Self {
            value: serde_json::from_str(json).ok(),
        }
    }

    /// Returns the sub-document at `path`.
    pub fn get(&self, path: &str) -> Document {
        let value = self
            .value
            .as_ref()
            .zip(path::parse(path))
            .and_then(|(root, segments)| path::get(root, &segments))
            .cloned();
        Document { value }
    }

    /// Returns `true` if this document holds a value.
    pub fn exists(&self) -> bool {
        self.value.is_some()
    }

    /// Returns the underlying JSON value, if any.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Returns the string value, or `""` when the value is missing or not a string.
    pub fn str(&self) -> &str {
        self.value.as_ref().and_then(Value::as_str).unwrap_or("")
    }

    /// Returns a textual rendering of any value.
    ///
    /// Strings come back unquoted, other scalars in their JSON form, containers
    /// as compact JSON and a missing value as `""`.
    pub fn string(&self) -> String {
        match &self.value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Returns the value as an integer. Numeric strings are accepted too,
    /// since the device reports most counters as strings.
    pub fn as_i64(&self) -> Option<i64> {
        match self.value.as_ref()? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Returns the value as a float, accepting numeric strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self.value.as_ref()? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Returns the value as a boolean, accepting `"true"`/`"false"` strings.
    pub fn as_bool(&self) -> Option<bool> {
        match self.value.as_ref()? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Returns the elements of an array.
    ///
    /// A scalar or object yields a one-element list, a missing value an empty one.
    pub fn array(&self) -> Vec<Document> {
        match &self.value {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.iter().cloned().map(Document::from).collect(),
            Some(other) => vec![Document::from(other.clone())],
        }
    }

    /// Returns the compact JSON text of the value, or `""` if missing.
    pub fn raw(&self) -> String {
        self.value
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_default()
    }

    /// Deserializes the value into a typed structure.
    pub fn deserialize<T>(&self) -> serde_json::Result<T>
    where
        T: DeserializeOwned,
    {
        T::deserialize(self.value.as_ref().unwrap_or(&Value::Null))
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Self { value: Some(value) }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    const CLASS_RESPONSE: &str = r#"{
        "totalCount": "2",
        "imdata": [
            {"l1PhysIf": {"attributes": {"id": "eth1/1", "mtu": "9216", "adminSt": "up"}}},
            {"l1PhysIf": {"attributes": {"id": "eth1/2", "mtu": "1500", "adminSt": "down"}}}
        ]
    }"#;

    #[test]
    fn test_missing_values_are_zero() {
        let doc = Document::parse(CLASS_RESPONSE);
        let missing = doc.get("imdata.5.l1PhysIf");
        assert!(!missing.exists());
        assert_eq!(missing.str(), "");
        assert_eq!(missing.string(), "");
        assert_eq!(missing.raw(), "");
        assert!(missing.array().is_empty());
        assert_eq!(missing.as_i64(), None);
    }

    #[test]
    fn test_invalid_json_is_empty() {
        let doc = Document::parse("<html>not json</html>");
        assert!(!doc.exists());
        assert!(!Document::parse("").exists());
    }

    #[test]
    fn test_array_and_scalars() {
        let doc = Document::parse(CLASS_RESPONSE);
        let items = doc.get("imdata").array();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].get("l1PhysIf.attributes.id").str(), "eth1/2");
        assert_eq!(doc.get("totalCount").as_i64(), Some(2));
        assert_eq!(doc.get("totalCount").array().len(), 1);
    }

    #[test]
    fn test_string_renders_any_value() {
        let doc = Document::parse(r#"{"n": 5, "b": false, "o": {"k": "v"}, "s": "text"}"#);
        assert_eq!(doc.get("n").string(), "5");
        assert_eq!(doc.get("b").string(), "false");
        assert_eq!(doc.get("o").string(), r#"{"k":"v"}"#);
        assert_eq!(doc.get("s").string(), "text");
        assert_eq!(doc.get("s").raw(), r#""text""#);
        assert_eq!(doc.get("n").str(), "");
    }

    #[test]
    fn test_deserialize_typed_view() {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Attributes {
            id: String,
            admin_st: String,
        }

        let doc = Document::parse(CLASS_RESPONSE);
        let attrs: Attributes = doc
            .get("imdata.0.l1PhysIf.attributes")
            .deserialize()
            .unwrap();
        assert_eq!(attrs.id, "eth1/1");
        assert_eq!(attrs.admin_st, "up");
    }
}
