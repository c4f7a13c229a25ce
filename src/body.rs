//! Fluent builder for schemaless JSON request bodies.

use crate::{path, Document};
use serde_json::Value;
use std::fmt;

/// A JSON text buffer edited through dotted paths.
///
/// Every write returns the updated body, so payloads can be built in one
/// expression. Writes against a buffer that is not valid JSON, or with an
/// empty path, leave the buffer unchanged.
///
/// # Examples
///
/// ```
/// use nxapi::Body;
///
/// let body = Body::new()
///     .set("bgpInst.attributes.asn", "100")
///     .set_raw("bgpInst.children", "[]");
///
/// assert_eq!(body.as_str(), r#"{"bgpInst":{"attributes":{"asn":"100"},"children":[]}}"#);
/// assert_eq!(body.document().get("bgpInst.attributes.asn").str(), "100");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    json: String,
}

impl Body {
    /// Creates an empty body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a string value at `path`.
    pub fn set(self, path: &str, value: impl Into<String>) -> Self {
        self.set_value(path, Value::String(value.into()))
    }

    /// Sets any JSON value at `path`, e.g. a number or boolean.
    pub fn set_value(self, path: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.edit(path, |root, segments| path::set(root, segments, value))
    }

    /// Splices the raw JSON text `raw` in at `path`.
    ///
    /// This is mostly used to nest bodies built separately:
    ///
    /// ```
    /// use nxapi::Body;
    ///
    /// let inner = Body::new().set("asn", "100");
    /// let body = Body::new().set_raw("bgpInst.attributes", inner.as_str());
    /// assert_eq!(body.document().get("bgpInst.attributes.asn").str(), "100");
    /// ```
    pub fn set_raw(self, path: &str, raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => self.set_value(path, value),
            Err(e) => {
                tracing::debug!(path = path, error = %e, "Ignoring invalid raw JSON value");
                self
            }
        }
    }

    /// Removes the value at `path`. A missing path leaves the body untouched.
    pub fn delete(self, path: &str) -> Self {
        self.edit(path, path::delete)
    }

    /// Returns a readable view of the current buffer.
    pub fn document(&self) -> Document {
        Document::parse(&self.json)
    }

    /// Returns the JSON text.
    pub fn as_str(&self) -> &str {
        &self.json
    }

    /// Consumes the body and returns the JSON text.
    pub fn into_string(self) -> String {
        self.json
    }

    fn edit(self, path: &str, op: impl FnOnce(&mut Value, &[String]) -> bool) -> Self {
        let Some(segments) = path::parse(path) else {
            return self;
        };

        let mut root = if self.json.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&self.json) {
                Ok(root) => root,
                Err(e) => {
                    tracing::debug!(
                        path = path,
                        error = %e,
                        "Body is not valid JSON, skipping edit"
                    );
                    return self;
                }
            }
        };

        if !op(&mut root, &segments) {
            return self;
        }

        match serde_json::to_string(&root) {
            Ok(json) => Self { json },
            Err(_) => self,
        }
    }
}

impl From<String> for Body {
    fn from(json: String) -> Self {
        Self { json }
    }
}

impl From<&str> for Body {
    fn from(json: &str) -> Self {
        Self {
            json: json.to_owned(),
        }
    }
}

impl From<Body> for String {
    fn from(body: Body) -> Self {
        body.json
    }
}

impl AsRef<str> for Body {
    fn as_ref(&self) -> &str {
        &self.json
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let body = Body::new().set("a.name", "a");
        assert_eq!(body.document().get("a.name").str(), "a");
    }

    #[test]
    fn test_set_raw() {
        let name = Body::new()
            .set_raw("a", r#"{"name":"a"}"#)
            .document()
            .get("a.name")
            .string();
        assert_eq!(name, "a");
    }

    #[test]
    fn test_delete() {
        let body = Body::new().set_raw("a", r#"{"name":"a"}"#);
        assert_eq!(body.document().get("a.name").str(), "a");

        let body = body.delete("a.name");
        assert_eq!(body.document().get("a.name").str(), "");
        assert_eq!(body.as_str(), r#"{"a":{}}"#);
    }

    #[test]
    fn test_delete_missing_path_is_a_no_op() {
        let original = Body::from(r#"{ "b" : 1 }"#);
        assert_eq!(original.clone().delete("a.name"), original);
        assert_eq!(Body::new().delete("a"), Body::new());
    }

    #[test]
    fn test_invalid_document_is_left_alone() {
        let broken = Body::from("{not json");
        assert_eq!(broken.clone().set("a", "b"), broken);
        assert_eq!(broken.clone().delete("a"), broken);
    }

    #[test]
    fn test_unreachable_index_is_a_no_op() {
        let body = Body::new().set("a.0", "x");
        assert_eq!(body.clone().set("a.18446744073709551615", "y"), body);
        assert_eq!(body.clone().set("a.999999999999", "y"), body);
        assert_eq!(Body::new().set("a.18446744073709551615", "y"), Body::new());
    }

    #[test]
    fn test_invalid_raw_value_is_ignored() {
        let body = Body::new().set("a", "1");
        assert_eq!(body.clone().set_raw("b", "{oops"), body);
    }

    #[test]
    fn test_numeric_paths_build_envelopes() {
        let body = Body::new()
            .set("imdata.0.l1PhysIf.attributes.id", "eth1/1")
            .set("imdata.1.l1PhysIf.attributes.id", "eth1/2");
        assert_eq!(
            body.as_str(),
            r#"{"imdata":[{"l1PhysIf":{"attributes":{"id":"eth1/1"}}},{"l1PhysIf":{"attributes":{"id":"eth1/2"}}}]}"#
        );
    }

    #[test]
    fn test_set_value_keeps_json_types() {
        let body = Body::from("[]")
            .set("0.jsonrpc", "2.0")
            .set_value("0.params.version", 1)
            .set_value("0.id", 1);
        assert_eq!(
            body.as_str(),
            r#"[{"jsonrpc":"2.0","params":{"version":1},"id":1}]"#
        );
    }

    #[test]
    fn test_key_order_is_preserved() {
        let body = Body::new().set("z", "1").set("a", "2");
        assert_eq!(body.as_str(), r#"{"z":"1","a":"2"}"#);
    }
}
