//! Parameter codec - query-string serialization for auxiliary params.
//!
//! A fragment URL can carry rich values even though the transport is
//! plain query parameters. Two markers keep decoding symmetric
//! per-key:
//!
//! - plain string values pass through untouched under their own key;
//! - any other JSON value is encoded and its key gains the [`PARAM_PREFIX`]
//!   so the decoder knows to interpret it;
//! - a value starting with the object-reference prefix (`___`) decodes
//!   into a live [`DomainObject`] through the store.
//!
//! # Example
//!
//! ```
//! use hx_dispatch::codec;
//! use serde_json::json;
//!
//! let (key, value) = codec::encode("count", &json!(3)).unwrap();
//! assert_eq!((key.as_str(), value.as_str()), ("hxp_count", "3"));
//!
//! let (key, decoded) = codec::decode("hxp_count", "3").unwrap();
//! assert_eq!(key, "count");
//! assert_eq!(decoded, codec::Param::Value(json!(3)));
//! ```

mod object_ref;

pub use object_ref::{
    DomainObject, ObjectRef, ObjectStore, OBJECT_REF_DELIM, OBJECT_REF_PREFIX,
};

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::error::{HxError, Result};
use crate::protocol::{NAME_PARAM, OBJECT_PARAM};

/// Key prefix marking a parameter produced by [`encode`].
pub const PARAM_PREFIX: &str = "hxp_";

/// One decoded auxiliary parameter.
pub enum Param {
    /// A plain or JSON-decoded value.
    Value(Value),
    /// A resolved domain object (the raw value carried a reference).
    Object(Box<dyn DomainObject>),
}

impl Param {
    /// Projection of this parameter into the template context.
    pub fn context_value(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Object(object) => object.context(),
        }
    }

    /// The string form, for parameters that were plain strings.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Value(Value::String(s)) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Object(object) => f.debug_tuple("Object").field(&object.object_ref()).finish(),
        }
    }
}

impl PartialEq for Param {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.object_ref() == b.object_ref(),
            _ => false,
        }
    }
}

/// Decoded auxiliary parameters, in deterministic key order.
pub type Params = BTreeMap<String, Param>;

/// Encode one auxiliary parameter into a `(key, value)` query pair.
///
/// Strings pass through untouched; everything else is JSON-encoded
/// under a prefixed key.
pub fn encode(key: &str, value: &Value) -> Result<(String, String)> {
    match value {
        Value::String(s) => Ok((key.to_string(), s.clone())),
        other => Ok((format!("{PARAM_PREFIX}{key}"), serde_json::to_string(other)?)),
    }
}

/// Decode one query pair. Only keys carrying [`PARAM_PREFIX`] are
/// interpreted; anything else passes through as a raw string.
pub fn decode(key: &str, raw: &str) -> Result<(String, Param)> {
    match key.strip_prefix(PARAM_PREFIX) {
        Some(stripped) => {
            let value =
                serde_json::from_str(raw).map_err(|err| HxError::MalformedParam {
                    key: key.to_string(),
                    reason: err.to_string(),
                })?;
            Ok((stripped.to_string(), Param::Value(value)))
        }
        None => Ok((key.to_string(), Param::Value(Value::String(raw.to_string())))),
    }
}

/// Decoded request parameters: the auxiliary map plus the object the
/// reserved `object` parameter referenced, if any.
pub struct DecodedParams {
    /// Auxiliary parameters by (unprefixed) key.
    pub params: Params,
    /// The `hx_object` to attach to the handler.
    pub object: Option<Box<dyn DomainObject>>,
}

/// Decode every auxiliary query pair of a fragment request.
///
/// The handler-name parameter is skipped (the dispatcher consumes it);
/// the reserved `object` parameter and any value carrying the
/// reference prefix resolve through the store, and a reference to a
/// record that no longer exists is an [`HxError::ObjectNotFound`].
pub fn decode_params(
    pairs: &[(String, String)],
    store: &dyn ObjectStore,
) -> Result<DecodedParams> {
    let mut params = Params::new();
    let mut object = None;

    for (key, raw) in pairs {
        if key == NAME_PARAM {
            continue;
        }
        if ObjectRef::is_encoded(raw) {
            let reference = ObjectRef::parse(raw).ok_or_else(|| HxError::MalformedParam {
                key: key.clone(),
                reason: "invalid object reference".into(),
            })?;
            let resolved = store
                .get(&reference)
                .ok_or(HxError::ObjectNotFound(reference))?;
            if key == OBJECT_PARAM {
                object = Some(resolved);
            } else {
                params.insert(key.clone(), Param::Object(resolved));
            }
            continue;
        }
        let (key, param) = decode(key, raw)?;
        params.insert(key, param);
    }

    Ok(DecodedParams { params, object })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EmptyStore;
    impl ObjectStore for EmptyStore {
        fn get(&self, _reference: &ObjectRef) -> Option<Box<dyn DomainObject>> {
            None
        }
    }

    struct FakeWidget(ObjectRef);
    impl DomainObject for FakeWidget {
        fn object_ref(&self) -> ObjectRef {
            self.0.clone()
        }
        fn context(&self) -> Value {
            json!({"pk": self.0.pk})
        }
        fn delete(&self) -> Result<()> {
            Ok(())
        }
    }

    struct WidgetStore;
    impl ObjectStore for WidgetStore {
        fn get(&self, reference: &ObjectRef) -> Option<Box<dyn DomainObject>> {
            (reference.model == "Widget").then(|| {
                Box::new(FakeWidget(reference.clone())) as Box<dyn DomainObject>
            })
        }
    }

    #[test]
    fn test_string_passes_through_unprefixed() {
        let (key, value) = encode("title", &json!("Edit widget")).unwrap();
        assert_eq!(key, "title");
        assert_eq!(value, "Edit widget");

        let (key, param) = decode(&key, &value).unwrap();
        assert_eq!(key, "title");
        assert_eq!(param, Param::Value(json!("Edit widget")));
    }

    #[test]
    fn test_structured_value_round_trip() {
        for value in [
            json!(42),
            json!(true),
            json!(null),
            json!([1, 2, 3]),
            json!({"a": 1, "b": "two"}),
        ] {
            let (key, raw) = encode("payload", &value).unwrap();
            assert!(key.starts_with(PARAM_PREFIX));
            let (key, param) = decode(&key, &raw).unwrap();
            assert_eq!(key, "payload");
            assert_eq!(param, Param::Value(value));
        }
    }

    #[test]
    fn test_unprefixed_key_never_decoded() {
        // Raw JSON-looking text under a plain key stays a string.
        let (_, param) = decode("note", "[1,2]").unwrap();
        assert_eq!(param, Param::Value(json!("[1,2]")));
    }

    #[test]
    fn test_malformed_prefixed_value() {
        let result = decode("hxp_count", "{not json");
        assert!(matches!(result, Err(HxError::MalformedParam { .. })));
    }

    #[test]
    fn test_decode_params_resolves_object() {
        let pairs = vec![
            (NAME_PARAM.to_string(), "delete_widget".to_string()),
            ("object".to_string(), "___shop:Widget:42".to_string()),
            ("hxp_page".to_string(), "2".to_string()),
            ("note".to_string(), "hello".to_string()),
        ];
        let decoded = decode_params(&pairs, &WidgetStore).unwrap();
        let object = decoded.object.expect("object attached");
        assert_eq!(object.object_ref(), ObjectRef::new("shop", "Widget", 42));
        // The name and object params are not auxiliary params.
        assert!(!decoded.params.contains_key(NAME_PARAM));
        assert!(!decoded.params.contains_key("object"));
        assert_eq!(
            decoded.params.get("page"),
            Some(&Param::Value(json!(2)))
        );
        assert_eq!(
            decoded.params.get("note"),
            Some(&Param::Value(json!("hello")))
        );
    }

    #[test]
    fn test_object_reference_in_auxiliary_param() {
        let pairs = vec![("parent".to_string(), "___shop:Widget:7".to_string())];
        let decoded = decode_params(&pairs, &WidgetStore).unwrap();
        assert!(decoded.object.is_none());
        match decoded.params.get("parent") {
            Some(Param::Object(object)) => {
                assert_eq!(object.object_ref().pk, 7);
            }
            other => panic!("expected resolved object, got {other:?}"),
        }
    }

    #[test]
    fn test_dangling_reference_is_object_not_found() {
        let pairs = vec![("object".to_string(), "___shop:Widget:42".to_string())];
        let result = decode_params(&pairs, &EmptyStore);
        assert!(matches!(result, Err(HxError::ObjectNotFound(_))));
    }

    #[test]
    fn test_garbled_reference_is_malformed() {
        let pairs = vec![("object".to_string(), "___shop".to_string())];
        let result = decode_params(&pairs, &WidgetStore);
        assert!(matches!(result, Err(HxError::MalformedParam { .. })));
    }
}
