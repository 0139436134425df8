use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use serde_json::Value;

/// Application-private data carried alongside the standard license fields.
///
/// The payload is an arbitrary JSON value that this crate never inspects or
/// validates. Structural checks belong to whichever component produces and
/// consumes it. Note that a verifier built without knowledge of a given
/// payload may refuse content that carries one.
///
/// The value is shared behind an [`Arc`]: cloning an `Extra` (or a
/// [`LicenseContent`](crate::LicenseContent) holding one) shares the payload
/// instead of copying it. Equality and hashing follow the JSON value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extra(Arc<Value>);

impl Extra {
    /// Wraps a JSON value.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    /// The wrapped JSON value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Whether both handles share the same payload allocation.
    #[must_use]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.0, &other.0)
    }

    /// The JSON text of the payload with every `-0.0` written as `0.0`.
    ///
    /// Values that compare equal render identically, so this text backs both
    /// [`Hash`] and the content fingerprint.
    pub(crate) fn canonical_text(&self) -> String {
        canonical(&self.0).to_string()
    }
}

/// Rewrites negative zero, which compares equal to zero but prints
/// differently. Object keys are already sorted.
fn canonical(value: &Value) -> Value {
    match value {
        Value::Number(number)
            if number
                .as_f64()
                .is_some_and(|f| f.to_bits() == (-0.0_f64).to_bits()) =>
        {
            Value::from(0.0_f64)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), canonical(value)))
                .collect(),
        ),
        other => other.clone(),
    }
}

impl Hash for Extra {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical_text().hash(state);
    }
}

impl fmt::Display for Extra {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Value> for Extra {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Extra {
    fn from(value: &str) -> Self {
        Self::new(Value::String(value.to_string()))
    }
}

impl From<String> for Extra {
    fn from(value: String) -> Self {
        Self::new(Value::String(value))
    }
}
