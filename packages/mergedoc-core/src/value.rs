use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Leaf value stored in a register.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    F64(f64),
    Str(String),
}

impl ScalarValue {
    /// Convert a JSON leaf. Returns `None` for maps and arrays.
    pub fn from_json(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Null => ScalarValue::Null,
            Value::Bool(b) => ScalarValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ScalarValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    ScalarValue::Uint(u)
                } else {
                    ScalarValue::F64(n.as_f64().unwrap_or_default())
                }
            }
            Value::String(s) => ScalarValue::Str(s.clone()),
            Value::Array(_) | Value::Object(_) => return None,
        })
    }

    pub fn to_json(&self) -> Value {
        match self {
            ScalarValue::Null => Value::Null,
            ScalarValue::Bool(b) => Value::Bool(*b),
            ScalarValue::Int(i) => Value::from(*i),
            ScalarValue::Uint(u) => Value::from(*u),
            ScalarValue::F64(f) => Value::from(*f),
            ScalarValue::Str(s) => Value::String(s.clone()),
        }
    }
}
