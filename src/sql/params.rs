//! Convert serde_json::Value to types the `Any` driver can bind.

use serde_json::Value;
use sqlx::any::{Any, AnyArguments};
use sqlx::query::Query;

/// A value that can be bound positionally. Arrays and objects are bound as JSON text.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Text(String),
}

impl BindValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => BindValue::Null,
            Value::Bool(b) => BindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    BindValue::I64(i)
                } else if let Some(f) = n.as_f64() {
                    BindValue::F64(f)
                } else {
                    BindValue::Text(n.to_string())
                }
            }
            Value::String(s) => BindValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => BindValue::Text(v.to_string()),
        }
    }
}

/// Bind every argument in order.
pub fn bind_all<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    args: &[Value],
) -> Query<'q, Any, AnyArguments<'q>> {
    for arg in args {
        query = match BindValue::from_json(arg) {
            BindValue::Null => query.bind(None::<String>),
            BindValue::Bool(b) => query.bind(b),
            BindValue::I64(n) => query.bind(n),
            BindValue::F64(n) => query.bind(n),
            BindValue::Text(s) => query.bind(s),
        };
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_prefer_integers() {
        assert_eq!(BindValue::from_json(&json!(42)), BindValue::I64(42));
        assert_eq!(BindValue::from_json(&json!(1.5)), BindValue::F64(1.5));
    }

    #[test]
    fn nested_values_bind_as_json_text() {
        assert_eq!(
            BindValue::from_json(&json!({"a": [1, 2]})),
            BindValue::Text("{\"a\":[1,2]}".into())
        );
        assert_eq!(BindValue::from_json(&Value::Null), BindValue::Null);
    }
}
