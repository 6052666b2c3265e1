//! Field descriptors: one mapped column each.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// How a missing attribute gets its value.
#[derive(Clone)]
pub enum DefaultRule {
    Literal(Value),
    /// Evaluated each time a default is materialized (ids, timestamps).
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultRule {
    pub fn resolve(&self) -> Value {
        match self {
            DefaultRule::Literal(v) => v.clone(),
            DefaultRule::Producer(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultRule::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            DefaultRule::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Field {
    name: Option<String>,
    column_type: String,
    primary_key: bool,
    default: Option<DefaultRule>,
}

impl Field {
    pub fn new(column_type: impl Into<String>) -> Self {
        Field {
            name: None,
            column_type: column_type.into(),
            primary_key: false,
            default: None,
        }
    }

    pub fn string() -> Self {
        Self::new("varchar(100)")
    }

    pub fn integer() -> Self {
        Self::new("bigint").default_value(0)
    }

    pub fn boolean() -> Self {
        Self::new("boolean").default_value(false)
    }

    pub fn float() -> Self {
        Self::new("real").default_value(0.0)
    }

    pub fn text() -> Self {
        Self::new("text")
    }

    /// Column name when it differs from the attribute name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn ddl(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = column_type.into();
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultRule::Literal(value.into()));
        self
    }

    pub fn default_with<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultRule::Producer(Arc::new(producer)));
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn column_type(&self) -> &str {
        &self.column_type
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn default(&self) -> Option<&DefaultRule> {
        self.default.as_ref()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Field, {}:{}>", self.column_type, self.name.as_deref().unwrap_or("-"))
    }
}

/// Time-ordered unique id: 15-digit millisecond timestamp, uuid4 hex, `000` suffix (50 chars).
pub fn next_id() -> Value {
    let millis = chrono::Utc::now().timestamp_millis();
    Value::String(format!("{:015}{}000", millis, uuid::Uuid::new_v4().simple()))
}

/// Current UNIX time in fractional seconds.
pub fn now_timestamp() -> Value {
    let micros = chrono::Utc::now().timestamp_micros();
    serde_json::Number::from_f64(micros as f64 / 1_000_000.0)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
