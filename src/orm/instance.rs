//! Model instances: attribute values bound to a descriptor.

use crate::error::AppError;
use crate::orm::model::ModelDescriptor;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct Model {
    descriptor: Arc<ModelDescriptor>,
    values: Map<String, Value>,
}

impl Model {
    pub fn new(descriptor: Arc<ModelDescriptor>) -> Self {
        Model {
            descriptor,
            values: Map::new(),
        }
    }

    /// Instance from keyword values. Keys are attribute names.
    pub fn from_values<I, K>(descriptor: Arc<ModelDescriptor>, values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Model {
            descriptor,
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Instance from a result row keyed by column name.
    pub fn from_row(descriptor: Arc<ModelDescriptor>, row: Map<String, Value>) -> Self {
        let values = row
            .into_iter()
            .map(|(column, v)| (descriptor.attribute_for_column(&column).to_string(), v))
            .collect();
        Model { descriptor, values }
    }

    pub fn with(mut self, attr: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(attr, value);
        self
    }

    pub fn descriptor(&self) -> &Arc<ModelDescriptor> {
        &self.descriptor
    }

    pub fn get(&self, attr: &str) -> Option<&Value> {
        self.values.get(attr)
    }

    /// Current value, or null when absent.
    pub fn get_value(&self, attr: &str) -> Value {
        self.values.get(attr).cloned().unwrap_or(Value::Null)
    }

    pub fn get_str(&self, attr: &str) -> Option<&str> {
        self.values.get(attr).and_then(Value::as_str)
    }

    pub fn set(&mut self, attr: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(attr.into(), value.into());
    }

    pub fn contains(&self, attr: &str) -> bool {
        self.values.contains_key(attr)
    }

    /// Current value; when absent or null, the field's default is resolved, stored on this
    /// instance and returned. Later reads see the same stored value.
    pub fn get_value_or_default(&mut self, attr: &str) -> Result<Value, AppError> {
        if let Some(v) = self.values.get(attr).filter(|v| !v.is_null()) {
            return Ok(v.clone());
        }
        let field = self.descriptor.field(attr).ok_or_else(|| AppError::UnknownField {
            table: self.descriptor.table().to_string(),
            field: attr.to_string(),
        })?;
        let Some(rule) = field.default() else {
            return Ok(self.get_value(attr));
        };
        let value = rule.resolve();
        tracing::debug!("using default value for {}: {}", attr, value);
        self.values.insert(attr.to_string(), value.clone());
        Ok(value)
    }

    pub fn primary_key_value(&self) -> Value {
        self.get_value(self.descriptor.primary_key())
    }

    /// Arguments for the insert template: every non-key field, defaults resolved, in
    /// declaration order, then the primary key.
    pub fn insert_args(&mut self) -> Result<Vec<Value>, AppError> {
        let descriptor = Arc::clone(&self.descriptor);
        let mut args = Vec::with_capacity(descriptor.fields().len() + 1);
        for attr in descriptor.fields() {
            args.push(self.get_value_or_default(attr)?);
        }
        args.push(self.get_value_or_default(descriptor.primary_key())?);
        Ok(args)
    }

    /// Arguments for the update template: current non-key values, then the primary key.
    /// A key-only model sets the key to itself.
    pub fn update_args(&self) -> Vec<Value> {
        let mut args: Vec<Value> = self.descriptor.fields().iter().map(|attr| self.get_value(attr)).collect();
        if args.is_empty() {
            args.push(self.primary_key_value());
        }
        args.push(self.primary_key_value());
        args
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }
}

impl Serialize for Model {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}
