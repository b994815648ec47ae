//! Structured status snapshots.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use boxwire_types::{ObjectId, Value};

use crate::proxy::{downcast, Proxy, ProxyRef};

/// A decoded field value.
#[derive(Clone)]
pub enum FieldValue {
    None,
    Bool(bool),
    Value(Value),
    Tuple(Vec<FieldValue>),
    List(Vec<FieldValue>),
    /// Keyed entries in first-insertion order; re-inserting a key replaces
    /// its value in place.
    Dict(Vec<(Value, FieldValue)>),
    Object(ProxyRef),
}

impl FieldValue {
    pub fn is_none(&self) -> bool {
        matches!(self, FieldValue::None)
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        self.as_value().and_then(Value::as_int)
    }

    pub fn as_float(&self) -> Option<f64> {
        self.as_value().and_then(Value::as_float)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ProxyRef> {
        match self {
            FieldValue::Object(p) => Some(p),
            _ => None,
        }
    }

    /// Value stored under `key` in a dict.
    pub fn dict_get(&self, key: &Value) -> Option<&FieldValue> {
        match self {
            FieldValue::Dict(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub(crate) fn dict_insert(entries: &mut Vec<(Value, FieldValue)>, key: Value, value: FieldValue) {
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => entries.push((key, value)),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            FieldValue::None => J::Null,
            FieldValue::Bool(b) => J::Bool(*b),
            FieldValue::Value(v) => value_to_json(v),
            FieldValue::Tuple(items) | FieldValue::List(items) => {
                J::Array(items.iter().map(FieldValue::to_json).collect())
            }
            FieldValue::Dict(entries) => J::Object(
                entries
                    .iter()
                    .map(|(k, v)| (key_string(k), v.to_json()))
                    .collect(),
            ),
            FieldValue::Object(p) => match p.id() {
                Some(id) => J::String(id.to_string()),
                None => J::String(p.core().base_path().to_string()),
            },
        }
    }
}

fn key_string(v: &Value) -> String {
    match v {
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    }
}

fn value_to_json(v: &Value) -> serde_json::Value {
    use serde_json::Value as J;
    match v {
        Value::Int(i) => J::from(*i),
        Value::Float(f) => J::from(*f),
        Value::Str(s) => J::String(s.clone()),
        Value::Blob(b) => J::Array(b.iter().map(|&x| J::from(x)).collect()),
        Value::Uuid(id) => J::String(id.to_string()),
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::None, FieldValue::None) => true,
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a == b,
            (FieldValue::Value(a), FieldValue::Value(b)) => a == b,
            (FieldValue::Tuple(a), FieldValue::Tuple(b)) => a == b,
            (FieldValue::List(a), FieldValue::List(b)) => a == b,
            (FieldValue::Dict(a), FieldValue::Dict(b)) => a == b,
            (FieldValue::Object(a), FieldValue::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::None => write!(f, "None"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Value(v) => write!(f, "{}", v),
            FieldValue::Tuple(items) => {
                let mut t = f.debug_tuple("");
                for item in items {
                    t.field(item);
                }
                t.finish()
            }
            FieldValue::List(items) => f.debug_list().entries(items).finish(),
            FieldValue::Dict(entries) => f
                .debug_map()
                .entries(entries.iter().map(|(k, v)| (k, v)))
                .finish(),
            FieldValue::Object(p) => write!(f, "{:?}", p),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Value(Value::Int(v))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Value(Value::Float(v))
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Value(Value::Str(v.to_string()))
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Value(Value::Str(v))
    }
}

impl From<ObjectId> for FieldValue {
    fn from(v: ObjectId) -> Self {
        FieldValue::Value(Value::Uuid(v))
    }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        FieldValue::Value(v)
    }
}

impl<A: Into<FieldValue>, B: Into<FieldValue>> From<(A, B)> for FieldValue {
    fn from((a, b): (A, B)) -> Self {
        FieldValue::Tuple(vec![a.into(), b.into()])
    }
}

impl<A: Into<FieldValue>, B: Into<FieldValue>, C: Into<FieldValue>> From<(A, B, C)> for FieldValue {
    fn from((a, b, c): (A, B, C)) -> Self {
        FieldValue::Tuple(vec![a.into(), b.into(), c.into()])
    }
}

/// Point-in-time read of one object's status fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    class: String,
    fields: BTreeMap<String, FieldValue>,
    /// Single-argument events no declared field claimed.
    extra: BTreeMap<String, Value>,
}

impl Snapshot {
    pub(crate) fn new(class: &str) -> Self {
        Self {
            class: class.to_string(),
            fields: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    pub(crate) fn slot_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        self.fields.get_mut(name)
    }

    pub(crate) fn init(&mut self, name: &str, value: FieldValue) {
        self.fields.insert(name.to_string(), value);
    }

    pub(crate) fn set_extra(&mut self, key: &str, value: Value) {
        self.extra.insert(key.to_string(), value);
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Value absorbed from an undeclared single-argument event.
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn extras(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.extra.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn int(&self, name: &str) -> Option<i32> {
        self.get(name).and_then(FieldValue::as_int)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_float)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(FieldValue::as_bool)
    }

    pub fn list(&self, name: &str) -> &[FieldValue] {
        match self.get(name) {
            Some(FieldValue::List(items)) => items,
            _ => &[],
        }
    }

    pub fn dict(&self, name: &str) -> &[(Value, FieldValue)] {
        match self.get(name) {
            Some(FieldValue::Dict(entries)) => entries,
            _ => &[],
        }
    }

    /// Nested object field, downcast to its proxy type.
    pub fn object<T: Proxy>(&self, name: &str) -> Option<Arc<T>> {
        self.get(name)
            .and_then(FieldValue::as_object)
            .and_then(|p| downcast(p.clone()))
    }

    /// List of nested objects, downcast to their proxy type. Elements of
    /// another type are skipped.
    pub fn objects<T: Proxy>(&self, name: &str) -> Vec<Arc<T>> {
        self.list(name)
            .iter()
            .filter_map(FieldValue::as_object)
            .filter_map(|p| downcast(p.clone()))
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (k, v) in &self.fields {
            map.insert(k.clone(), v.to_json());
        }
        for (k, v) in &self.extra {
            map.entry(k.clone()).or_insert_with(|| value_to_json(v));
        }
        serde_json::Value::Object(map)
    }
}
