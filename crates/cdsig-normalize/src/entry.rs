//! The normalization entry tree
//!
//! The canonical form is a list of single-key entries. Entry lists are
//! sorted lexicographically by key after recursive descent; plain lists
//! (resources, references) keep their order.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// A single key/value pair in the canonical tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub value: Value,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// A canonical value: null, a string, a sortable entry list, or a plain
/// list whose order is semantic.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Entries(Vec<Entry>),
    List(Vec<Value>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }
}

/// Recursively sort entry lists by key. Plain lists are descended into
/// but their order is preserved.
pub fn deep_sort(entries: &mut [Entry]) {
    for entry in entries.iter_mut() {
        sort_value(&mut entry.value);
    }
    entries.sort_by(|a, b| a.key.cmp(&b.key));
}

fn sort_value(value: &mut Value) {
    match value {
        Value::Entries(entries) => deep_sort(entries),
        Value::List(values) => {
            for v in values {
                sort_value(v);
            }
        }
        Value::Null | Value::String(_) => {}
    }
}

// Serialized as a JSON object with exactly one key, so the canonical
// bytes match the persisted digests produced by existing tooling.
impl Serialize for Entry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.key, &self.value)?;
        map.end()
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::String(s) => serializer.serialize_str(s),
            Value::Entries(entries) => entries.serialize(serializer),
            Value::List(values) => values.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_serialize_as_single_key_objects() {
        let e = Entry::new("name", Value::string("x"));
        assert_eq!(serde_json::to_string(&e).unwrap(), r#"{"name":"x"}"#);
    }

    #[test]
    fn null_value() {
        let e = Entry::new("extraIdentity", Value::Null);
        assert_eq!(
            serde_json::to_string(&e).unwrap(),
            r#"{"extraIdentity":null}"#
        );
    }

    #[test]
    fn deep_sort_orders_by_key_at_every_level() {
        let mut entries = vec![
            Entry::new(
                "b",
                Value::Entries(vec![
                    Entry::new("z", Value::string("1")),
                    Entry::new("a", Value::string("2")),
                ]),
            ),
            Entry::new("a", Value::string("0")),
        ];
        deep_sort(&mut entries);
        assert_eq!(
            serde_json::to_string(&entries).unwrap(),
            r#"[{"a":"0"},{"b":[{"a":"2"},{"z":"1"}]}]"#
        );
    }

    #[test]
    fn list_order_is_preserved() {
        let mut entries = vec![Entry::new(
            "resources",
            Value::List(vec![Value::string("second"), Value::string("first")]),
        )];
        deep_sort(&mut entries);
        assert_eq!(
            serde_json::to_string(&entries).unwrap(),
            r#"[{"resources":["second","first"]}]"#
        );
    }
}
