//! Record Model
//!
//! A record is a flat mapping of named fields that belongs to a collection,
//! mirroring how the backend-as-a-service stores form submissions and carts.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Length of generated record ids
pub const ID_LENGTH: usize = 15;

/// Keys the backend manages itself; never sent back on create/update
const SYSTEM_FIELDS: &[&str] = &["id", "collectionId", "collectionName", "created", "updated", "expand"];

/// A stored record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record identifier
    #[serde(default)]
    pub id: String,

    /// Owning collection name
    #[serde(rename = "collectionName", default)]
    pub collection: String,

    /// Field values
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create an empty record for a collection
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            collection: collection.into(),
            fields: Map::new(),
        }
    }

    /// Build a record from a submitted JSON object.
    ///
    /// An `id` key in the object becomes the record id; other system keys are
    /// dropped.
    pub fn from_fields(collection: impl Into<String>, mut fields: Map<String, Value>) -> Self {
        let id = match fields.remove("id") {
            Some(Value::String(id)) => id,
            _ => String::new(),
        };
        fields.retain(|key, _| !SYSTEM_FIELDS.contains(&key.as_str()));

        Self {
            id,
            collection: collection.into(),
            fields,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_field(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Generate a fresh backend-compatible id (15 lowercase alphanumerics)
    pub fn generate_id() -> String {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        hex[..ID_LENGTH].to_string()
    }

    /// Assign a generated id if the record has none. Returns the id.
    pub fn ensure_id(&mut self) -> &str {
        if self.id.is_empty() {
            self.id = Self::generate_id();
        }
        &self.id
    }

    /// Set a field value
    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        if field == "id" {
            if let Value::String(id) = value.into() {
                self.id = id;
            }
            return;
        }
        self.fields.insert(field.to_string(), value.into());
    }

    /// Raw field value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Field as a string. Numbers and bools are rendered; missing is empty.
    pub fn get_string(&self, field: &str) -> String {
        if field == "id" {
            return self.id.clone();
        }
        match self.fields.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }

    /// Field as an integer. Numeric strings are parsed; anything else is 0.
    pub fn get_int(&self, field: &str) -> i64 {
        match self.fields.get(field) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .unwrap_or(0),
            Some(Value::String(s)) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
                    .unwrap_or(0)
            }
            Some(Value::Bool(true)) => 1,
            _ => 0,
        }
    }

    /// Field as a bool. Accepts `true`, `"true"`, `"1"` and non-zero numbers.
    pub fn get_bool(&self, field: &str) -> bool {
        match self.fields.get(field) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1"),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            _ => false,
        }
    }

    /// Body for create/update requests: id plus user fields
    pub fn to_payload(&self) -> Map<String, Value> {
        let mut payload: Map<String, Value> = self
            .fields
            .iter()
            .filter(|(key, _)| !SYSTEM_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        if !self.id.is_empty() {
            payload.insert("id".into(), Value::String(self.id.clone()));
        }
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_typed_getters() {
        let record = Record::new("cart")
            .with_id("c1")
            .with_field("total", "19.99")
            .with_field("count", 3)
            .with_field("count_str", " 7 ")
            .with_field("is_paid", true)
            .with_field("price", 12.5);

        assert_eq!(record.get_string("id"), "c1");
        assert_eq!(record.get_string("total"), "19.99");
        assert_eq!(record.get_string("price"), "12.5");
        assert_eq!(record.get_string("missing"), "");
        assert_eq!(record.get_int("count"), 3);
        assert_eq!(record.get_int("count_str"), 7);
        assert_eq!(record.get_int("total"), 19);
        assert_eq!(record.get_int("missing"), 0);
        assert!(record.get_bool("is_paid"));
        assert!(!record.get_bool("missing"));
    }

    #[test]
    fn test_bool_from_strings() {
        let record = Record::new("cart")
            .with_field("a", "true")
            .with_field("b", "1")
            .with_field("c", "no")
            .with_field("d", 0);
        assert!(record.get_bool("a"));
        assert!(record.get_bool("b"));
        assert!(!record.get_bool("c"));
        assert!(!record.get_bool("d"));
    }

    #[test]
    fn test_from_fields_strips_system_keys() {
        let fields = json!({
            "id": "abc",
            "collectionName": "cart",
            "created": "2024-01-01",
            "total": "5.00"
        });
        let Value::Object(fields) = fields else { unreachable!() };

        let record = Record::from_fields("cart", fields);
        assert_eq!(record.id, "abc");
        assert_eq!(record.fields.len(), 1);
        assert_eq!(record.get_string("total"), "5.00");
    }

    #[test]
    fn test_generated_id_shape() {
        let mut record = Record::new("cart");
        let id = record.ensure_id().to_string();
        assert_eq!(id.len(), ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));

        // Existing ids are kept
        assert_eq!(record.ensure_id(), id);
    }

    #[test]
    fn test_deserialize_backend_json() {
        let record: Record = serde_json::from_value(json!({
            "id": "c1",
            "collectionId": "pbc_1",
            "collectionName": "cart",
            "total": "19.99",
            "is_paid": false
        }))
        .unwrap();

        assert_eq!(record.id, "c1");
        assert_eq!(record.collection, "cart");
        assert!(!record.get_bool("is_paid"));

        let payload = record.to_payload();
        assert_eq!(payload.get("id"), Some(&json!("c1")));
        assert!(!payload.contains_key("collectionId"));
        assert!(!payload.contains_key("collectionName"));
    }
}
