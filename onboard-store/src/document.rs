use onboard_types::ObjectId;
use serde_json::{Map, Value};

/// A stored document: its id plus a schema-free JSON object body.
///
/// The body never contains the id; it is carried alongside.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: ObjectId,
    pub body: Map<String, Value>,
}

impl Document {
    pub fn new(id: ObjectId, body: Map<String, Value>) -> Self {
        Self { id, body }
    }

    /// Gets a top-level field of the body.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.body.get(field)
    }

    /// Replaces each listed top-level field, keeping the others.
    pub fn set_fields(&mut self, fields: Map<String, Value>) {
        for (key, value) in fields {
            self.body.insert(key, value);
        }
    }
}
