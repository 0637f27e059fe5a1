use onboard_types::ObjectId;
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::validation::{Validate, ValidationError, required};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Book {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl Book {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: description.into(),
        }
    }
}

impl Validate for Book {
    fn validate(&self) -> Result<(), ValidationError> {
        required("title", &self.title)
    }
}

impl Entity for Book {
    type Patch = BookPatch;
    const COLLECTION: &'static str = "books";
    const NAME: &'static str = "book";

    fn id(&self) -> Option<ObjectId> {
        self.id
    }

    fn set_id(&mut self, id: ObjectId) {
        self.id = Some(id);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Validate for BookPatch {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            required("title", title)?;
        }
        Ok(())
    }
}
