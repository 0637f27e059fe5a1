use onboard_types::ObjectId;
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::validation::{Validate, ValidationError, min, one_of, required};

/// Values accepted in the `gender` field.
pub const GENDERS: &[&str] = &["Male", "Female", "Other"];

/// Lowest accepted `age`.
pub const MIN_AGE: i64 = 0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bio: String,
    #[serde(default)]
    pub age: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

impl User {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>, age: i32) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            age,
            ..Default::default()
        }
    }

    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = bio.into();
        self
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }
}

impl Validate for User {
    fn validate(&self) -> Result<(), ValidationError> {
        required("firstName", &self.first_name)?;
        required("lastName", &self.last_name)?;
        min("age", i64::from(self.age), MIN_AGE)?;
        if let Some(gender) = &self.gender {
            one_of("gender", gender, GENDERS)?;
        }
        Ok(())
    }
}

impl Entity for User {
    type Patch = UserPatch;
    const COLLECTION: &'static str = "users";
    const NAME: &'static str = "user";

    fn id(&self) -> Option<ObjectId> {
        self.id
    }

    fn set_id(&mut self, id: ObjectId) {
        self.id = Some(id);
    }
}

/// Fields of a [`User`] to replace. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

impl Validate for UserPatch {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(first_name) = &self.first_name {
            required("firstName", first_name)?;
        }
        if let Some(last_name) = &self.last_name {
            required("lastName", last_name)?;
        }
        if let Some(age) = self.age {
            min("age", i64::from(age), MIN_AGE)?;
        }
        if let Some(gender) = &self.gender {
            one_of("gender", gender, GENDERS)?;
        }
        Ok(())
    }
}
