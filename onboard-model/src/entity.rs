use onboard_types::ObjectId;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::validation::Validate;

/// A document type stored in its own collection.
///
/// The id lives outside the stored body: the store assigns it on insert and
/// hands it back alongside the body on every read.
pub trait Entity:
    Serialize + DeserializeOwned + Validate + Clone + Send + Sync + 'static
{
    /// Partial update payload. Serializes to exactly the fields it carries.
    type Patch: Serialize + DeserializeOwned + Validate + Send + Sync + 'static;

    /// Collection (table) name, also used as the list cache key.
    const COLLECTION: &'static str;

    /// Singular, human-readable name used in messages ("user").
    const NAME: &'static str;

    fn id(&self) -> Option<ObjectId>;

    fn set_id(&mut self, id: ObjectId);
}
