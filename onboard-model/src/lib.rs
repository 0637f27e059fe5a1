//! Entity model types for onboard.
//!
//! Each entity type maps to one collection in the document store and comes
//! with a patch type for partial updates. Both are checked with [`Validate`]
//! before anything is written.

mod book;
mod entity;
mod user;
mod validation;

pub use book::{Book, BookPatch};
pub use entity::Entity;
pub use user::{GENDERS, MIN_AGE, User, UserPatch};
pub use validation::{Rule, Validate, ValidationError};
