//! Entity services for onboard.
//!
//! Transports (HTTP, RPC) call into [`EntityService`] and
//! [`StreamingListService`] and render the [`ServiceError`] they get back.
//! Every lower-level failure is classified into one [`ErrorKind`] here.

mod config;
mod entity;
mod error;
mod services;
mod streaming;

pub use config::{DEFAULT_LIST_CACHE_TTL, ServiceConfig};
pub use entity::EntityService;
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use services::EntityServices;
pub use streaming::{EntityStream, StreamingListService};
