//! HTTP API and process wiring for onboard.
//!
//! Routes for `/users` and `/books` answer in a JSON envelope; creating an
//! entity requires basic credentials. The RPC server from `onboard-rpc`
//! runs next to it on the same services.

mod auth;
pub mod config;
mod envelope;
mod routes;

pub use auth::{Credentials, require_basic_auth};
pub use config::Config;
pub use envelope::{ApiError, Deleted, Envelope, ErrorDetail, Inserted};
pub use routes::{AppState, build_router};
