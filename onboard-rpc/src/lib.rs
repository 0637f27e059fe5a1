//! Framed JSON RPC for onboard entities.
//!
//! A plain TCP transport: every message is one length-prefixed JSON frame
//! (see [`codec`]). The server dispatches on the request's collection name
//! to the matching entity services and streams `List` answers item by item.

pub mod codec;
mod client;
mod error;
mod protocol;
mod server;

pub use client::{ListCall, RpcClient};
pub use error::{RpcError, RpcResult};
pub use protocol::{Call, Request, Response, Status};
pub use server::{DEFAULT_DRAIN_TIMEOUT, RpcServer};

/// Port the RPC server listens on unless configured otherwise.
pub const DEFAULT_RPC_PORT: u16 = 50051;
