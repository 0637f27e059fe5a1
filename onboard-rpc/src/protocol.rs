//! RPC messages.
//!
//! A connection carries a sequence of calls. The client sends one
//! [`Request`] frame per call and reads the answer before sending the next:
//!
//! - unary calls are answered by exactly one [`Response`] frame
//! - `List` is answered by zero or more [`Response::Item`] frames followed by
//!   [`Response::End`], or by a [`Response::Status`] frame on failure

use onboard_service::{ErrorKind, ServiceError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One call against a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Collection name, `"users"` or `"books"`.
    pub collection: String,
    pub call: Call,
}

impl Request {
    pub fn new(collection: impl Into<String>, call: Call) -> Self {
        Self {
            collection: collection.into(),
            call,
        }
    }
}

/// The operation a [`Request`] asks for. Ids travel as hex strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Call {
    Create { payload: Value },
    Read { id: String },
    Update { id: String, payload: Value },
    Delete { id: String },
    List,
    Count,
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::Create { .. } => "Create",
            Call::Read { .. } => "Read",
            Call::Update { .. } => "Update",
            Call::Delete { .. } => "Delete",
            Call::List => "List",
            Call::Count => "Count",
        }
    }
}

/// A frame sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    /// The entity a Create, Read or Update produced.
    Entity(Value),

    /// Number of entities a Delete removed.
    Deleted { count: u64 },

    /// Answer to Count.
    Count { count: u64 },

    /// One streamed entity of a List.
    Item(Value),

    /// Marks the end of a List.
    End,

    /// The call failed.
    Status(Status),
}

/// A failed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Conventional RPC status code.
    pub code: u32,
    pub kind: ErrorKind,
    pub message: String,
}

impl Status {
    pub fn into_error(self) -> ServiceError {
        ServiceError::new(self.kind, self.message)
    }
}

impl From<&ServiceError> for Status {
    fn from(err: &ServiceError) -> Self {
        Self {
            code: err.code(),
            kind: err.kind(),
            message: err.message().to_string(),
        }
    }
}

impl From<ServiceError> for Response {
    fn from(err: ServiceError) -> Self {
        Response::Status(Status::from(&err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_shape() {
        let request = Request::new("books", Call::Read { id: "abc".into() });
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"collection": "books", "call": {"Read": {"id": "abc"}}})
        );
        let list = Request::new("users", Call::List);
        assert_eq!(
            serde_json::to_value(&list).unwrap(),
            json!({"collection": "users", "call": "List"})
        );
    }

    #[test]
    fn status_carries_code_kind_and_message() {
        let response = Response::from(ServiceError::NotFound("could not find book".into()));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"Status": {"code": 5, "kind": "NotFound", "message": "could not find book"}})
        );
    }
}
