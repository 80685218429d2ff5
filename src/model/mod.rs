//! Message and schema types.
//!
//! # Data Flow
//! ```text
//! Endpoint (schema, owned by operators)
//!     → EndpointRef (endpoint + method, carried by a header)
//!     → RequestData (header, payload, origin connection, correlation ids)
//! ```

pub mod endpoint;
pub mod request;
pub mod status;

pub use endpoint::{ActionMethod, Endpoint, EndpointAction, EndpointRef, GrpcMode, HttpMethod, Protocol};
pub use request::{Header, RequestData};
pub use status::HttpStatus;
