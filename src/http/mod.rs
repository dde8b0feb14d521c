//! HTTP/1.1 request and response handling.
//!
//! - [`transaction`]: one request with connect-or-reuse and reconnects
//! - [`job`]: redirect chasing around a transaction
//! - [`response`] and [`responsebody`]: head parsing, body framing and decoding
//! - [`requestbody`], [`multipart`], [`params`]: request content

pub mod charset;
pub mod job;
pub mod multipart;
pub mod orderedheaders;
pub mod params;
pub mod progress;
pub mod reader;
pub mod requestbody;
pub mod response;
pub mod responsebody;
pub mod retry;
pub mod transaction;

// Re-exports for convenience
pub use requestbody::RequestBody;
pub use response::{HttpResponse, Response};
