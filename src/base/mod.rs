//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): every failure the engine reports, with
//!   [`ErrorKind`](neterror::ErrorKind) for stage-level branching
//! - [`LoadState`](loadstate::LoadState): what an in-flight request is doing

pub mod context;
pub mod loadstate;
pub mod neterror;

#[cfg(test)]
mod tests;
