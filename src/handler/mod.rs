//! Request handler module
//!
//! Routes requests onto the todo pages and maps failures to plain-text
//! error responses.

pub mod error;
pub mod form;
pub mod router;
pub mod todos;

// Re-export main entry point
pub use router::handle_request;
