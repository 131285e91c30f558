//! HTTP protocol layer module
//!
//! Response builders and request body helpers, decoupled from the todo handlers.

pub mod body;
pub mod response;

// Re-export commonly used items
pub use body::{read_body, BodyError};
pub use response::{
    build_400_response, build_404_response, build_405_response, build_413_response,
    build_415_response, build_500_response, build_health_response, build_html_response,
    build_see_other_response,
};
