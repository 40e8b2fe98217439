//! HTTP protocol layer module
//!
//! Response builders, caching headers and MIME detection, independent of
//! the channel endpoints that use them.

pub mod cache;
pub mod mime;
pub mod response;

// Re-export commonly used builders
pub use response::{
    apply_common_headers, build_304_response, build_404_response, build_405_response,
    build_cached_response, build_empty_response, build_json_response, build_options_response,
};
