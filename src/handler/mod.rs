//! Request handler module
//!
//! Routes the two channel endpoints and serves the web client for every
//! other path.

pub mod channel;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
