//! External script module
//!
//! One child process per create request, stdout relayed verbatim.

mod error;
mod runner;

pub use error::ScriptError;
pub use runner::ScriptRunner;
