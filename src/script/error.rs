//! Script failure types
//!
//! Every variant is reported to the client as `500 {"error": <Display>}`,
//! so the `Display` text is the wire message.

use std::io;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    /// The shell (or working directory) could not be used to start the child
    #[error("Failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The child started but its output could not be collected
    #[error("Failed to collect output of `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Command timed out after {secs}s: {command}")]
    TimedOut { command: String, secs: u64 },

    /// A captured stream grew past `script.max_output_bytes`
    #[error("{stream} maxBuffer length exceeded")]
    OutputOverflow { stream: &'static str },

    /// Non-zero exit; stderr is appended verbatim
    #[error("Command failed: {command}\n{stderr}")]
    Failed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    /// Clean exit that still wrote to stderr
    #[error("{0}")]
    Stderr(String),
}
