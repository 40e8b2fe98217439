//! Logger module
//!
//! Provides logging utilities for the relay server including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Leveled info/debug/warning/error lines
//! - File-based logging support

mod format;
mod level;
pub mod writer;

pub use format::AccessLogEntry;
pub use level::Level;

use crate::config::Config;
use crate::script::ScriptError;
use std::net::SocketAddr;

/// Initialize the logger with configuration
///
/// Should be called once at application startup. An unknown level falls
/// back to `info` with a warning.
pub fn init(config: &Config) -> std::io::Result<()> {
    let level = Level::parse(&config.logging.level);
    writer::init(
        level.unwrap_or_default(),
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )?;
    if level.is_none() {
        log_warning(&format!(
            "Unknown log level '{}', using info",
            config.logging.level
        ));
    }
    Ok(())
}

/// Before `init()` (and in tests) lines go straight to stdout/stderr at info level
fn write(level: Level, message: &str) {
    if let Some(w) = writer::get() {
        w.write(level, message);
    } else if level <= Level::default() {
        let line = writer::stamp(level, message);
        match level {
            Level::Error | Level::Warn => eprintln!("{line}"),
            Level::Info | Level::Debug => println!("{line}"),
        }
    }
}

pub fn log_info(message: &str) {
    write(Level::Info, message);
}

pub fn log_debug(message: &str) {
    write(Level::Debug, message);
}

pub fn log_warning(message: &str) {
    write(Level::Warn, message);
}

pub fn log_error(message: &str) {
    write(Level::Error, message);
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    log_info("======================================");
    log_info(&format!("Listening on: http://{addr}"));
    log_info(&format!("Serving static files from: {}", config.http.static_dir));
    log_info(&format!("Create channel runs: {}", config.script.command));
    if let Some(dir) = &config.script.working_dir {
        log_info(&format!("Script working directory: {dir}"));
    }
    match config.script.timeout_secs {
        Some(secs) => log_info(&format!("Script timeout: {secs}s")),
        None => log_info("Script timeout: none"),
    }
    if let Some(workers) = config.server.workers {
        log_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        log_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        log_info(&format!("Error log: {path}"));
    }
    log_info("======================================");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    log_debug(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_rejected(active: usize, max: u64) {
    log_warning(&format!(
        "Max connections reached: {active}/{max}. Connection rejected."
    ));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    log_error(&format!("Failed to serve connection: {err:?}"));
}

pub fn log_create_request(aval: Option<&str>, bval: Option<&str>) {
    log_info(&format!(
        "[Channel] Create requested (aval={}, bval={})",
        aval.unwrap_or("-"),
        bval.unwrap_or("-")
    ));
}

pub fn log_channel_closed() {
    log_info("closed channel");
}

pub fn log_script_failure(err: &ScriptError) {
    match err {
        ScriptError::Failed { status, .. } => {
            log_error(&format!("[Script] Exited with {status}: {err}"));
        }
        _ => log_error(&format!("[Script] {err}")),
    }
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    let line = entry.format(format);
    if let Some(w) = writer::get() {
        w.write_access(&line);
    } else {
        println!("{line}");
    }
}

pub fn log_shutdown(active: usize) {
    log_info(&format!(
        "Shutdown requested, {active} connection(s) still open"
    ));
}
