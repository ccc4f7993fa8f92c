//! Storage infrastructure: configuration file persistence and the
//! destination directory for received files.
//!
//! - **`config`** – Reads the TOML configuration file from the
//!   platform-appropriate directory (or an explicit path), fills in defaults
//!   for anything missing, and validates the result once at load time.
//!
//! - **`sink`** – The on-disk [`FileSink`](crate::application::absorb::FileSink):
//!   turns an announced file name into a safe path inside the output
//!   directory and writes received chunks to it.

pub mod config;
pub mod sink;
