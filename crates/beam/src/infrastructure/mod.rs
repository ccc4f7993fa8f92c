//! Infrastructure layer for beam.
//!
//! Contains OS-facing adapters: TCP sockets, the configuration file, the
//! destination directory, and the terminal.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `beam_core`, but MUST NOT be imported by the `application` layer.

pub mod network;
pub mod storage;
pub mod ui;
