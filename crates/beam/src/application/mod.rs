//! Application layer use cases for beam.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure protocol rules, here in `beam-core`) and the infrastructure
//! (sockets, files, terminal).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** a role endpoint through one full session.
//! - **Depend on abstractions** (traits) rather than concrete implementations:
//!   progress display, user approval, and the destination file are all
//!   seams, so the same session code runs against a TCP socket and a real
//!   disk in production and against an in-memory pipe and a `Vec<u8>` in tests.
//! - **Contain no socket setup, no path handling, no terminal I/O**.
//!
//! # Sub-modules
//!
//! - **`emit`**   – The sending side: verify the beam code, announce the file,
//!   stream it chunk by chunk, wait for each acknowledgement.
//!
//! - **`absorb`** – The receiving side: present the code, decide whether to
//!   accept the announced file, write every chunk to a sink, acknowledge.

pub mod absorb;
pub mod emit;
