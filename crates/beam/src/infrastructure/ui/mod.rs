//! Terminal UI adapters.
//!
//! # Sub-modules
//!
//! - **`spinner`** – The "waiting for absorber" animation, implementing
//!   [`ProgressIndicator`](crate::application::emit::ProgressIndicator).
//!
//! - **`prompt`** – Interactive `y/N` approval of an announced file,
//!   implementing [`TransferApproval`](crate::application::absorb::TransferApproval).
//!
//! - **`size`** – Human-readable byte counts.
//!
//! Animations and prompts go to stderr; stdout carries only the results a
//! script might want to capture (the beam code, the received file's path).

pub mod prompt;
pub mod size;
pub mod spinner;
