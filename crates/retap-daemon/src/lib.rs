//! retap-daemon library entry point.
//!
//! Re-exports the daemon modules so integration tests and the binary entry
//! point in `main.rs` share the same module tree.

pub mod config;
pub mod replay;
