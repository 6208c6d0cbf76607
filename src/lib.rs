//! stk library interface
//!
//! The stack engine is exposed for integration testing; the binary in
//! main.rs only parses arguments and dispatches to `commands`.

pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod git;
pub mod github;
pub mod remote;
pub mod review;
