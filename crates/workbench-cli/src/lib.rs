//! Workbench CLI Library
//!
//! Command-line front end over `workbench-core`: persisted session tabs, a
//! headless multi-session shell backed by the local `sh`, and a file tree
//! viewer driven by `PathTree` transitions.

pub mod session_cmd;
pub mod shell;
pub mod shell_transport;
pub mod tree_cmd;
