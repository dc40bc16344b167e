//! `Workbench` Core Library
//!
//! Framework-agnostic state for the authoring workbench front end:
//! - Path-addressed tree state (collapse/select) for file explorers
//! - Terminal session multiplexer with per-session buffers
//! - Key-value store port for durable session tabs
//! - Transport port and the binder that keeps one channel on the active session
//! - Configuration, tracing setup and common error types

pub mod config;
pub mod error;
pub mod session;
pub mod store;
pub mod tracing_init;
pub mod transport;
pub mod tree;

pub use config::Config;
pub use error::{Error, Result};
pub use session::{MultiplexerConfig, Session, SessionMultiplexer};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use transport::{Channel, Inbound, SessionLink, Transport};
pub use tree::{AttrValue, Node, PathTree, TreePath};
