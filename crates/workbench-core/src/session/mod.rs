//! Terminal session multiplexing.
//!
//! Tracks independent terminal sessions (input, history, caret, scrollback,
//! focus), their tab order and the single active session. The tab list is
//! persisted through a [`KeyValueStore`](crate::store::KeyValueStore); the
//! per-session buffers are transient.

mod multiplexer;
mod registry;
mod types;

pub use multiplexer::SessionMultiplexer;
pub use registry::Registry;
pub use types::{MultiplexerConfig, PersistedSession, Session};
