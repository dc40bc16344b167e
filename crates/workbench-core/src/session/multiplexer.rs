//! Session multiplexer for tabbed terminal sessions.
//!
//! Every per-session mutation is keyed by an explicit id rather than "the
//! active session", so a transport callback that fires after the user
//! switched tabs still lands in the session it belongs to. Operations on an
//! unknown id are no-ops: a stale id from a late callback after removal is
//! an expected race.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::store::{KeyValueStore, StoreError};

use super::registry::Registry;
use super::types::{MultiplexerConfig, PersistedSession, Session};

/// Registry of terminal sessions backed by a persistent store.
pub struct SessionMultiplexer<S> {
    registry: Registry,
    sessions: HashMap<String, Session>,
    store: S,
    config: MultiplexerConfig,
}

impl<S: KeyValueStore> SessionMultiplexer<S> {
    /// Create an empty multiplexer. Nothing is read from `store`.
    pub fn new(store: S, config: MultiplexerConfig) -> Self {
        Self {
            registry: Registry::default(),
            sessions: HashMap::new(),
            store,
            config,
        }
    }

    /// Create with default configuration.
    pub fn with_defaults(store: S) -> Self {
        Self::new(store, MultiplexerConfig::default())
    }

    /// Reopen the tabs persisted in `store`, each with empty buffers.
    ///
    /// A stored value of the wrong shape is logged and treated as an empty
    /// list; I/O failures are returned.
    pub fn restore(store: S, config: MultiplexerConfig) -> Result<Self> {
        let entries: Vec<PersistedSession> = match store.get(&config.storage_key, Vec::new()) {
            Ok(entries) => entries,
            Err(StoreError::Decode { key, source }) => {
                warn!(key = %key, error = %source, "ignoring unreadable session list");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        let registry = Registry::from_persisted(entries);
        let sessions = registry
            .ids()
            .iter()
            .map(|id| (id.clone(), Session::new(id.clone())))
            .collect();

        info!(
            count = registry.len(),
            active = registry.active().unwrap_or("-"),
            "Restored sessions"
        );

        Ok(Self {
            registry,
            sessions,
            store,
            config,
        })
    }

    /// Create a session with empty buffers, put it first in tab order and
    /// make it active. Without an id a fresh UUID is generated. An id that is
    /// already registered is selected instead of duplicated.
    pub fn add_session(&mut self, id: Option<String>) -> Result<String> {
        let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        if self.registry.insert_front(&id) {
            self.sessions.insert(id.clone(), Session::new(id.clone()));
            info!(session_id = %id, "Created session");
        } else {
            debug!(session_id = %id, "Session already registered, selecting");
        }
        self.persist()?;
        Ok(id)
    }

    /// Remove a session and discard its buffers. Returns `false` for an
    /// unknown id.
    pub fn remove_session(&mut self, id: &str) -> Result<bool> {
        if !self.registry.remove(id) {
            debug!(session_id = id, "remove on unknown session ignored");
            return Ok(false);
        }
        self.sessions.remove(id);
        info!(
            session_id = id,
            active = self.registry.active().unwrap_or("-"),
            "Removed session"
        );
        self.persist()?;
        Ok(true)
    }

    /// Make `id` the active session. Returns `false` for an unknown id.
    pub fn select_session(&mut self, id: &str) -> Result<bool> {
        if !self.registry.select(id) {
            debug!(session_id = id, "select on unknown session ignored");
            return Ok(false);
        }
        info!(session_id = id, "Selected session");
        self.persist()?;
        Ok(true)
    }

    /// Ids in tab order, newest first.
    pub fn session_ids(&self) -> &[String] {
        self.registry.ids()
    }

    pub fn active_session_id(&self) -> Option<&str> {
        self.registry.active()
    }

    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.active_session_id().and_then(|id| self.sessions.get(id))
    }

    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    pub const fn config(&self) -> &MultiplexerConfig {
        &self.config
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Edit the input line in place. The caret is re-clamped afterwards.
    pub fn update_input_buffer(&mut self, id: &str, f: impl FnOnce(&mut String)) -> bool {
        self.with_session(id, |session| {
            f(&mut session.input_buffer);
            session.caret_position = session.clamp_caret(session.caret_position);
        })
    }

    pub fn append_history(&mut self, id: &str, entry: impl Into<String>) -> bool {
        let limit = self.config.history_limit;
        let entry = entry.into();
        self.with_session(id, |session| session.push_history(entry, limit))
    }

    /// Set the recall cursor. An index past the end of history clears it.
    pub fn set_history_cursor(&mut self, id: &str, index: Option<usize>) -> bool {
        self.with_session(id, |session| {
            session.history_cursor = index.filter(|&i| i < session.history.len());
        })
    }

    /// Move the caret, clamped to the buffer and to a char boundary.
    pub fn set_caret_position(&mut self, id: &str, index: usize) -> bool {
        self.with_session(id, |session| {
            session.caret_position = session.clamp_caret(index);
        })
    }

    pub fn set_focused(&mut self, id: &str, focused: bool) -> bool {
        self.with_session(id, |session| session.focused = focused)
    }

    pub fn append_scrollback(&mut self, id: &str, chunk: &str) -> bool {
        self.with_session(id, |session| session.scrollback.push_str(chunk))
    }

    /// Commit the input line: append it to history, clear the input and
    /// caret, reset recall. Returns the submitted text; an empty line or an
    /// unknown id yields `None`.
    pub fn submit(&mut self, id: &str) -> Option<String> {
        let limit = self.config.history_limit;
        let session = self.session_mut(id)?;
        if session.input_buffer.is_empty() {
            return None;
        }
        let text = std::mem::take(&mut session.input_buffer);
        session.caret_position = 0;
        session.history_cursor = None;
        session.push_history(text.clone(), limit);
        debug!(session_id = id, len = text.len(), "Input submitted");
        Some(text)
    }

    /// Recall the previous (older) history entry.
    pub fn history_up(&mut self, id: &str) -> bool {
        self.with_session(id, |session| {
            if session.history.is_empty() {
                return;
            }
            let idx = match session.history_cursor {
                None => session.history.len() - 1,
                Some(i) => i.saturating_sub(1),
            };
            session.history_cursor = Some(idx);
            let text = session.history[idx].clone();
            session.load_input(text);
        })
    }

    /// Recall the next (newer) entry; stepping past the newest clears the input.
    pub fn history_down(&mut self, id: &str) -> bool {
        self.with_session(id, |session| match session.history_cursor {
            None => {}
            Some(i) if i + 1 >= session.history.len() => {
                session.history_cursor = None;
                session.load_input(String::new());
            }
            Some(i) => {
                session.history_cursor = Some(i + 1);
                let text = session.history[i + 1].clone();
                session.load_input(text);
            }
        })
    }

    /// Insert a character at the caret.
    pub fn insert_char(&mut self, id: &str, c: char) -> bool {
        self.with_session(id, |session| {
            let pos = session.clamp_caret(session.caret_position);
            session.input_buffer.insert(pos, c);
            session.caret_position = pos + c.len_utf8();
        })
    }

    /// Delete the character before the caret.
    pub fn backspace(&mut self, id: &str) -> bool {
        self.with_session(id, |session| {
            let pos = session.clamp_caret(session.caret_position);
            if let Some((start, _)) = session.input_buffer[..pos].char_indices().next_back() {
                session.input_buffer.remove(start);
                session.caret_position = start;
            }
        })
    }

    fn session_mut(&mut self, id: &str) -> Option<&mut Session> {
        let session = self.sessions.get_mut(id);
        if session.is_none() {
            debug!(session_id = id, "update on unknown session ignored");
        }
        session
    }

    fn with_session(&mut self, id: &str, f: impl FnOnce(&mut Session)) -> bool {
        self.session_mut(id).map(f).is_some()
    }

    fn persist(&mut self) -> Result<()> {
        let entries = self.registry.to_persisted();
        self.store.set(&self.config.storage_key, &entries)?;
        Ok(())
    }
}
