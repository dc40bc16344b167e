//! Session multiplexer types.

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_STORAGE_KEY, SessionConfig};

/// Configuration for session multiplexer.
#[derive(Debug, Clone)]
pub struct MultiplexerConfig {
    /// Store key holding the `[{id, selected}]` list.
    pub storage_key: String,
    /// Maximum history entries per session; oldest entries are dropped first.
    pub history_limit: Option<usize>,
}

impl Default for MultiplexerConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            history_limit: None,
        }
    }
}

impl From<&SessionConfig> for MultiplexerConfig {
    fn from(config: &SessionConfig) -> Self {
        Self {
            storage_key: config.storage_key.clone(),
            history_limit: config.history_limit,
        }
    }
}

/// One entry of the persisted tab list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub id: String,
    #[serde(default)]
    pub selected: bool,
}

/// Buffers of one terminal session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    /// Uncommitted input line.
    pub input_buffer: String,
    /// Submitted inputs, oldest first.
    pub history: Vec<String>,
    /// Index into `history` while recalling; `None` when editing a fresh line.
    pub history_cursor: Option<usize>,
    /// Byte offset into `input_buffer`, always on a char boundary.
    pub caret_position: usize,
    pub focused: bool,
    /// Accumulated output.
    pub scrollback: String,
}

impl Session {
    pub(crate) fn new(id: String) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Clamp `pos` into the input buffer and back onto a char boundary.
    pub(crate) fn clamp_caret(&self, pos: usize) -> usize {
        let mut pos = pos.min(self.input_buffer.len());
        while pos > 0 && !self.input_buffer.is_char_boundary(pos) {
            pos -= 1;
        }
        pos
    }

    pub(crate) fn push_history(&mut self, entry: String, limit: Option<usize>) {
        self.history.push(entry);
        if let Some(limit) = limit
            && self.history.len() > limit
        {
            let excess = self.history.len() - limit;
            self.history.drain(..excess);
            self.history_cursor = self.history_cursor.and_then(|i| i.checked_sub(excess));
        }
    }

    /// Replace the input with a recalled entry and put the caret at its end.
    pub(crate) fn load_input(&mut self, text: String) {
        self.input_buffer = text;
        self.caret_position = self.input_buffer.len();
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn clamp_caret_respects_char_boundaries() {
        let mut session = Session::new("t1".into());
        session.input_buffer = "héllo".into();
        assert_eq!(session.clamp_caret(2), 1);
        assert_eq!(session.clamp_caret(3), 3);
        assert_eq!(session.clamp_caret(100), session.input_buffer.len());
    }

    #[test]
    fn history_limit_drops_oldest_and_shifts_cursor() {
        let mut session = Session::new("t1".into());
        for entry in ["a", "b", "c"] {
            session.push_history(entry.into(), Some(3));
        }
        session.history_cursor = Some(2);
        session.push_history("d".into(), Some(3));
        assert_eq!(session.history, ["b", "c", "d"]);
        assert_eq!(session.history_cursor, Some(1));

        session.history_cursor = Some(0);
        session.push_history("e".into(), Some(3));
        assert_eq!(session.history_cursor, None);
    }

    #[test]
    fn persisted_session_defaults_selected() {
        let entry: PersistedSession = serde_json::from_str(r#"{"id":"t1"}"#).unwrap();
        assert_eq!(
            entry,
            PersistedSession {
                id: "t1".into(),
                selected: false
            }
        );
    }
}
