//! CLI session management subcommands.
//!
//! Operates on the persisted tab list only; buffers are never stored, so a
//! session created here starts empty when the shell reopens it.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::Write;

use clap::Subcommand;

use workbench_core::{KeyValueStore, SessionMultiplexer};

/// Session subcommand actions.
#[derive(Subcommand, Debug)]
pub enum SessionAction {
    /// List sessions in tab order (newest first)
    List,
    /// Create a session and make it active
    Add {
        /// Session ID (a UUID is generated when omitted)
        id: Option<String>,
    },
    /// Remove a session
    Remove {
        /// Session ID
        id: String,
    },
    /// Make a session the active one
    Select {
        /// Session ID
        id: String,
    },
}

/// Execute a session subcommand.
pub fn run<S: KeyValueStore>(
    mux: &mut SessionMultiplexer<S>,
    action: SessionAction,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match action {
        SessionAction::List => print_sessions(mux, out)?,
        SessionAction::Add { id } => {
            let id = mux.add_session(id)?;
            writeln!(out, "Session {id} is now active.")?;
        }
        SessionAction::Remove { id } => {
            if mux.remove_session(&id)? {
                writeln!(out, "Session {id} removed.")?;
                match mux.active_session_id() {
                    Some(active) => writeln!(out, "Active session: {active}")?,
                    None => writeln!(out, "No active session.")?,
                }
            } else {
                writeln!(out, "Session {id} not found.")?;
            }
        }
        SessionAction::Select { id } => {
            if mux.select_session(&id)? {
                writeln!(out, "Session {id} is now active.")?;
            } else {
                writeln!(out, "Session {id} not found.")?;
            }
        }
    }
    Ok(())
}

/// Print the tab list with the active session marked `*`.
pub fn print_sessions<S: KeyValueStore>(
    mux: &SessionMultiplexer<S>,
    out: &mut impl Write,
) -> std::io::Result<()> {
    if mux.session_ids().is_empty() {
        return writeln!(out, "No sessions.");
    }
    let active = mux.active_session_id();
    for id in mux.session_ids() {
        let marker = if Some(id.as_str()) == active { '*' } else { ' ' };
        writeln!(out, "{marker} {id}")?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::Parser;
    use workbench_core::MemoryStore;

    /// Test wrapper to parse CLI arguments.
    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(subcommand)]
        action: SessionAction,
    }

    fn exec(mux: &mut SessionMultiplexer<MemoryStore>, args: &[&str]) -> String {
        let cli = TestCli::parse_from(std::iter::once("test").chain(args.iter().copied()));
        let mut out = Vec::new();
        run(mux, cli.action, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parse_add_without_id() {
        let cli = TestCli::parse_from(["test", "add"]);
        assert!(matches!(cli.action, SessionAction::Add { id: None }));
    }

    #[test]
    fn parse_remove_requires_id() {
        assert!(TestCli::try_parse_from(["test", "remove"]).is_err());
    }

    #[test]
    fn list_empty() {
        let mut mux = SessionMultiplexer::with_defaults(MemoryStore::new());
        assert_eq!(exec(&mut mux, &["list"]), "No sessions.\n");
    }

    #[test]
    fn add_then_list_marks_active_first() {
        let mut mux = SessionMultiplexer::with_defaults(MemoryStore::new());
        exec(&mut mux, &["add", "t1"]);
        let out = exec(&mut mux, &["add", "t2"]);
        assert_eq!(out, "Session t2 is now active.\n");
        assert_eq!(exec(&mut mux, &["list"]), "* t2\n  t1\n");
    }

    #[test]
    fn remove_reports_new_active() {
        let mut mux = SessionMultiplexer::with_defaults(MemoryStore::new());
        exec(&mut mux, &["add", "t1"]);
        exec(&mut mux, &["add", "t2"]);
        exec(&mut mux, &["select", "t1"]);
        let out = exec(&mut mux, &["remove", "t1"]);
        assert_eq!(out, "Session t1 removed.\nActive session: t2\n");
    }

    #[test]
    fn remove_only_session_leaves_none_active() {
        let mut mux = SessionMultiplexer::with_defaults(MemoryStore::new());
        exec(&mut mux, &["add", "t1"]);
        let out = exec(&mut mux, &["remove", "t1"]);
        assert!(out.ends_with("No active session.\n"));
    }

    #[test]
    fn unknown_ids_are_reported() {
        let mut mux = SessionMultiplexer::with_defaults(MemoryStore::new());
        assert_eq!(exec(&mut mux, &["remove", "nope"]), "Session nope not found.\n");
        assert_eq!(exec(&mut mux, &["select", "nope"]), "Session nope not found.\n");
    }
}
