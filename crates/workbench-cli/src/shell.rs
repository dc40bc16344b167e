//! Headless multi-session shell.
//!
//! Reads lines from stdin. Lines starting with `:` manage sessions, anything
//! else is submitted to the active session through the transport. Output is
//! echoed when it belongs to the active session and is always recorded in
//! the scrollback of the session that produced it.

use std::io::{self, Write};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use workbench_core::transport::{self, Inbound, TransportError};
use workbench_core::{KeyValueStore, SessionLink, SessionMultiplexer, Transport};

use crate::session_cmd::print_sessions;

/// Errors that end the shell.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Core(#[from] workbench_core::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    New(Option<String>),
    Close(Option<String>),
    Switch(String),
    List,
    History,
    Quit,
    Submit(String),
    /// Unknown `:` command or missing argument; carries the usage hint.
    Usage(String),
}

impl ShellCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some(rest) = line.strip_prefix(':') else {
            return Self::Submit(line.to_string());
        };
        let mut words = rest.split_whitespace();
        let name = words.next().unwrap_or_default();
        let arg = words.next().map(str::to_string);
        match name {
            "new" => Self::New(arg),
            "close" => Self::Close(arg),
            "switch" => arg.map_or_else(|| Self::Usage(":switch ID".to_string()), Self::Switch),
            "list" => Self::List,
            "history" => Self::History,
            "quit" | "q" => Self::Quit,
            _ => Self::Usage(HELP.to_string()),
        }
    }
}

const HELP: &str = ":new [ID] | :close [ID] | :switch ID | :list | :history | :quit";

enum Flow {
    Continue,
    Submitted,
    Quit,
}

/// Run the shell until `:quit` or end of input.
///
/// Every submitted line is expected to produce exactly one reply. At end of
/// input the shell waits for replies still owed by the bound session.
pub async fn run<S, T, R, W>(
    mux: &mut SessionMultiplexer<S>,
    link: &mut SessionLink<T>,
    input: R,
    out: &mut W,
) -> Result<(), ShellError>
where
    S: KeyValueStore,
    T: Transport,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut pending = 0usize;
    link.sync(mux)?;
    info!(sessions = mux.session_ids().len(), "Shell started");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match execute(mux, link, ShellCommand::parse(&line), out).await? {
                    Flow::Quit => {
                        link.disconnect();
                        return Ok(());
                    }
                    Flow::Submitted => pending += 1,
                    Flow::Continue => {}
                }
                if link.sync(mux)? {
                    pending = 0;
                }
            }
            Some(msg) = link.recv() => {
                pending = pending.saturating_sub(1);
                show_inbound(mux, &msg, out)?;
            }
        }
    }

    while pending > 0 {
        let Some(msg) = link.recv().await else { break };
        pending -= 1;
        show_inbound(mux, &msg, out)?;
    }
    link.disconnect();
    Ok(())
}

async fn execute<S, T, W>(
    mux: &mut SessionMultiplexer<S>,
    link: &mut SessionLink<T>,
    command: ShellCommand,
    out: &mut W,
) -> Result<Flow, ShellError>
where
    S: KeyValueStore,
    T: Transport,
    W: Write,
{
    match command {
        ShellCommand::New(id) => {
            let id = mux.add_session(id)?;
            writeln!(out, "[session {id}]")?;
        }
        ShellCommand::Close(id) => {
            let Some(id) = id.or_else(|| mux.active_session_id().map(str::to_string)) else {
                writeln!(out, "No active session.")?;
                return Ok(Flow::Continue);
            };
            if mux.remove_session(&id)? {
                writeln!(out, "[closed {id}]")?;
            } else {
                writeln!(out, "Session {id} not found.")?;
            }
        }
        ShellCommand::Switch(id) => {
            if mux.select_session(&id)? {
                writeln!(out, "[session {id}]")?;
                if let Some(session) = mux.session(&id) {
                    write!(out, "{}", session.scrollback)?;
                }
            } else {
                writeln!(out, "Session {id} not found.")?;
            }
        }
        ShellCommand::List => print_sessions(mux, out)?,
        ShellCommand::History => match mux.active_session() {
            Some(session) => {
                for (i, entry) in session.history.iter().enumerate() {
                    writeln!(out, "{:>4}  {entry}", i + 1)?;
                }
            }
            None => writeln!(out, "No active session.")?,
        },
        ShellCommand::Quit => return Ok(Flow::Quit),
        ShellCommand::Usage(hint) => writeln!(out, "usage: {hint}")?,
        ShellCommand::Submit(text) => return submit(mux, link, text, out).await,
    }
    Ok(Flow::Continue)
}

async fn submit<S, T, W>(
    mux: &mut SessionMultiplexer<S>,
    link: &mut SessionLink<T>,
    text: String,
    out: &mut W,
) -> Result<Flow, ShellError>
where
    S: KeyValueStore,
    T: Transport,
    W: Write,
{
    if text.trim().is_empty() {
        return Ok(Flow::Continue);
    }
    let Some(id) = link.bound_session().map(str::to_string) else {
        writeln!(out, "No active session. Use :new to open one.")?;
        return Ok(Flow::Continue);
    };

    let caret = text.len();
    mux.update_input_buffer(&id, |buffer| *buffer = text);
    mux.set_caret_position(&id, caret);

    match link.submit(mux).await {
        Ok(Some(_)) => Ok(Flow::Submitted),
        Ok(None) => Ok(Flow::Continue),
        Err(e) => {
            warn!(session_id = %id, error = %e, "Submit failed");
            writeln!(out, "[{e}]")?;
            Ok(Flow::Continue)
        }
    }
}

fn show_inbound<S: KeyValueStore>(
    mux: &mut SessionMultiplexer<S>,
    msg: &Inbound,
    out: &mut impl Write,
) -> io::Result<()> {
    if mux.active_session_id() == Some(msg.session_id.as_str()) {
        write!(out, "{}", msg.data)?;
        out.flush()?;
    }
    transport::deliver(mux, msg);
    Ok(())
}
