//! Transport port and the active-session binder.
//!
//! A [`Transport`] opens one [`Channel`] per session id. [`SessionLink`]
//! keeps exactly one channel alive, bound to whichever session the
//! multiplexer reports as active, and re-opens it when the active session
//! changes. Every inbound message carries the id its channel was opened
//! for, so output that arrives after a tab switch is still appended to the
//! session that produced it.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::session::SessionMultiplexer;
use crate::store::KeyValueStore;

/// Default buffer size for channel queues.
pub const CHANNEL_CAPACITY: usize = 128;

/// Data received on a channel, tagged with the channel's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub session_id: String,
    pub data: String,
}

/// Transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to connect session {session_id}: {reason}")]
    ConnectFailed { session_id: String, reason: String },

    #[error("Channel for session {session_id} is closed")]
    Closed { session_id: String },
}

/// Opens session-scoped channels. Implementations own the wire.
pub trait Transport {
    fn connect(&self, session_id: &str) -> Result<Channel, TransportError>;
}

/// Client end of a session-scoped channel.
///
/// Dropping it closes the outbound queue, which is the teardown signal for
/// the transport side.
#[derive(Debug)]
pub struct Channel {
    session_id: String,
    outbound: mpsc::Sender<String>,
    inbound: mpsc::Receiver<Inbound>,
}

/// Transport end of a [`Channel`].
#[derive(Debug)]
pub struct ChannelPeer {
    session_id: String,
    outbound: mpsc::Receiver<String>,
    inbound: mpsc::Sender<Inbound>,
}

impl Channel {
    /// Create a connected channel/peer pair for `session_id`.
    pub fn pair(session_id: &str, capacity: usize) -> (Self, ChannelPeer) {
        let (out_tx, out_rx) = mpsc::channel(capacity);
        let (in_tx, in_rx) = mpsc::channel(capacity);
        (
            Self {
                session_id: session_id.to_string(),
                outbound: out_tx,
                inbound: in_rx,
            },
            ChannelPeer {
                session_id: session_id.to_string(),
                outbound: out_rx,
                inbound: in_tx,
            },
        )
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn send(&self, text: String) -> Result<(), TransportError> {
        self.outbound
            .send(text)
            .await
            .map_err(|_| TransportError::Closed {
                session_id: self.session_id.clone(),
            })
    }

    pub async fn recv(&mut self) -> Option<Inbound> {
        self.inbound.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Inbound> {
        self.inbound.try_recv().ok()
    }
}

impl ChannelPeer {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Next outbound text; `None` once the client end is dropped.
    pub async fn recv(&mut self) -> Option<String> {
        self.outbound.recv().await
    }

    /// Deliver output to the client, tagged with this peer's session.
    pub async fn deliver(&self, data: impl Into<String>) -> Result<(), TransportError> {
        self.inbound
            .send(Inbound {
                session_id: self.session_id.clone(),
                data: data.into(),
            })
            .await
            .map_err(|_| TransportError::Closed {
                session_id: self.session_id.clone(),
            })
    }

    pub fn is_closed(&self) -> bool {
        self.inbound.is_closed()
    }
}

/// Keeps one transport channel bound to the active session.
pub struct SessionLink<T> {
    transport: T,
    channel: Option<Channel>,
}

impl<T: Transport> SessionLink<T> {
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            channel: None,
        }
    }

    /// Session the live channel belongs to.
    pub fn bound_session(&self) -> Option<&str> {
        self.channel.as_ref().map(Channel::session_id)
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Re-bind to the multiplexer's active session if it changed.
    ///
    /// Output already queued on the old channel is applied before the
    /// channel is dropped. Returns `true` when the binding changed.
    pub fn sync<S: KeyValueStore>(
        &mut self,
        mux: &mut SessionMultiplexer<S>,
    ) -> Result<bool, TransportError> {
        let active = mux.active_session_id().map(ToString::to_string);
        if self.bound_session() == active.as_deref() {
            return Ok(false);
        }

        self.drain_inbound(mux);
        if let Some(old) = self.channel.take() {
            debug!(session_id = old.session_id(), "Tearing down channel");
        }

        if let Some(id) = active {
            let channel = self.transport.connect(&id)?;
            info!(session_id = %id, "Channel bound");
            self.channel = Some(channel);
        }
        Ok(true)
    }

    /// Drop the live channel without re-binding.
    pub fn disconnect(&mut self) {
        if let Some(old) = self.channel.take() {
            debug!(session_id = old.session_id(), "Channel disconnected");
        }
    }

    /// Submit the bound session's input line and forward it.
    ///
    /// Returns the forwarded text, or `None` when nothing is bound or the
    /// input is empty. If the channel is closed the line is put back into
    /// the input buffer (caret at its end) so it can be retried; the history
    /// entry is kept.
    pub async fn submit<S: KeyValueStore>(
        &mut self,
        mux: &mut SessionMultiplexer<S>,
    ) -> Result<Option<String>, TransportError> {
        let Some(channel) = self.channel.as_ref() else {
            return Ok(None);
        };
        let id = channel.session_id();
        let Some(text) = mux.submit(id) else {
            return Ok(None);
        };
        if let Err(e) = channel.send(text.clone()).await {
            warn!(session_id = id, "Submit dropped: channel closed");
            let caret = text.len();
            mux.update_input_buffer(id, |buffer| *buffer = text);
            mux.set_caret_position(id, caret);
            return Err(e);
        }
        Ok(Some(text))
    }

    /// Apply every message already queued on the channel. Returns how many
    /// messages were read.
    pub fn drain_inbound<S: KeyValueStore>(&mut self, mux: &mut SessionMultiplexer<S>) -> usize {
        let Some(channel) = self.channel.as_mut() else {
            return 0;
        };
        let mut count = 0;
        while let Some(msg) = channel.try_recv() {
            deliver(mux, &msg);
            count += 1;
        }
        count
    }

    /// Wait for the next inbound message. Pending forever while unbound, so
    /// it can sit in a `tokio::select!` loop; `None` when the transport closed
    /// the channel.
    pub async fn recv(&mut self) -> Option<Inbound> {
        match self.channel.as_mut() {
            Some(channel) => channel.recv().await,
            None => std::future::pending().await,
        }
    }
}

/// Append inbound data to the session it is tagged with. Returns `false`
/// when that session no longer exists.
pub fn deliver<S: KeyValueStore>(mux: &mut SessionMultiplexer<S>, msg: &Inbound) -> bool {
    mux.append_scrollback(&msg.session_id, &msg.data)
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::store::MemoryStore;

    /// Hands out channel pairs and keeps the peers for the test to drive.
    #[derive(Default, Clone)]
    struct ManualTransport {
        peers: Arc<Mutex<Vec<ChannelPeer>>>,
    }

    impl ManualTransport {
        fn connected(&self) -> Vec<String> {
            self.peers
                .lock()
                .unwrap()
                .iter()
                .map(|p| p.session_id().to_string())
                .collect()
        }

        fn take_peer(&self, idx: usize) -> ChannelPeer {
            self.peers.lock().unwrap().remove(idx)
        }
    }

    impl Transport for ManualTransport {
        fn connect(&self, session_id: &str) -> Result<Channel, TransportError> {
            let (channel, peer) = Channel::pair(session_id, CHANNEL_CAPACITY);
            self.peers.lock().unwrap().push(peer);
            Ok(channel)
        }
    }

    struct RefusingTransport;

    impl Transport for RefusingTransport {
        fn connect(&self, session_id: &str) -> Result<Channel, TransportError> {
            Err(TransportError::ConnectFailed {
                session_id: session_id.to_string(),
                reason: "offline".into(),
            })
        }
    }

    fn mux_with(ids: &[&str]) -> SessionMultiplexer<MemoryStore> {
        let mut mux = SessionMultiplexer::with_defaults(MemoryStore::new());
        for id in ids {
            mux.add_session(Some((*id).to_string())).unwrap();
        }
        mux
    }

    #[tokio::test]
    async fn sync_binds_active_and_rebinds_on_switch() {
        let transport = ManualTransport::default();
        let mut link = SessionLink::new(transport.clone());
        let mut mux = mux_with(&["t1", "t2"]);

        assert!(link.sync(&mut mux).unwrap());
        assert_eq!(link.bound_session(), Some("t2"));
        assert!(!link.sync(&mut mux).unwrap());

        mux.select_session("t1").unwrap();
        assert!(link.sync(&mut mux).unwrap());
        assert_eq!(link.bound_session(), Some("t1"));
        assert_eq!(transport.connected(), ["t2", "t1"]);
        assert!(transport.take_peer(0).is_closed());
    }

    #[tokio::test]
    async fn sync_unbinds_when_no_active_session() {
        let mut link = SessionLink::new(ManualTransport::default());
        let mut mux = mux_with(&["t1"]);
        link.sync(&mut mux).unwrap();

        mux.remove_session("t1").unwrap();
        assert!(link.sync(&mut mux).unwrap());
        assert_eq!(link.bound_session(), None);
    }

    #[tokio::test]
    async fn submit_forwards_text_and_records_history() {
        let transport = ManualTransport::default();
        let mut link = SessionLink::new(transport.clone());
        let mut mux = mux_with(&["t1"]);
        link.sync(&mut mux).unwrap();

        mux.update_input_buffer("t1", |b| b.push_str("ls -la"));
        let sent = link.submit(&mut mux).await.unwrap();
        assert_eq!(sent.as_deref(), Some("ls -la"));

        let mut peer = transport.take_peer(0);
        assert_eq!(peer.recv().await.as_deref(), Some("ls -la"));
        let session = mux.session("t1").unwrap();
        assert_eq!(session.history, ["ls -la"]);
        assert!(session.input_buffer.is_empty());
    }

    #[tokio::test]
    async fn submit_with_empty_input_sends_nothing() {
        let mut link = SessionLink::new(ManualTransport::default());
        let mut mux = mux_with(&["t1"]);
        link.sync(&mut mux).unwrap();
        assert_eq!(link.submit(&mut mux).await.unwrap(), None);
    }

    #[tokio::test]
    async fn inbound_is_routed_by_tag_not_active_session() {
        let transport = ManualTransport::default();
        let mut link = SessionLink::new(transport.clone());
        let mut mux = mux_with(&["t1", "t2"]);
        link.sync(&mut mux).unwrap();

        let t2_peer = transport.take_peer(0);
        t2_peer.deliver("late output").await.unwrap();

        mux.select_session("t1").unwrap();
        link.sync(&mut mux).unwrap();

        assert_eq!(mux.session("t2").unwrap().scrollback, "late output");
        assert_eq!(mux.session("t1").unwrap().scrollback, "");
    }

    #[tokio::test]
    async fn recv_then_deliver_appends_scrollback() {
        let transport = ManualTransport::default();
        let mut link = SessionLink::new(transport.clone());
        let mut mux = mux_with(&["t1"]);
        link.sync(&mut mux).unwrap();

        let peer = transport.take_peer(0);
        peer.deliver("hello\n").await.unwrap();
        let msg = link.recv().await.unwrap();
        assert!(deliver(&mut mux, &msg));
        assert_eq!(mux.session("t1").unwrap().scrollback, "hello\n");
    }

    #[tokio::test]
    async fn delivery_to_removed_session_is_dropped() {
        let mut mux = mux_with(&["t1"]);
        mux.remove_session("t1").unwrap();
        let msg = Inbound {
            session_id: "t1".into(),
            data: "hello".into(),
        };
        assert!(!deliver(&mut mux, &msg));
        assert!(mux.session("t1").is_none());
        assert!(mux.session_ids().is_empty());
    }

    #[tokio::test]
    async fn submit_on_closed_channel_restores_input() {
        let transport = ManualTransport::default();
        let mut link = SessionLink::new(transport.clone());
        let mut mux = mux_with(&["t1"]);
        link.sync(&mut mux).unwrap();
        drop(transport.take_peer(0));

        mux.update_input_buffer("t1", |b| b.push_str("make"));
        let err = link.submit(&mut mux).await.unwrap_err();
        assert!(matches!(err, TransportError::Closed { .. }));

        let session = mux.session("t1").unwrap();
        assert_eq!(session.input_buffer, "make");
        assert_eq!(session.caret_position, 4);
        assert_eq!(session.history, ["make"]);
    }

    #[test]
    fn connect_failure_leaves_link_unbound() {
        let mut link = SessionLink::new(RefusingTransport);
        let mut mux = mux_with(&["t1"]);
        assert!(link.sync(&mut mux).is_err());
        assert_eq!(link.bound_session(), None);
    }
}
