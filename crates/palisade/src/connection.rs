//! Per-connection plumbing: the shared handle over a client connection.
//!
//! Each client connection is owned by exactly one task (the driver in
//! `handler`), but several parties need to act on it — the login state
//! machine, the player handle, extension hooks reaching through either.
//! [`ConnectionHandle`] is the cheaply-cloneable face they share. All
//! output goes through one ordered command queue drained by the
//! connection's writer task, which is what makes write-ordering
//! guarantees (like "the compression announcement is the last packet
//! written uncompressed") hold by construction.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use palisade_protocol::{ClientboundPacket, ProtocolVersion};
use tokio::sync::mpsc;

/// The protocol phase a connection's active handler belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolPhase {
    /// Login completion; the initial phase.
    Login,
    /// Post-login configuration (newer clients only).
    Config,
    /// Play; traffic is relayed to a backend.
    Play,
}

/// A command for the connection's writer task. Commands are processed
/// strictly in the order they were enqueued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundCommand {
    /// Encode and send a packet.
    Packet(ClientboundPacket),
    /// Switch outbound framing to compressed at the given threshold.
    /// Everything enqueued earlier goes out uncompressed.
    EnableCompression(i32),
    /// Stop writing and close the connection. `notify` distinguishes a
    /// graceful close (the client got a [`ClientboundPacket::Disconnect`]
    /// or completed normally) from a hard protocol-violation close.
    Close { notify: bool },
}

/// Shared handle to one client connection.
///
/// Writes are fire-and-forget: they enqueue onto the writer task and
/// return immediately. After [`close`](Self::close) the handle is inert —
/// further writes are dropped, and further closes are no-ops, so teardown
/// paths can call it unconditionally.
#[derive(Clone)]
pub struct ConnectionHandle {
    inner: Arc<Inner>,
}

struct Inner {
    protocol_version: ProtocolVersion,
    commands: mpsc::UnboundedSender<OutboundCommand>,
    closed: AtomicBool,
    compression_threshold: AtomicI32,
    phase: Mutex<ProtocolPhase>,
    association: Mutex<Option<String>>,
}

impl ConnectionHandle {
    /// Creates a handle and the command stream its writer task drains.
    pub fn open(
        protocol_version: ProtocolVersion,
    ) -> (Self, mpsc::UnboundedReceiver<OutboundCommand>) {
        let (commands, receiver) = mpsc::unbounded_channel();
        let handle = Self {
            inner: Arc::new(Inner {
                protocol_version,
                commands,
                closed: AtomicBool::new(false),
                compression_threshold: AtomicI32::new(-1),
                phase: Mutex::new(ProtocolPhase::Login),
                association: Mutex::new(None),
            }),
        };
        (handle, receiver)
    }

    /// The protocol version negotiated for this connection.
    pub fn protocol_version(&self) -> ProtocolVersion {
        self.inner.protocol_version
    }

    /// Enqueues a packet. Dropped silently if the connection is closed.
    pub fn write(&self, packet: ClientboundPacket) {
        if self.is_closed() {
            return;
        }
        let _ = self.inner.commands.send(OutboundCommand::Packet(packet));
    }

    /// Closes the connection. Idempotent: only the first call enqueues
    /// the close command.
    pub fn close(&self, notify: bool) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.inner.commands.send(OutboundCommand::Close { notify });
    }

    /// Whether this connection has been closed (by either side).
    ///
    /// This is the liveness poll the login state machine performs after
    /// every suspension point.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Raises the compression threshold. The switch is queued behind any
    /// packets already written, so the announcement packet written just
    /// before it is the last uncompressed one.
    pub fn set_compression_threshold(&self, threshold: i32) {
        self.inner
            .compression_threshold
            .store(threshold, Ordering::SeqCst);
        let _ = self
            .inner
            .commands
            .send(OutboundCommand::EnableCompression(threshold));
    }

    /// The current compression threshold (negative while uncompressed).
    pub fn compression_threshold(&self) -> i32 {
        self.inner.compression_threshold.load(Ordering::SeqCst)
    }

    /// Records the protocol phase of the active handler.
    pub fn set_phase(&self, phase: ProtocolPhase) {
        *lock(&self.inner.phase) = phase;
    }

    /// The protocol phase of the active handler.
    pub fn phase(&self) -> ProtocolPhase {
        *lock(&self.inner.phase)
    }

    /// Associates a display label (the player) with this connection for
    /// diagnostics.
    pub fn set_association(&self, label: String) {
        *lock(&self.inner.association) = Some(label);
    }

    /// The associated player label, if login got that far.
    pub fn association(&self) -> Option<String> {
        lock(&self.inner.association).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
