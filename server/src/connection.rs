use std::sync::Arc;

use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

use crate::protocol::Message;

/// Frames queued for a client's writer task
#[derive(Debug)]
pub enum Outbound {
    Message(Message),
    Close,
}

/// Handle to one client's channel.
///
/// Sending only enqueues; the socket write happens in the writer task that
/// owns the receiving half. Clones share identity, so two handles are the
/// same channel exactly when their ids match.
#[derive(Debug, Clone)]
pub struct Connection {
    id: Uuid,
    tx: mpsc::UnboundedSender<Outbound>,
    shutdown: Arc<Notify>,
}

impl Connection {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = Self {
            id: Uuid::new_v4(),
            tx,
            shutdown: Arc::new(Notify::new()),
        };
        (connection, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn same_channel(&self, other: &Connection) -> bool {
        self.id == other.id
    }

    /// Best-effort delivery. Returns false when the writer is gone.
    pub fn send(&self, msg: Message) -> bool {
        self.tx.send(Outbound::Message(msg)).is_ok()
    }

    /// Queues a close frame and wakes whoever waits in [`Connection::closed`].
    pub fn close(&self) {
        let _ = self.tx.send(Outbound::Close);
        self.shutdown.notify_one();
    }

    /// Resolves once [`Connection::close`] has been called.
    pub async fn closed(&self) {
        self.shutdown.notified().await;
    }
}
