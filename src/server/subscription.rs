use crate::error::{Error, Result};
use crate::server::process::{ListenerId, LogListener, ServerProcess};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Bounded wait applied by [`LogSubscription::next`] before yielding `None`.
const NEXT_TIMEOUT: Duration = Duration::from_secs(1);

/// Listener half of a subscription: pushes every delivered line onto the
/// queue. Delivery never blocks the read loop.
struct QueueListener {
    sender: mpsc::UnboundedSender<String>,
}

impl LogListener for QueueListener {
    fn on_message(&self, line: &str) -> Result<()> {
        self.sender
            .send(line.to_string())
            .map_err(|_| Error::Listener("Subscription queue closed".to_string()))
    }
}

/// A pull-style view of a server's console stream.
///
/// Buffers every line delivered after [`subscribe`](Self::subscribe) into an
/// unbounded queue, consumed with [`next`](Self::next) (waits up to one
/// second, then yields `None`) and [`has_next`](Self::has_next)
/// (non-blocking). Does not subscribe automatically.
///
/// # Example
///
/// ```no_run
/// use worldsmith::server::{LogSubscription, ServerProcess};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> worldsmith::error::Result<()> {
/// let server = Arc::new(ServerProcess::new(
///     "survival".to_string(),
///     "/srv/minecraft",
///     "java".to_string(),
///     vec![],
/// ));
/// let mut tail = LogSubscription::new(Arc::clone(&server));
/// tail.subscribe()?;
/// while let Some(line) = tail.next().await {
///     println!("{}", line);
/// }
/// tail.unsubscribe()?;
/// # Ok(())
/// # }
/// ```
pub struct LogSubscription {
    server: Arc<ServerProcess>,
    listener: Arc<QueueListener>,
    receiver: mpsc::UnboundedReceiver<String>,
    id: Option<ListenerId>,
}

impl LogSubscription {
    /// Creates a subscription for the given server without registering it.
    pub fn new(server: Arc<ServerProcess>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            server,
            listener: Arc::new(QueueListener { sender }),
            receiver,
            id: None,
        }
    }

    /// Registers this subscription with the server's listener set.
    ///
    /// The first queued line will be the synthetic "Subscribed to server
    /// logs." notification. No-op when already subscribed.
    pub fn subscribe(&mut self) -> Result<()> {
        if self.id.is_none() {
            let id = self
                .server
                .add_listener(Arc::clone(&self.listener) as Arc<dyn LogListener>)?;
            self.id = Some(id);
        }
        Ok(())
    }

    /// Unregisters this subscription.
    ///
    /// The final queued line will be the synthetic "Unsubscribed from
    /// server logs." notification. No-op when not subscribed.
    pub fn unsubscribe(&mut self) -> Result<()> {
        if let Some(id) = self.id.take() {
            self.server.remove_listener(id)?;
        }
        Ok(())
    }

    /// Returns true if a line is queued and `next` would yield immediately.
    pub fn has_next(&self) -> bool {
        !self.receiver.is_empty()
    }

    /// Returns the next queued line, waiting up to one second before
    /// yielding `None`. Never blocks indefinitely.
    pub async fn next(&mut self) -> Option<String> {
        match tokio::time::timeout(NEXT_TIMEOUT, self.receiver.recv()).await {
            Ok(line) => line,
            Err(_) => None,
        }
    }
}
