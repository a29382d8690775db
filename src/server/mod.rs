/// Server process module for worldsmith.
///
/// This module owns the child process lifecycle and its console stream.
/// All console communication is line-oriented: commands go in on stdin,
/// logs come out on stdout, and every output line is fanned out to
/// registered [`LogListener`]s by a dedicated read-loop task.
///
/// # Components
///
/// * `process` - Spawning, console I/O, readiness detection, listener fan-out
/// * `subscription` - Pull-style buffered queue over the listener interface
///
/// # Examples
///
/// Tailing a server's console:
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
///     vec!["-jar".to_string(), "server.jar".to_string(), "-nogui".to_string()],
/// ));
/// server.start().await?;
///
/// let mut tail = LogSubscription::new(Arc::clone(&server));
/// tail.subscribe()?;
/// while server.is_active() {
///     if let Some(line) = tail.next().await {
///         println!("{}", line);
///     }
/// }
/// # Ok(())
/// # }
/// ```
mod process;
mod subscription;

pub use process::{ListenerId, LogListener, ServerProcess, ServerStatus};
pub use subscription::LogSubscription;
