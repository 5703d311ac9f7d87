//! WebSocket sockets backed by `tokio-tungstenite`.
//!
//! Each [`WsSocket`] runs one connection task at a time. The task owns the
//! stream, reports lifecycle and data as [`SocketEvent`]s on a shared
//! channel, and takes outbound frames from a bounded queue.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tether_core::PhysicalAddress;
use tether_transport::{Socket, SocketError, SocketEvent, SocketFactory};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, trace, warn};

/// Creates [`WsSocket`]s that all report into one event channel.
#[derive(Clone, Debug)]
pub struct WsSocketFactory {
    events: mpsc::UnboundedSender<SocketEvent>,
    heartbeat: Option<Duration>,
    outbound_buffer: usize,
}

impl WsSocketFactory {
    /// Create a factory.
    ///
    /// `heartbeat` is the ping interval (`None` disables pings).
    /// `outbound_buffer` bounds each socket's unsent frame queue.
    pub fn new(
        events: mpsc::UnboundedSender<SocketEvent>,
        heartbeat: Option<Duration>,
        outbound_buffer: usize,
    ) -> Self {
        Self {
            events,
            heartbeat,
            outbound_buffer: outbound_buffer.max(1),
        }
    }
}

impl SocketFactory for WsSocketFactory {
    fn create(&self, address: &PhysicalAddress) -> Box<dyn Socket> {
        Box::new(WsSocket {
            address: address.clone(),
            events: self.events.clone(),
            heartbeat: self.heartbeat,
            outbound_buffer: self.outbound_buffer,
            link: None,
        })
    }
}

/// A live or pending connection task.
///
/// The task closes its end of `outbound` before reporting `Closed`, so a
/// closed channel means the link is spent.
struct Link {
    outbound: mpsc::Sender<String>,
    _guard: DropGuard,
}

/// One WebSocket address.
pub struct WsSocket {
    address: PhysicalAddress,
    events: mpsc::UnboundedSender<SocketEvent>,
    heartbeat: Option<Duration>,
    outbound_buffer: usize,
    link: Option<Link>,
}

impl std::fmt::Debug for WsSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsSocket")
            .field("address", &self.address)
            .field("linked", &self.link.is_some())
            .finish_non_exhaustive()
    }
}

impl Socket for WsSocket {
    fn open(&mut self, delay: Duration) {
        if self.link.as_ref().is_some_and(|link| !link.outbound.is_closed()) {
            trace!(address = %self.address, "open ignored, connection task is live");
            return;
        }
        let (outbound, outbound_rx) = mpsc::channel(self.outbound_buffer);
        let cancel = CancellationToken::new();
        let _ = tokio::spawn(run_connection(
            self.address.clone(),
            delay,
            self.heartbeat,
            self.events.clone(),
            outbound_rx,
            cancel.clone(),
        ));
        self.link = Some(Link {
            outbound,
            _guard: cancel.drop_guard(),
        });
    }

    fn send(&mut self, text: &str) -> Result<(), SocketError> {
        let Some(link) = self.link.as_ref() else {
            return Err(SocketError::NotConnected);
        };
        link.outbound.try_send(text.to_owned()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SocketError::Io("outbound buffer full".into()),
            mpsc::error::TrySendError::Closed(_) => SocketError::Closed,
        })
    }

    fn close(&mut self) {
        // dropping the guard cancels the task
        if self.link.take().is_some() {
            debug!(address = %self.address, "socket close requested");
        }
    }
}

/// Wait for the next heartbeat tick, or forever when pings are off.
async fn next_ping(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            let _ = interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// How a connection task ended.
enum Ending {
    /// Cancelled before a connection was made. Nothing to report.
    Abandoned,
    /// The connection closed, or never came up.
    Closed(Option<String>),
}

/// Run one connection attempt and report its end.
async fn run_connection(
    address: PhysicalAddress,
    delay: Duration,
    heartbeat: Option<Duration>,
    events: mpsc::UnboundedSender<SocketEvent>,
    mut outbound: mpsc::Receiver<String>,
    cancel: CancellationToken,
) {
    let ending =
        connect_and_pump(&address, delay, heartbeat, &events, &mut outbound, &cancel).await;
    outbound.close();
    if let Ending::Closed(reason) = ending {
        let _ = events.send(SocketEvent::Closed { address, reason });
    }
}

/// Connect after `delay`, then pump frames until either side closes.
async fn connect_and_pump(
    address: &PhysicalAddress,
    delay: Duration,
    heartbeat: Option<Duration>,
    events: &mpsc::UnboundedSender<SocketEvent>,
    outbound: &mut mpsc::Receiver<String>,
    cancel: &CancellationToken,
) -> Ending {
    if !delay.is_zero() {
        tokio::select! {
            () = cancel.cancelled() => return Ending::Abandoned,
            () = tokio::time::sleep(delay) => {}
        }
    }

    let connected = tokio::select! {
        () = cancel.cancelled() => return Ending::Abandoned,
        result = connect_async(address.as_str()) => result,
    };
    let ws = match connected {
        Ok((ws, _response)) => ws,
        Err(e) => {
            let _ = events.send(SocketEvent::Error {
                address: address.clone(),
                error: e.to_string(),
            });
            return Ending::Closed(Some("connect failed".into()));
        }
    };
    let _ = events.send(SocketEvent::Opened {
        address: address.clone(),
    });

    let (mut ws_tx, mut ws_rx) = ws.split();
    let mut pings = heartbeat.map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                return Ending::Closed(Some("closed locally".into()));
            }
            frame = outbound.recv() => {
                let Some(text) = frame else {
                    return Ending::Closed(Some("closed locally".into()));
                };
                if let Err(e) = ws_tx.send(Message::text(text)).await {
                    let _ = events.send(SocketEvent::Error {
                        address: address.clone(),
                        error: e.to_string(),
                    });
                    return Ending::Closed(None);
                }
            }
            () = next_ping(&mut pings) => {
                trace!(%address, "heartbeat ping");
                if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                    return Ending::Closed(Some("heartbeat failed".into()));
                }
            }
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(SocketEvent::Message {
                        address: address.clone(),
                        text: text.as_str().to_owned(),
                    });
                }
                Some(Ok(Message::Close(frame))) => {
                    return Ending::Closed(frame.map(|f| f.reason.as_str().to_owned()));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(%address, error = %e, "websocket read failed");
                    let _ = events.send(SocketEvent::Error {
                        address: address.clone(),
                        error: e.to_string(),
                    });
                    return Ending::Closed(None);
                }
                None => return Ending::Closed(None),
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn factory() -> (WsSocketFactory, mpsc::UnboundedReceiver<SocketEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (WsSocketFactory::new(tx, None, 4), rx)
    }

    #[test]
    fn send_before_open_is_not_connected() {
        let (factory, _rx) = factory();
        let mut socket = factory.create(&PhysicalAddress::from("ws://127.0.0.1:1/"));
        assert_matches!(socket.send("x"), Err(SocketError::NotConnected));
    }

    #[tokio::test]
    async fn refused_connect_reports_error_then_close() {
        // bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (factory, mut rx) = factory();
        let address = PhysicalAddress::from(format!("ws://127.0.0.1:{port}/"));
        let mut socket = factory.create(&address);
        socket.open(Duration::ZERO);

        assert_matches!(rx.recv().await, Some(SocketEvent::Error { .. }));
        assert_matches!(
            rx.recv().await,
            Some(SocketEvent::Closed { reason: Some(r), .. }) if r == "connect failed"
        );
    }

    #[tokio::test]
    async fn close_during_delay_reports_nothing() {
        let (factory, mut rx) = factory();
        let mut socket = factory.create(&PhysicalAddress::from("ws://127.0.0.1:1/"));
        socket.open(Duration::from_secs(60));
        socket.close();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_outbound_queue_is_an_io_error() {
        let (factory, _rx) = factory();
        let mut socket = factory.create(&PhysicalAddress::from("ws://127.0.0.1:1/"));
        // the task sleeps, so nothing drains the queue
        socket.open(Duration::from_secs(60));
        for _ in 0..4 {
            socket.send("x").unwrap();
        }
        assert_matches!(socket.send("x"), Err(SocketError::Io(_)));
    }
}
