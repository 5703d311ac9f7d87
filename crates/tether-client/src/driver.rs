//! The async driver: one task owns a [`TransportSession`].
//!
//! Socket events and application commands reach the task over channels and
//! are applied one at a time, so the session needs no locks. Socket events
//! are drained before commands when both are ready.

use serde_json::Value;
use tether_core::{LogicalEndpoint, PhysicalAddress};
use tether_rpc::{JsonRpcRequest, JsonRpcResponse, RequestHandler, ResponseHandler};
use tether_settings::TetherSettings;
use tether_transport::{Action, Delivery, SocketEvent, SocketFactory, Subscription};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::errors::{ClientError, Result};
use crate::session::TransportSession;
use crate::ws::WsSocketFactory;

/// Work applied to the session inside the driver task.
type Job = Box<dyn FnOnce(&mut TransportSession) + Send>;

/// Messages from [`SessionHandle`] to the driver.
enum Command {
    Apply(Job),
    Shutdown,
}

/// Owns the session and its inbound channels.
struct SessionDriver {
    session: TransportSession,
    events: mpsc::UnboundedReceiver<SocketEvent>,
    commands: mpsc::Receiver<Command>,
    cancel: CancellationToken,
}

impl SessionDriver {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                event = self.events.recv() => {
                    let Some(event) = event else { break };
                    let handled = self.session.handle_event(event);
                    if handled > 0 {
                        debug!(handled, "rpc handlers ran");
                    }
                }
                command = self.commands.recv() => match command {
                    Some(Command::Apply(job)) => job(&mut self.session),
                    Some(Command::Shutdown) | None => break,
                },
            }
        }
        info!(in_flight = self.session.in_flight(), "session driver stopped");
    }
}

/// Start a session over real WebSockets.
///
/// Must be called from within a tokio runtime.
pub fn spawn_session(settings: &TetherSettings) -> SessionHandle {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let factory = WsSocketFactory::new(
        events_tx,
        settings.heartbeat.interval(),
        settings.socket.outbound_buffer,
    );
    spawn_session_with(Box::new(factory), events_rx, settings).0
}

/// Start a session over any socket factory.
///
/// `events` must be the receiving side of the channel the factory's sockets
/// report into.
pub fn spawn_session_with(
    factory: Box<dyn SocketFactory>,
    events: mpsc::UnboundedReceiver<SocketEvent>,
    settings: &TetherSettings,
) -> (SessionHandle, JoinHandle<()>) {
    let (commands_tx, commands_rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    let driver = SessionDriver {
        session: TransportSession::new(factory, settings),
        events,
        commands: commands_rx,
        cancel: cancel.clone(),
    };
    let task = tokio::spawn(driver.run());
    (
        SessionHandle {
            commands: commands_tx,
            cancel,
        },
        task,
    )
}

/// Cloneable handle to a running session.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    cancel: CancellationToken,
}

impl SessionHandle {
    /// Run `f` against the session inside the driver task and return its
    /// result.
    pub async fn apply<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut TransportSession) -> R + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move |session| {
            let _ = tx.send(f(session));
        });
        self.commands
            .send(Command::Apply(job))
            .await
            .map_err(|_| ClientError::SessionClosed)?;
        rx.await.map_err(|_| ClientError::SessionClosed)
    }

    /// See [`TransportSession::initialize_endpoint`].
    pub async fn initialize_endpoint(
        &self,
        endpoint: impl Into<LogicalEndpoint>,
        address: impl Into<PhysicalAddress>,
        on_connect: Vec<Action>,
        on_disconnect: Vec<Action>,
    ) -> Result<Vec<Subscription>> {
        let endpoint = endpoint.into();
        let address = address.into();
        self.apply(move |s| s.initialize_endpoint(endpoint, address, on_connect, on_disconnect))
            .await?
    }

    /// See [`TransportSession::terminate_endpoint`].
    pub async fn terminate_endpoint(
        &self,
        endpoint: LogicalEndpoint,
        on_disconnect: Vec<Action>,
    ) -> Result<()> {
        self.apply(move |s| s.terminate_endpoint(&endpoint, on_disconnect))
            .await?
    }

    /// See [`TransportSession::register_request_handler`].
    pub async fn register_request_handler(
        &self,
        pattern: impl Into<String>,
        handler: impl RequestHandler + 'static,
    ) -> Result<()> {
        let pattern = pattern.into();
        self.apply(move |s| s.register_request_handler(&pattern, handler))
            .await
    }

    /// See [`TransportSession::register_response_handler`].
    pub async fn register_response_handler(
        &self,
        method: impl Into<String>,
        handler: impl ResponseHandler + 'static,
    ) -> Result<()> {
        let method = method.into();
        self.apply(move |s| s.register_response_handler(method, handler))
            .await
    }

    /// See [`TransportSession::call`].
    pub async fn call(
        &self,
        endpoint: LogicalEndpoint,
        method: impl Into<String>,
        params: Option<Value>,
    ) -> Result<i64> {
        let method = method.into();
        self.apply(move |s| s.call(&endpoint, method, params)).await?
    }

    /// See [`TransportSession::transmit_request`].
    pub async fn transmit_request(
        &self,
        endpoint: LogicalEndpoint,
        request: JsonRpcRequest,
    ) -> Result<Delivery> {
        self.apply(move |s| s.transmit_request(&endpoint, &request))
            .await?
    }

    /// See [`TransportSession::transmit_response`].
    pub async fn transmit_response(
        &self,
        endpoint: LogicalEndpoint,
        response: JsonRpcResponse,
    ) -> Result<Delivery> {
        self.apply(move |s| s.transmit_response(&endpoint, &response))
            .await?
    }

    /// See [`TransportSession::transmit_notification`].
    pub async fn transmit_notification(
        &self,
        endpoint: LogicalEndpoint,
        method: impl Into<String>,
        params: Option<Value>,
    ) -> Result<Delivery> {
        let method = method.into();
        self.apply(move |s| s.transmit_notification(&endpoint, method, params))
            .await?
    }

    /// See [`TransportSession::cancel_subscription`].
    pub async fn cancel_subscription(&self, subscription: Subscription) -> Result<bool> {
        self.apply(move |s| s.cancel_subscription(&subscription))
            .await
    }

    /// See [`TransportSession::cancel_reconnection`].
    pub async fn cancel_reconnection(&self, endpoint: LogicalEndpoint) -> Result<()> {
        self.apply(move |s| s.cancel_reconnection(&endpoint)).await?
    }

    /// See [`TransportSession::enable_reconnection`].
    pub async fn enable_reconnection(&self, endpoint: LogicalEndpoint) -> Result<()> {
        self.apply(move |s| s.enable_reconnection(&endpoint)).await?
    }

    /// Whether `endpoint` is connected.
    pub async fn is_open(&self, endpoint: LogicalEndpoint) -> Result<bool> {
        self.apply(move |s| s.is_open(&endpoint)).await
    }

    /// Requests waiting for a response.
    pub async fn in_flight(&self) -> Result<usize> {
        self.apply(|s| s.in_flight()).await
    }

    /// Stop the driver. Open sockets close when the session drops.
    pub async fn shutdown(&self) {
        if self.commands.send(Command::Shutdown).await.is_err() {
            self.cancel.cancel();
        }
    }

    /// Stop the driver without waiting for queued commands.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    /// Whether the driver has stopped accepting commands.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
