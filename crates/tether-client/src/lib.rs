//! # tether-client
//!
//! Auto-reconnecting JSON-RPC 2.0 sessions over WebSocket.
//!
//! - [`TransportSession`]: transport and RPC state composed, synchronous
//! - [`WsSocketFactory`]: `tokio-tungstenite` sockets with heartbeat pings
//! - [`spawn_session`]: runs a session on a tokio task behind a [`SessionHandle`]
//!
//! ```no_run
//! # async fn demo() -> tether_client::Result<()> {
//! use tether_client::spawn_session;
//! use tether_core::LogicalEndpoint;
//! use tether_rpc::JsonRpcResponse;
//!
//! let settings = tether_settings::get_settings();
//! let session = spawn_session(settings);
//! session
//!     .register_response_handler("status", |_: &LogicalEndpoint, r: &JsonRpcResponse| {
//!         tracing::info!(id = r.id, "status answered");
//!     })
//!     .await?;
//! let _ = session
//!     .initialize_endpoint("builder", "ws://localhost:8080/rpc", vec![], vec![])
//!     .await?;
//! let _ = session.call(LogicalEndpoint::from("builder"), "status", None).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod driver;
pub mod errors;
pub mod session;
pub mod ws;

pub use driver::{SessionHandle, spawn_session, spawn_session_with};
pub use errors::{ClientError, Result};
pub use session::TransportSession;
pub use ws::{WsSocket, WsSocketFactory};
