//! Protocol and package-level constants.

/// Current version of tether (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "tether";

/// Protocol tag carried by the transmission frame for JSON-RPC traffic.
pub const JSONRPC_PROTOCOL: &str = "jsonrpc-2.0";

/// Value of the `jsonrpc` member in every request and response payload.
pub const JSONRPC_VERSION: &str = "2.0";

/// Suffix that turns a request handler pattern into a prefix match.
pub const WILDCARD: char = '*';

/// Default number of reconnection attempts before the sustainer gives up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default delay before each reconnection attempt, in milliseconds.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 2_000;

/// Default number of messages held per endpoint while disconnected.
pub const DEFAULT_REPLAY_CAPACITY: usize = 100;

/// Default interval between heartbeat pings, in milliseconds.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 50_000;
