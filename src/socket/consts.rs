// src/socket/consts.rs
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "wss://sig.eyeson.com/call";

/// Upper bound for one websocket handshake.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(8);
/// Pause between failed connect attempts.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(2);
/// Writer idle time after which a ping is sent.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(3);
pub const KEEPALIVE_PAYLOAD: &[u8] = b"keepalive";
/// Upper bound for sending the close frame during stop.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

pub const INBOUND_CAPACITY: usize = 1;
pub const OUTBOUND_CAPACITY: usize = 1;
pub const STATUS_CAPACITY: usize = 1;
