//! Network side of the bridge: wire protocol, UDP loop and port housekeeping.

pub mod port;
pub mod protocol;
pub mod udp;

pub use udp::BridgeServer;
