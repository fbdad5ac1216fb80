#![deny(clippy::expect_used, clippy::unwrap_used)]

//! TCP NewReno congestion control (RFC 2582, RFC 3782).
//!
//! A per-connection controller decides how much unacknowledged data may be
//! outstanding, driven by new ACKs, duplicate ACKs and retransmission
//! timeouts reported by the transport.
//!
//! TCP NewReno 拥塞控制库的根。

pub mod config;
pub mod congestion;
pub mod connection;
pub mod error;
pub mod sender;
pub mod seq;
pub mod trace;

pub use config::{Algorithm, CongestionControlConfig, Config};
pub use congestion::{
    CongestionControl, CongestionDecision, CongestionState, NewReno, Reno, TransportSnapshot,
};
pub use connection::{Connection, ConnectionHandle, Signal, WindowSnapshot};
pub use error::{Error, Result};
pub use sender::SendState;
pub use seq::SeqNum;
