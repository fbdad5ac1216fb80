//! tests/common/harness.rs
use std::sync::Once;
use tcp_newreno::{Config, Connection, ConnectionHandle, SendState, SeqNum, Signal};
use tokio::sync::mpsc;
use tracing_subscriber::fmt::format::FmtSpan;

pub const MSS: u32 = 1448;
pub const ISS: u32 = 1000;
pub const RWND: u32 = 65535;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "tcp_newreno=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::FULL)
            .with_test_writer()
            .init();
    });
}

/// A connection actor plus the receiving end of its signal channel.
pub struct TestConnection {
    pub handle: ConnectionHandle,
    signals: mpsc::Receiver<Signal>,
}

impl TestConnection {
    pub fn spawn(config: &Config) -> Self {
        init_tracing();
        let state = SendState::new(config, SeqNum::new(ISS), RWND).unwrap();
        let (handle, signals) = Connection::spawn(1, state);
        Self { handle, signals }
    }

    pub fn from_parts(handle: ConnectionHandle, signals: mpsc::Receiver<Signal>) -> Self {
        Self { handle, signals }
    }

    /// Signals published so far. Every handle call waits for its response,
    /// and the actor publishes before responding, so nothing is in transit.
    pub fn drain_signals(&mut self) -> Vec<Signal> {
        let mut out = Vec::new();
        while let Ok(signal) = self.signals.try_recv() {
            out.push(signal);
        }
        out
    }

    /// Sends a full window's worth of segments.
    pub async fn fill_window(&self) -> u32 {
        let snapshot = self.handle.snapshot().await.unwrap();
        let mut sent = 0;
        while snapshot.sendable - sent >= MSS {
            self.handle.sent(MSS).await.unwrap();
            sent += MSS;
        }
        sent
    }
}
