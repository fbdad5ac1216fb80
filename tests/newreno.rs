//! End-to-end NewReno behaviour through the connection actor.

pub mod common;

use common::harness::{init_tracing, TestConnection, ISS, MSS, RWND};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tcp_newreno::{
    trace::TraceWriter, Algorithm, CongestionState, Config, Connection, Error, SendState, SeqNum,
    Signal,
};

fn seq(offset: u32) -> SeqNum {
    SeqNum::new(ISS) + offset
}

#[tokio::test]
async fn test_slow_start_without_loss() {
    let mut conn = TestConnection::spawn(&Config::default());
    assert_eq!(conn.fill_window().await, 14480);

    let mut previous = 0;
    for i in 1..=10 {
        let decision = conn.handle.ack(seq(i * MSS), RWND).await.unwrap().unwrap();
        assert!(decision.cwnd > previous);
        previous = decision.cwnd;
    }

    let snapshot = conn.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.cwnd, 29960);
    assert_eq!(snapshot.state, CongestionState::SlowStart);
    assert_eq!(snapshot.flight_size, 0);
    assert_eq!(snapshot.sendable, 29960);
    assert!(conn.drain_signals().is_empty());
}

#[tokio::test]
async fn test_fast_retransmit_and_recovery() {
    let mut config = Config::default();
    config.congestion_control.initial_cwnd_segments = 14;
    let mut conn = TestConnection::spawn(&config);
    conn.handle.sent(20000).await.unwrap();

    // First two duplicates: Limited Transmit only.
    for _ in 0..2 {
        let decision = conn.handle.ack(seq(0), RWND).await.unwrap().unwrap();
        assert_eq!(decision.cwnd, 14 * MSS);
        assert_eq!(conn.drain_signals(), vec![Signal::LimitedTransmit(MSS)]);
    }

    // Third duplicate: fast retransmit.
    let decision = conn.handle.ack(seq(0), RWND).await.unwrap().unwrap();
    assert_eq!(decision.ssthresh, 10000);
    assert_eq!(decision.cwnd, 14344);
    assert_eq!(decision.state, CongestionState::FastRecovery);
    assert_eq!(conn.drain_signals(), vec![Signal::Retransmit(seq(0))]);

    // Fourth duplicate: inflation, no retransmission.
    let decision = conn.handle.ack(seq(0), RWND).await.unwrap().unwrap();
    assert_eq!(decision.cwnd, 15792);
    assert_eq!(decision.state, CongestionState::FastRecovery);
    assert!(conn.drain_signals().is_empty());

    // Partial ACK: exactly one retransmission of the next hole.
    let decision = conn.handle.ack(seq(MSS), RWND).await.unwrap().unwrap();
    assert_eq!(decision.state, CongestionState::FastRecovery);
    assert_eq!(conn.drain_signals(), vec![Signal::Retransmit(seq(MSS))]);

    // Full ACK covering the recovery point.
    let decision = conn.handle.ack(seq(20000), RWND).await.unwrap().unwrap();
    assert_eq!(decision.cwnd, decision.ssthresh);
    assert_eq!(decision.cwnd, 10000);
    assert_ne!(decision.state, CongestionState::FastRecovery);
    assert!(conn.drain_signals().is_empty());
}

#[tokio::test]
async fn test_retransmit_timeout_resets_window() {
    let mut conn = TestConnection::spawn(&Config::default());
    conn.fill_window().await;
    for _ in 0..3 {
        conn.handle.ack(seq(0), RWND).await.unwrap();
    }
    conn.drain_signals();

    let decision = conn.handle.retransmit_timeout().await.unwrap();
    assert_eq!(decision.cwnd, MSS);
    assert_eq!(decision.ssthresh, 7240);
    assert_eq!(decision.state, CongestionState::SlowStart);
    assert_eq!(
        conn.drain_signals(),
        vec![Signal::Retransmit(seq(0)), Signal::BackoffTimer]
    );
}

#[tokio::test]
async fn test_precondition_violations_do_not_touch_window() {
    let conn = TestConnection::spawn(&Config::default());
    conn.handle.sent(MSS).await.unwrap();

    let stale = conn.handle.ack(SeqNum::new(ISS - 1), RWND).await;
    assert!(matches!(stale, Err(Error::StaleAck { .. })));

    let beyond = conn.handle.ack(seq(2 * MSS), RWND).await;
    assert!(matches!(beyond, Err(Error::AckBeyondSent { .. })));

    let too_much = conn.handle.sent(RWND).await;
    assert!(matches!(too_much, Err(Error::SendBeyondWindow { .. })));

    let snapshot = conn.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.cwnd, 14480);
    assert_eq!(snapshot.flight_size, MSS);
}

#[tokio::test]
async fn test_fork_spawns_independent_child() {
    let mut config = Config::default();
    config.congestion_control.algorithm = Algorithm::Reno;
    let parent = TestConnection::spawn(&config);
    parent.handle.sent(10000).await.unwrap();
    parent.handle.retransmit_timeout().await.unwrap();

    let (handle, signals) = parent.handle.fork(2, SeqNum::new(9000), RWND).await.unwrap();
    let child = TestConnection::from_parts(handle, signals);
    assert_eq!(child.handle.id(), 2);
    drop(parent);

    let snapshot = child.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.cwnd, 14480);
    assert_eq!(snapshot.ssthresh, 65535);
    assert_eq!(snapshot.snd_una, SeqNum::new(9000));
    assert_eq!(snapshot.flight_size, 0);

    child.handle.sent(MSS).await.unwrap();
    let decision = child
        .handle
        .ack(SeqNum::new(9000 + MSS), RWND)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(decision.cwnd, 14480 + MSS);
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_cwnd_trace_output() {
    init_tracing();
    let buf = SharedBuf::default();
    let mut state = SendState::new(&Config::default(), SeqNum::new(ISS), RWND).unwrap();
    state.register_observer(TraceWriter::new(buf.clone()));
    let (handle, _signals) = Connection::spawn(7, state);

    handle.sent(2 * MSS).await.unwrap();
    tokio::time::advance(Duration::from_millis(500)).await;
    handle.ack(seq(MSS), RWND).await.unwrap();
    tokio::time::advance(Duration::from_millis(500)).await;
    handle.ack(seq(2 * MSS), RWND).await.unwrap();

    let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
    assert_eq!(text, "0.5\t15928\n1\t17376\n");
}
