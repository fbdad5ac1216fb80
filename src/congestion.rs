//! Defines the pluggable congestion control interface.
//! 定义了可插拔的拥塞控制接口。
//!
//! A controller only decides the congestion window. The transport owns the
//! sequence space and timers, reports a [`TransportSnapshot`] with every
//! event, and acts on the [`CongestionDecision`] it gets back.

use crate::config::{Algorithm, CongestionControlConfig};
use crate::error::Result;
use crate::seq::SeqNum;

pub mod newreno;
pub mod reno;
mod window;

pub use newreno::NewReno;
pub use reno::Reno;

/// 拥塞控制状态
/// Congestion control state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CongestionState {
    /// 慢启动阶段
    /// Slow start phase
    SlowStart,
    /// 拥塞避免阶段
    /// Congestion avoidance phase
    CongestionAvoidance,
    /// 快速恢复阶段
    /// Fast recovery phase
    FastRecovery,
}

/// What the transport knows about its send sequence space when it reports an
/// event.
///
/// 传输层在报告事件时的发送序列空间快照。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSnapshot {
    /// Oldest unacknowledged sequence number.
    pub snd_una: SeqNum,
    /// Highest sequence number sent so far (next byte to send).
    pub snd_nxt: SeqNum,
    /// Bytes sent but not yet acknowledged.
    pub flight_size: u32,
    /// The peer's advertised receive window.
    pub receiver_window: u32,
}

/// 拥塞控制决策结果
/// Congestion control decision result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CongestionDecision {
    /// 新的拥塞窗口大小
    /// New congestion window size
    pub cwnd: u32,

    /// 新的慢启动阈值
    /// New slow start threshold
    pub ssthresh: u32,

    /// 新的状态
    /// New state
    pub state: CongestionState,

    /// Retransmit the segment starting at this sequence number now.
    /// 立即重传从该序列号开始的报文段。
    pub retransmit: Option<SeqNum>,

    /// Limited Transmit allowance: bytes of new data that may be sent
    /// beyond the window.
    pub limited_transmit: Option<u32>,

    /// The transport should back off its retransmission timer.
    pub backoff_rto: bool,

    /// 是否发生了显著变化
    /// Whether cwnd, ssthresh or state changed
    pub significant_change: bool,
}

/// A trait for congestion control algorithms.
///
/// Implementations are driven by exactly three events and must never be
/// invoked concurrently for the same connection.
///
/// 拥塞控制算法的 trait。
pub trait CongestionControl: std::fmt::Debug + Send + Sync + 'static {
    /// Called for an acknowledgment that advances `snd_una`.
    ///
    /// `bytes_acked` is how far the cumulative ACK point moved.
    ///
    /// 当收到推进累计确认点的新ACK时调用。
    fn on_new_ack(
        &mut self,
        ack: SeqNum,
        bytes_acked: u32,
        transport: &TransportSnapshot,
    ) -> CongestionDecision;

    /// Called for an acknowledgment repeating the previous cumulative ACK
    /// while data is outstanding.
    ///
    /// 当收到重复ACK时调用。
    fn on_dup_ack(&mut self, ack: SeqNum, transport: &TransportSnapshot) -> CongestionDecision;

    /// Called when the retransmission timer fires.
    ///
    /// 当重传定时器超时时调用。
    fn on_retransmit_timeout(&mut self, transport: &TransportSnapshot) -> CongestionDecision;

    /// Creates a controller for a child connection with the same static
    /// configuration and freshly initialized dynamic state.
    ///
    /// 为子连接创建控制器：复制静态配置，重置动态状态。
    fn fork(&self) -> Box<dyn CongestionControl>;

    /// 获取当前拥塞窗口（字节）
    /// Get current congestion window in bytes
    fn congestion_window(&self) -> u32;

    /// 获取慢启动阈值（字节）
    /// Get slow start threshold in bytes
    fn slow_start_threshold(&self) -> u32;

    /// 获取当前状态
    /// Get current state
    fn state(&self) -> CongestionState;

    /// 是否处于快速恢复阶段
    /// Whether the controller is in fast recovery
    fn in_fast_recovery(&self) -> bool {
        self.state() == CongestionState::FastRecovery
    }

    /// Consecutive duplicate ACKs since the last new ACK.
    fn dup_ack_count(&self) -> u32;

    /// 获取最大报文段长度（字节）
    /// Get the segment size in bytes
    fn segment_size(&self) -> u32;

    /// 获取算法名称
    /// Get algorithm name
    fn algorithm_name(&self) -> &'static str;
}

/// Builds the controller selected by `config.algorithm`.
///
/// Fails with [`InvalidConfig`](crate::error::Error::InvalidConfig) when the parameters could not keep
/// cwnd at or above one segment.
///
/// 根据配置构建拥塞控制器。
pub fn build(config: &CongestionControlConfig) -> Result<Box<dyn CongestionControl>> {
    Ok(match config.algorithm {
        Algorithm::NewReno => Box::new(NewReno::new(config.clone())?),
        Algorithm::Reno => Box::new(Reno::new(config.clone())?),
    })
}
