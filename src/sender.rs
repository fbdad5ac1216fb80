//! Transport-side send state.
//!
//! Owns the send sequence space and the connection's congestion controller.
//! Incoming acknowledgments are classified here as new, duplicate or invalid
//! before the controller ever sees them, so the controller's preconditions
//! hold by construction.
//!
//! 传输层发送状态：负责序列空间、ACK 分类，并驱动拥塞控制器。

use crate::{
    config::Config,
    congestion::{self, CongestionControl, CongestionDecision, CongestionState, TransportSnapshot},
    error::{Error, Result},
    seq::SeqNum,
    trace::{WindowChange, WindowObserver},
};
use tokio::time::Instant;
use tracing::{trace, warn};

/// Send state of one connection.
///
/// ```text
///        snd_una            snd_nxt
///   ---------|------------------|----------------------
///    acked   |    in flight     |  sendable (cwnd/rwnd)
/// ```
pub struct SendState {
    controller: Box<dyn CongestionControl>,
    snd_una: SeqNum,
    snd_nxt: SeqNum,
    receiver_window: u32,
    /// Bytes granted by Limited Transmit and not yet used.
    limited_transmit_credit: u32,
    observers: Vec<Box<dyn WindowObserver>>,
    created_at: Instant,
}

impl std::fmt::Debug for SendState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendState")
            .field("controller", &self.controller)
            .field("snd_una", &self.snd_una)
            .field("snd_nxt", &self.snd_nxt)
            .field("receiver_window", &self.receiver_window)
            .field("limited_transmit_credit", &self.limited_transmit_credit)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl SendState {
    /// Creates send state with the controller selected by `config`.
    ///
    /// 使用配置选择的拥塞控制器创建发送状态。
    pub fn new(config: &Config, iss: SeqNum, receiver_window: u32) -> Result<Self> {
        config.validate()?;
        let controller = congestion::build(&config.congestion_control)?;
        Ok(Self::with_controller(controller, iss, receiver_window))
    }

    pub fn with_controller(
        controller: Box<dyn CongestionControl>,
        iss: SeqNum,
        receiver_window: u32,
    ) -> Self {
        Self {
            controller,
            snd_una: iss,
            snd_nxt: iss,
            receiver_window,
            limited_transmit_credit: 0,
            observers: Vec::new(),
            created_at: Instant::now(),
        }
    }

    /// State for a child connection: forked controller, fresh sequence space,
    /// no observers.
    ///
    /// 为子连接创建发送状态。
    pub fn fork(&self, iss: SeqNum, receiver_window: u32) -> Self {
        Self::with_controller(self.controller.fork(), iss, receiver_window)
    }

    pub fn register_observer(&mut self, observer: impl WindowObserver) {
        self.observers.push(Box::new(observer));
    }

    pub fn snapshot(&self) -> TransportSnapshot {
        TransportSnapshot {
            snd_una: self.snd_una,
            snd_nxt: self.snd_nxt,
            flight_size: self.flight_size(),
            receiver_window: self.receiver_window,
        }
    }

    pub fn flight_size(&self) -> u32 {
        self.snd_nxt - self.snd_una
    }

    /// Bytes of new data the transport may send now:
    /// `min(cwnd, rwnd) - flight_size`, plus any Limited Transmit credit
    /// that still fits the receiver window.
    pub fn sendable(&self) -> u32 {
        let flight = self.flight_size();
        let window = self.controller.congestion_window().min(self.receiver_window);
        window
            .saturating_sub(flight)
            .saturating_add(self.limited_transmit_credit)
            .min(self.receiver_window.saturating_sub(flight))
    }

    /// Records `bytes` of newly transmitted data.
    ///
    /// 记录新发送的数据。
    pub fn on_sent(&mut self, bytes: u32) -> Result<()> {
        let sendable = self.sendable();
        if bytes > sendable {
            warn!(requested = bytes, sendable, "Send exceeds permitted window");
            return Err(Error::SendBeyondWindow {
                requested: bytes,
                sendable,
            });
        }
        let window_allowance = self
            .controller
            .congestion_window()
            .min(self.receiver_window)
            .saturating_sub(self.flight_size());
        let from_credit = bytes.saturating_sub(window_allowance);
        self.limited_transmit_credit = self.limited_transmit_credit.saturating_sub(from_credit);
        self.snd_nxt = self.snd_nxt + bytes;
        trace!(bytes, snd_nxt = %self.snd_nxt, flight = self.flight_size(), "Data sent");
        Ok(())
    }

    /// Processes an acknowledgment carrying cumulative ACK `ack` and the
    /// peer's receive window.
    ///
    /// Returns `None` for a pure window update (nothing outstanding).
    ///
    /// 处理一个ACK。
    pub fn on_ack(&mut self, ack: SeqNum, receiver_window: u32) -> Result<Option<CongestionDecision>> {
        if ack < self.snd_una {
            warn!(%ack, snd_una = %self.snd_una, "Rejecting stale ACK");
            return Err(Error::StaleAck {
                ack,
                snd_una: self.snd_una,
            });
        }
        if ack > self.snd_nxt {
            warn!(%ack, snd_nxt = %self.snd_nxt, "Rejecting ACK for unsent data");
            return Err(Error::AckBeyondSent {
                ack,
                snd_nxt: self.snd_nxt,
            });
        }

        self.receiver_window = receiver_window;
        let old_cwnd = self.controller.congestion_window();

        let decision = if ack == self.snd_una {
            if self.flight_size() == 0 {
                trace!(%ack, receiver_window, "Window update");
                return Ok(None);
            }
            let transport = self.snapshot();
            let decision = self.controller.on_dup_ack(ack, &transport);
            if decision.state == CongestionState::FastRecovery {
                // The inflated window already counts the segments that left
                // the network; unused grants must not stack on top of it.
                self.limited_transmit_credit = 0;
            } else if let Some(bytes) = decision.limited_transmit {
                self.limited_transmit_credit = self.limited_transmit_credit.saturating_add(bytes);
            }
            decision
        } else {
            let bytes_acked = ack - self.snd_una;
            self.snd_una = ack;
            self.limited_transmit_credit = 0;
            let transport = self.snapshot();
            self.controller.on_new_ack(ack, bytes_acked, &transport)
        };

        self.notify(old_cwnd, &decision);
        Ok(Some(decision))
    }

    /// The retransmission timer fired.
    ///
    /// 重传定时器超时。
    pub fn on_retransmit_timeout(&mut self) -> CongestionDecision {
        let old_cwnd = self.controller.congestion_window();
        self.limited_transmit_credit = 0;
        let transport = self.snapshot();
        let decision = self.controller.on_retransmit_timeout(&transport);
        self.notify(old_cwnd, &decision);
        decision
    }

    fn notify(&mut self, old_cwnd: u32, decision: &CongestionDecision) {
        if old_cwnd == decision.cwnd || self.observers.is_empty() {
            return;
        }
        let change = WindowChange {
            elapsed: self.created_at.elapsed(),
            old_cwnd,
            new_cwnd: decision.cwnd,
            ssthresh: decision.ssthresh,
            state: decision.state,
        };
        for observer in &mut self.observers {
            observer.on_window_change(&change);
        }
    }

    pub fn congestion_window(&self) -> u32 {
        self.controller.congestion_window()
    }

    pub fn slow_start_threshold(&self) -> u32 {
        self.controller.slow_start_threshold()
    }

    pub fn state(&self) -> CongestionState {
        self.controller.state()
    }

    pub fn algorithm_name(&self) -> &'static str {
        self.controller.algorithm_name()
    }

    pub fn snd_una(&self) -> SeqNum {
        self.snd_una
    }

    pub fn snd_nxt(&self) -> SeqNum {
        self.snd_nxt
    }

    pub fn receiver_window(&self) -> u32 {
        self.receiver_window
    }
}
