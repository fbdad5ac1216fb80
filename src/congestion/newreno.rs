//! An implementation of TCP NewReno (RFC 2582, RFC 3782).
//!
//! NewReno differs from Reno only inside fast recovery: an acknowledgment
//! that covers some but not all of the data outstanding when recovery began
//! (a partial ACK) keeps the connection in recovery and retransmits the next
//! hole immediately, instead of exiting and waiting for a timeout.
//!
//! TCP NewReno 拥塞控制算法的实现。

use super::window::Window;
use super::{CongestionControl, CongestionDecision, CongestionState, TransportSnapshot};
use crate::config::CongestionControlConfig;
use crate::error::Result;
use crate::seq::SeqNum;
use tracing::{debug, trace};

/// A NewReno congestion controller.
///
/// NewReno 拥塞控制器。
#[derive(Debug, Clone)]
pub struct NewReno {
    window: Window,
    /// Highest sequence sent when fast recovery was entered. Only meaningful
    /// while `in_fast_recovery` is set.
    recover: SeqNum,
    in_fast_recovery: bool,
    /// `snd_nxt` at the last retransmission timeout. Until an ACK covers it,
    /// duplicate ACKs may be echoes of data sent before the timeout and do
    /// not start fast retransmit (RFC 3782 section 8).
    timeout_recover: Option<SeqNum>,
}

impl NewReno {
    /// Creates a NewReno controller, rejecting an invalid configuration.
    ///
    /// 创建 NewReno 控制器，无效配置返回错误。
    pub fn new(config: CongestionControlConfig) -> Result<Self> {
        Ok(Self::with_window(Window::new(config)?))
    }

    fn with_window(window: Window) -> Self {
        Self {
            window,
            recover: SeqNum::default(),
            in_fast_recovery: false,
            timeout_recover: None,
        }
    }

    /// The recovery point, if currently in fast recovery.
    pub fn recover(&self) -> Option<SeqNum> {
        self.in_fast_recovery.then_some(self.recover)
    }

    /// RFC 3782 step 5: deflate by the amount acked, then add back one
    /// segment if at least a full segment was acked.
    fn deflate(&mut self, bytes_acked: u32) {
        let mss = self.window.segment_size();
        let mut cwnd = self.window.cwnd.saturating_sub(bytes_acked);
        if bytes_acked >= mss {
            cwnd = cwnd.saturating_add(mss);
        }
        self.window.cwnd = cwnd.max(mss);
    }
}

impl CongestionControl for NewReno {
    fn on_new_ack(
        &mut self,
        ack: SeqNum,
        bytes_acked: u32,
        _transport: &TransportSnapshot,
    ) -> CongestionDecision {
        debug_assert!(bytes_acked > 0, "new ACK must acknowledge data");
        let before = self.window.before(self.in_fast_recovery);
        let mut retransmit = None;

        if self.in_fast_recovery {
            if ack >= self.recover {
                self.window.cwnd = self.window.ssthresh;
                self.window.dup_acks = 0;
                self.in_fast_recovery = false;
                debug!(
                    %ack,
                    recover = %self.recover,
                    cwnd = self.window.cwnd,
                    "Full ACK: leaving fast recovery"
                );
            } else {
                self.deflate(bytes_acked);
                retransmit = Some(ack);
                debug!(
                    %ack,
                    recover = %self.recover,
                    bytes_acked,
                    cwnd = self.window.cwnd,
                    "Partial ACK: retransmitting next unacknowledged segment"
                );
            }
        } else {
            self.window.grow();
            self.window.dup_acks = 0;
        }

        if self.timeout_recover.is_some_and(|point| ack >= point) {
            trace!(%ack, "Data outstanding at the last timeout acknowledged");
            self.timeout_recover = None;
        }

        self.window
            .decide(before, self.in_fast_recovery, retransmit, None, false)
    }

    fn on_dup_ack(&mut self, ack: SeqNum, transport: &TransportSnapshot) -> CongestionDecision {
        debug_assert_eq!(ack, transport.snd_una, "duplicate ACK must repeat snd_una");
        let before = self.window.before(self.in_fast_recovery);
        let mut retransmit = None;
        let mut limited_transmit = None;

        self.window.dup_acks = self.window.dup_acks.saturating_add(1);
        let dup_acks = self.window.dup_acks;
        let retx_thresh = self.window.retx_thresh();

        if self.in_fast_recovery {
            self.window.inflate();
            trace!(dup_acks, cwnd = self.window.cwnd, "Fast recovery: cwnd inflated");
        } else if dup_acks == retx_thresh
            && self.timeout_recover.is_some_and(|point| ack < point)
        {
            debug!(
                %ack,
                timeout_recover = ?self.timeout_recover,
                "Duplicate ACKs for data sent before the timeout: no fast retransmit"
            );
        } else if dup_acks == retx_thresh {
            self.window.enter_fast_recovery(transport.flight_size);
            self.recover = transport.snd_nxt;
            self.in_fast_recovery = true;
            retransmit = Some(ack);
            debug!(
                %ack,
                recover = %self.recover,
                flight_size = transport.flight_size,
                ssthresh = self.window.ssthresh,
                cwnd = self.window.cwnd,
                "Fast retransmit: entering fast recovery"
            );
        } else if dup_acks < retx_thresh {
            limited_transmit = self.window.limited_transmit(transport);
            trace!(dup_acks, ?limited_transmit, "Duplicate ACK below threshold");
        }

        self.window.decide(
            before,
            self.in_fast_recovery,
            retransmit,
            limited_transmit,
            false,
        )
    }

    fn on_retransmit_timeout(&mut self, transport: &TransportSnapshot) -> CongestionDecision {
        let before = self.window.before(self.in_fast_recovery);
        self.in_fast_recovery = false;
        self.timeout_recover = Some(transport.snd_nxt);
        self.window.collapse(transport.flight_size);
        debug!(
            snd_una = %transport.snd_una,
            flight_size = transport.flight_size,
            ssthresh = self.window.ssthresh,
            "Retransmission timeout: restarting slow start"
        );
        self.window
            .decide(before, false, Some(transport.snd_una), None, true)
    }

    fn fork(&self) -> Box<dyn CongestionControl> {
        Box::new(NewReno::with_window(self.window.reset()))
    }

    fn congestion_window(&self) -> u32 {
        self.window.cwnd
    }

    fn slow_start_threshold(&self) -> u32 {
        self.window.ssthresh
    }

    fn state(&self) -> CongestionState {
        self.window.phase(self.in_fast_recovery)
    }

    fn dup_ack_count(&self) -> u32 {
        self.window.dup_acks
    }

    fn segment_size(&self) -> u32 {
        self.window.segment_size()
    }

    fn algorithm_name(&self) -> &'static str {
        "NewReno"
    }
}
