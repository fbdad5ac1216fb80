//! Classic Reno (RFC 5681): fast retransmit and fast recovery without a
//! recovery point. The first new ACK ends recovery, even a partial one.
//!
//! 经典 Reno 拥塞控制。

use super::window::Window;
use super::{CongestionControl, CongestionDecision, CongestionState, TransportSnapshot};
use crate::config::CongestionControlConfig;
use crate::error::Result;
use crate::seq::SeqNum;
use tracing::{debug, trace};

/// A Reno congestion controller.
#[derive(Debug, Clone)]
pub struct Reno {
    window: Window,
    in_fast_recovery: bool,
}

impl Reno {
    /// Creates a Reno controller, rejecting an invalid configuration.
    pub fn new(config: CongestionControlConfig) -> Result<Self> {
        Ok(Self::with_window(Window::new(config)?))
    }

    fn with_window(window: Window) -> Self {
        Self {
            window,
            in_fast_recovery: false,
        }
    }
}

impl CongestionControl for Reno {
    fn on_new_ack(
        &mut self,
        ack: SeqNum,
        bytes_acked: u32,
        _transport: &TransportSnapshot,
    ) -> CongestionDecision {
        debug_assert!(bytes_acked > 0, "new ACK must acknowledge data");
        let before = self.window.before(self.in_fast_recovery);

        if self.in_fast_recovery {
            self.window.cwnd = self.window.ssthresh;
            self.in_fast_recovery = false;
            debug!(%ack, cwnd = self.window.cwnd, "New ACK: leaving fast recovery");
        } else {
            self.window.grow();
        }
        self.window.dup_acks = 0;

        self.window.decide(before, false, None, None, false)
    }

    fn on_dup_ack(&mut self, ack: SeqNum, transport: &TransportSnapshot) -> CongestionDecision {
        debug_assert_eq!(ack, transport.snd_una, "duplicate ACK must repeat snd_una");
        let before = self.window.before(self.in_fast_recovery);
        let mut retransmit = None;
        let mut limited_transmit = None;

        self.window.dup_acks = self.window.dup_acks.saturating_add(1);
        let dup_acks = self.window.dup_acks;

        if self.in_fast_recovery {
            self.window.inflate();
            trace!(dup_acks, cwnd = self.window.cwnd, "Fast recovery: cwnd inflated");
        } else if dup_acks == self.window.retx_thresh() {
            self.window.enter_fast_recovery(transport.flight_size);
            self.in_fast_recovery = true;
            retransmit = Some(ack);
            debug!(
                %ack,
                ssthresh = self.window.ssthresh,
                cwnd = self.window.cwnd,
                "Fast retransmit: entering fast recovery"
            );
        } else {
            limited_transmit = self.window.limited_transmit(transport);
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
        self.window.collapse(transport.flight_size);
        debug!(ssthresh = self.window.ssthresh, "Retransmission timeout");
        self.window
            .decide(before, false, Some(transport.snd_una), None, true)
    }

    fn fork(&self) -> Box<dyn CongestionControl> {
        Box::new(Reno::with_window(self.window.reset()))
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
        "Reno"
    }
}
