//! Window arithmetic shared by the loss-based controllers.

use super::{CongestionDecision, CongestionState, TransportSnapshot};
use crate::config::CongestionControlConfig;
use crate::error::Result;
use crate::seq::SeqNum;
use tracing::trace;

/// cwnd, ssthresh and the duplicate ACK counter, plus the static
/// configuration they are derived from.
#[derive(Debug, Clone)]
pub(super) struct Window {
    pub(super) cwnd: u32,
    pub(super) ssthresh: u32,
    pub(super) dup_acks: u32,
    config: CongestionControlConfig,
}

/// Values captured before an event so the decision can report what changed.
#[derive(Debug, Clone, Copy)]
pub(super) struct Before {
    cwnd: u32,
    ssthresh: u32,
    state: CongestionState,
}

impl Window {
    pub(super) fn new(config: CongestionControlConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::initial(config))
    }

    /// A window at its initial values for the same, already validated,
    /// configuration.
    pub(super) fn reset(&self) -> Self {
        Self::initial(self.config.clone())
    }

    fn initial(config: CongestionControlConfig) -> Self {
        Self {
            cwnd: config.initial_cwnd(),
            ssthresh: config.initial_ssthresh,
            dup_acks: 0,
            config,
        }
    }

    pub(super) fn segment_size(&self) -> u32 {
        self.config.segment_size
    }

    pub(super) fn retx_thresh(&self) -> u32 {
        self.config.retx_thresh
    }

    /// Slow start or congestion avoidance growth for one new ACK.
    pub(super) fn grow(&mut self) {
        let mss = self.segment_size();
        if self.cwnd < self.ssthresh {
            self.cwnd = self.cwnd.saturating_add(mss);
            trace!(cwnd = self.cwnd, ssthresh = self.ssthresh, "Slow start: cwnd increased");
        } else {
            // mss^2 / cwnd, never less than one byte.
            let adder = (u64::from(mss) * u64::from(mss) / u64::from(self.cwnd)).max(1);
            self.cwnd = self.cwnd.saturating_add(adder as u32);
            trace!(
                cwnd = self.cwnd,
                adder,
                "Congestion avoidance: cwnd increased"
            );
        }
    }

    /// `max(flight_size / 2, 2 * mss)`.
    pub(super) fn reduced_ssthresh(&self, flight_size: u32) -> u32 {
        (flight_size / 2).max(self.config.min_ssthresh())
    }

    /// Sets ssthresh from the flight size and inflates cwnd by the segments
    /// that left the network.
    pub(super) fn enter_fast_recovery(&mut self, flight_size: u32) {
        self.ssthresh = self.reduced_ssthresh(flight_size);
        let inflation = self.retx_thresh().saturating_mul(self.segment_size());
        self.cwnd = self.ssthresh.saturating_add(inflation);
    }

    /// One extra segment per duplicate ACK beyond the threshold.
    pub(super) fn inflate(&mut self) {
        self.cwnd = self.cwnd.saturating_add(self.segment_size());
    }

    /// Back to one segment of slow start after a timeout.
    pub(super) fn collapse(&mut self, flight_size: u32) {
        self.ssthresh = self.reduced_ssthresh(flight_size);
        self.cwnd = self.segment_size();
        self.dup_acks = 0;
    }

    /// RFC 3042: one new segment on each of the first two duplicate ACKs,
    /// provided the receiver window and cwnd + 2*mss still cover it.
    pub(super) fn limited_transmit(&self, transport: &TransportSnapshot) -> Option<u32> {
        if !self.config.limited_transmit
            || self.dup_acks == 0
            || self.dup_acks > 2
            || self.dup_acks >= self.retx_thresh()
        {
            return None;
        }
        let mss = self.segment_size();
        let limit = transport
            .receiver_window
            .min(self.cwnd.saturating_add(mss.saturating_mul(2)));
        if transport.flight_size.saturating_add(mss) <= limit {
            Some(mss)
        } else {
            None
        }
    }

    pub(super) fn phase(&self, in_fast_recovery: bool) -> CongestionState {
        if in_fast_recovery {
            CongestionState::FastRecovery
        } else if self.cwnd < self.ssthresh {
            CongestionState::SlowStart
        } else {
            CongestionState::CongestionAvoidance
        }
    }

    pub(super) fn before(&self, in_fast_recovery: bool) -> Before {
        Before {
            cwnd: self.cwnd,
            ssthresh: self.ssthresh,
            state: self.phase(in_fast_recovery),
        }
    }

    pub(super) fn decide(
        &self,
        before: Before,
        in_fast_recovery: bool,
        retransmit: Option<SeqNum>,
        limited_transmit: Option<u32>,
        backoff_rto: bool,
    ) -> CongestionDecision {
        debug_assert!(self.cwnd >= self.segment_size());
        let state = self.phase(in_fast_recovery);
        CongestionDecision {
            cwnd: self.cwnd,
            ssthresh: self.ssthresh,
            state,
            retransmit,
            limited_transmit,
            backoff_rto,
            significant_change: before.cwnd != self.cwnd
                || before.ssthresh != self.ssthresh
                || before.state != state,
        }
    }
}
