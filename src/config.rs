//! 定义了连接和拥塞控制的可配置参数。
//! Defines configurable parameters for connections and congestion control.

use crate::error::{Error, Result};

/// A structure containing all configurable parameters for a connection.
///
/// 包含所有连接可配置参数的结构体。
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Congestion control-related parameters.
    /// 拥塞控制相关参数。
    pub congestion_control: CongestionControlConfig,
}

/// The congestion control algorithm a connection runs.
///
/// 连接所使用的拥塞控制算法。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// RFC 3782 NewReno with partial-ACK handling.
    #[default]
    NewReno,
    /// Classic RFC 5681 Reno.
    Reno,
}

/// Congestion control-related parameters.
///
/// 拥塞控制相关参数。
#[derive(Debug, Clone)]
pub struct CongestionControlConfig {
    /// Which algorithm to build for new connections.
    /// 新连接使用的算法。
    pub algorithm: Algorithm,
    /// The sender maximum segment size in bytes.
    /// 发送端最大报文段长度（字节）。
    pub segment_size: u32,
    /// The initial congestion window size in segments.
    /// 初始拥塞窗口大小（以报文段为单位）。
    pub initial_cwnd_segments: u32,
    /// The initial slow start threshold in bytes.
    /// 初始慢启动阈值（字节）。
    pub initial_ssthresh: u32,
    /// Number of duplicate ACKs that triggers fast retransmit.
    /// 触发快速重传的重复ACK数量。
    pub retx_thresh: u32,
    /// Enable RFC 3042 Limited Transmit.
    /// 启用 RFC 3042 有限传输。
    pub limited_transmit: bool,
}

impl CongestionControlConfig {
    /// The initial congestion window in bytes.
    pub fn initial_cwnd(&self) -> u32 {
        self.initial_cwnd_segments.saturating_mul(self.segment_size)
    }

    /// The smallest slow start threshold a controller may ever set.
    pub fn min_ssthresh(&self) -> u32 {
        self.segment_size.saturating_mul(2)
    }

    /// Checks the congestion control parameters.
    pub fn validate(&self) -> Result<()> {
        if self.segment_size == 0 {
            return Err(Error::InvalidConfig("segment_size must be non-zero"));
        }
        if self.initial_cwnd_segments == 0 {
            return Err(Error::InvalidConfig("initial_cwnd_segments must be non-zero"));
        }
        if self.retx_thresh == 0 {
            return Err(Error::InvalidConfig("retx_thresh must be non-zero"));
        }
        if self.initial_ssthresh < self.min_ssthresh() {
            return Err(Error::InvalidConfig(
                "initial_ssthresh must be at least two segments",
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Checks that the configuration can drive a controller.
    ///
    /// 检查配置是否有效。
    pub fn validate(&self) -> Result<()> {
        self.congestion_control.validate()
    }
}

impl Default for CongestionControlConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::NewReno,
            segment_size: 1448,
            initial_cwnd_segments: 10,
            initial_ssthresh: 65535,
            retx_thresh: 3,
            limited_transmit: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.congestion_control.initial_cwnd(), 14480);
        assert_eq!(config.congestion_control.min_ssthresh(), 2896);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let mut cc = CongestionControlConfig {
            segment_size: 0,
            ..Default::default()
        };
        assert!(matches!(cc.validate(), Err(Error::InvalidConfig(_))));

        cc.segment_size = 1448;
        cc.retx_thresh = 0;
        assert!(matches!(cc.validate(), Err(Error::InvalidConfig(_))));

        cc.retx_thresh = 3;
        cc.initial_cwnd_segments = 0;
        assert!(matches!(cc.validate(), Err(Error::InvalidConfig(_))));

        cc.initial_cwnd_segments = 10;
        cc.initial_ssthresh = 2895;
        assert!(matches!(cc.validate(), Err(Error::InvalidConfig(_))));

        cc.initial_ssthresh = 2896;
        assert!(cc.validate().is_ok());
    }
}
