//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use crate::seq::SeqNum;
use thiserror::Error;

/// The primary error type for the congestion control library.
/// 拥塞控制库的主要错误类型。
///
/// The controllers themselves never fail. Every variant here is either a bad
/// configuration or a transport-side precondition violation caught before it
/// could corrupt the window.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The configuration cannot drive a controller.
    /// 配置无效。
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// An acknowledgment older than the current cumulative ACK point.
    /// 确认号早于当前的累计确认点。
    #[error("stale ACK {ack}, cumulative ACK point is {snd_una}")]
    StaleAck { ack: SeqNum, snd_una: SeqNum },

    /// An acknowledgment for data that was never sent.
    /// 确认了从未发送过的数据。
    #[error("ACK {ack} is beyond the highest sequence sent {snd_nxt}")]
    AckBeyondSent { ack: SeqNum, snd_nxt: SeqNum },

    /// The transport tried to send more than the window allows.
    /// 传输层发送的数据超过了窗口允许的范围。
    #[error("attempted to send {requested} bytes, only {sendable} permitted")]
    SendBeyondWindow { requested: u32, sendable: u32 },

    /// The connection actor has stopped.
    /// 连接 actor 已停止。
    #[error("Internal channel is broken")]
    ChannelClosed,
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        use std::io::ErrorKind;
        let kind = match err {
            Error::InvalidConfig(_) => ErrorKind::InvalidInput,
            Error::StaleAck { .. } | Error::AckBeyondSent { .. } => ErrorKind::InvalidData,
            Error::SendBeyondWindow { .. } => ErrorKind::WouldBlock,
            Error::ChannelClosed => ErrorKind::BrokenPipe,
        };
        std::io::Error::new(kind, err)
    }
}
