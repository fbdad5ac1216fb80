//! The per-connection congestion control actor.
//!
//! Every event for one connection goes through a single task, so controller
//! operations are serialized without any lock shared between connections.
//!
//! 每个连接一个 actor：同一连接的所有事件都在同一任务中串行处理。

use crate::{
    congestion::{CongestionDecision, CongestionState},
    error::{Error, Result},
    sender::SendState,
    seq::SeqNum,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

const COMMAND_CHANNEL_CAPACITY: usize = 128;
const SIGNAL_CHANNEL_CAPACITY: usize = 128;

/// Out-of-band requests from the controller to the transport.
///
/// The receiver returned by [`Connection::spawn`] must be drained, otherwise
/// the actor stalls once the channel is full.
///
/// 控制器发给传输层的带外信号。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Retransmit the segment starting at this sequence number now.
    Retransmit(SeqNum),
    /// Up to this many bytes of new data may be sent beyond the window.
    LimitedTransmit(u32),
    /// Back off the retransmission timer.
    BackoffTimer,
}

/// A read-only view of a connection's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub cwnd: u32,
    pub ssthresh: u32,
    pub state: CongestionState,
    pub snd_una: SeqNum,
    pub snd_nxt: SeqNum,
    pub flight_size: u32,
    pub sendable: u32,
}

/// Commands sent to the connection actor.
///
/// 发送到连接 actor 的命令。
#[derive(Debug)]
pub(crate) enum ConnectionCommand {
    Sent {
        bytes: u32,
        response_tx: oneshot::Sender<Result<()>>,
    },
    Ack {
        ack: SeqNum,
        receiver_window: u32,
        response_tx: oneshot::Sender<Result<Option<CongestionDecision>>>,
    },
    RetransmitTimeout {
        response_tx: oneshot::Sender<CongestionDecision>,
    },
    Snapshot {
        response_tx: oneshot::Sender<WindowSnapshot>,
    },
    Fork {
        id: u32,
        iss: SeqNum,
        receiver_window: u32,
        response_tx: oneshot::Sender<(ConnectionHandle, mpsc::Receiver<Signal>)>,
    },
}

/// The actor owning one connection's send state.
pub struct Connection {
    id: u32,
    state: SendState,
    command_rx: mpsc::Receiver<ConnectionCommand>,
    signal_tx: mpsc::Sender<Signal>,
}

impl Connection {
    /// Spawns the actor task and returns its handle and signal stream.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// 启动 actor 任务，返回句柄和信号接收端。
    pub fn spawn(id: u32, state: SendState) -> (ConnectionHandle, mpsc::Receiver<Signal>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_CHANNEL_CAPACITY);

        let mut actor = Connection {
            id,
            state,
            command_rx,
            signal_tx,
        };
        info!(cid = id, algorithm = actor.state.algorithm_name(), "Spawning connection actor");
        tokio::spawn(async move {
            actor.run().await;
        });

        (ConnectionHandle { id, command_tx }, signal_rx)
    }

    async fn run(&mut self) {
        while let Some(command) = self.command_rx.recv().await {
            self.handle_command(command).await;
        }
        info!(cid = self.id, "All handles dropped, connection actor stopped");
    }

    async fn handle_command(&mut self, command: ConnectionCommand) {
        match command {
            ConnectionCommand::Sent { bytes, response_tx } => {
                let _ = response_tx.send(self.state.on_sent(bytes));
            }
            ConnectionCommand::Ack {
                ack,
                receiver_window,
                response_tx,
            } => {
                let result = self.state.on_ack(ack, receiver_window);
                if let Ok(Some(decision)) = &result {
                    publish(&self.signal_tx, self.id, decision).await;
                }
                let _ = response_tx.send(result);
            }
            ConnectionCommand::RetransmitTimeout { response_tx } => {
                let decision = self.state.on_retransmit_timeout();
                publish(&self.signal_tx, self.id, &decision).await;
                let _ = response_tx.send(decision);
            }
            ConnectionCommand::Snapshot { response_tx } => {
                let _ = response_tx.send(self.snapshot());
            }
            ConnectionCommand::Fork {
                id,
                iss,
                receiver_window,
                response_tx,
            } => {
                debug!(parent = self.id, child = id, "Forking connection");
                let child = self.state.fork(iss, receiver_window);
                let _ = response_tx.send(Connection::spawn(id, child));
            }
        }
    }

    fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            cwnd: self.state.congestion_window(),
            ssthresh: self.state.slow_start_threshold(),
            state: self.state.state(),
            snd_una: self.state.snd_una(),
            snd_nxt: self.state.snd_nxt(),
            flight_size: self.state.flight_size(),
            sendable: self.state.sendable(),
        }
    }
}

/// Turns a decision into transport signals.
///
/// Borrows only the channel: `SendState` is `Send` but not `Sync`.
async fn publish(signal_tx: &mpsc::Sender<Signal>, id: u32, decision: &CongestionDecision) {
    let signals = decision
        .retransmit
        .map(Signal::Retransmit)
        .into_iter()
        .chain(decision.limited_transmit.map(Signal::LimitedTransmit))
        .chain(decision.backoff_rto.then_some(Signal::BackoffTimer));

    for signal in signals {
        if signal_tx.send(signal).await.is_err() {
            debug!(cid = id, ?signal, "Signal receiver dropped");
            return;
        }
    }
}

/// A cloneable handle to a connection actor.
///
/// 连接 actor 的句柄。
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: u32,
    command_tx: mpsc::Sender<ConnectionCommand>,
}

impl ConnectionHandle {
    pub fn id(&self) -> u32 {
        self.id
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> ConnectionCommand,
    ) -> Result<T> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(make(response_tx))
            .await
            .map_err(|_| Error::ChannelClosed)?;
        response_rx.await.map_err(|_| Error::ChannelClosed)
    }

    /// Reports `bytes` of newly transmitted data.
    pub async fn sent(&self, bytes: u32) -> Result<()> {
        self.request(|response_tx| ConnectionCommand::Sent { bytes, response_tx })
            .await?
    }

    /// Reports an incoming acknowledgment.
    pub async fn ack(&self, ack: SeqNum, receiver_window: u32) -> Result<Option<CongestionDecision>> {
        self.request(|response_tx| ConnectionCommand::Ack {
            ack,
            receiver_window,
            response_tx,
        })
        .await?
    }

    /// Reports that the retransmission timer fired.
    pub async fn retransmit_timeout(&self) -> Result<CongestionDecision> {
        self.request(|response_tx| ConnectionCommand::RetransmitTimeout { response_tx })
            .await
    }

    pub async fn snapshot(&self) -> Result<WindowSnapshot> {
        self.request(|response_tx| ConnectionCommand::Snapshot { response_tx })
            .await
    }

    /// Spawns a child connection with a forked controller.
    pub async fn fork(
        &self,
        id: u32,
        iss: SeqNum,
        receiver_window: u32,
    ) -> Result<(ConnectionHandle, mpsc::Receiver<Signal>)> {
        self.request(|response_tx| ConnectionCommand::Fork {
            id,
            iss,
            receiver_window,
            response_tx,
        })
        .await
    }
}
