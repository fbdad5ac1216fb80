//! Congestion window observers.
//!
//! Observers are registered on a connection's send state at setup time and
//! are called every time the congestion window changes.
//!
//! 拥塞窗口观察者。

use crate::congestion::CongestionState;
use std::io::Write;
use std::time::Duration;
use tracing::warn;

/// A single congestion window change.
///
/// 一次拥塞窗口变化。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowChange {
    /// Time since the connection was created.
    pub elapsed: Duration,
    pub old_cwnd: u32,
    pub new_cwnd: u32,
    pub ssthresh: u32,
    pub state: CongestionState,
}

/// Receives congestion window changes.
pub trait WindowObserver: Send + 'static {
    fn on_window_change(&mut self, change: &WindowChange);
}

impl<F> WindowObserver for F
where
    F: FnMut(&WindowChange) + Send + 'static,
{
    fn on_window_change(&mut self, change: &WindowChange) {
        self(change)
    }
}

/// Writes one `<seconds>\t<cwnd>` line per change.
///
/// 每次变化写入一行 `<秒>\t<cwnd>`。
#[derive(Debug)]
pub struct TraceWriter<W> {
    out: W,
    failed: bool,
}

impl<W: Write> TraceWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, failed: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send + 'static> WindowObserver for TraceWriter<W> {
    fn on_window_change(&mut self, change: &WindowChange) {
        if self.failed {
            return;
        }
        let result = writeln!(
            self.out,
            "{}\t{}",
            change.elapsed.as_secs_f64(),
            change.new_cwnd
        );
        if let Err(e) = result {
            // Tracing must never disturb the connection; stop after the first failure.
            warn!(error = %e, "cwnd trace write failed, disabling trace");
            self.failed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn change(ms: u64, new_cwnd: u32) -> WindowChange {
        WindowChange {
            elapsed: Duration::from_millis(ms),
            old_cwnd: 14480,
            new_cwnd,
            ssthresh: 65535,
            state: CongestionState::SlowStart,
        }
    }

    #[test]
    fn test_trace_writer_format() {
        let mut writer = TraceWriter::new(Vec::new());
        writer.on_window_change(&change(1500, 15928));
        writer.on_window_change(&change(2000, 17376));
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(text, "1.5\t15928\n2\t17376\n");
    }

    struct Broken {
        attempts: usize,
    }

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            self.attempts += 1;
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_trace_writer_stops_after_failure() {
        let mut writer = TraceWriter::new(Broken { attempts: 0 });
        writer.on_window_change(&change(0, 1));
        writer.on_window_change(&change(1, 2));
        assert_eq!(writer.into_inner().attempts, 1);
    }

    #[test]
    fn test_closure_observer() {
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut observer: Box<dyn WindowObserver> =
            Box::new(move |c: &WindowChange| sink.lock().unwrap().push(c.new_cwnd));
        observer.on_window_change(&change(0, 7));
        assert_eq!(*seen.lock().unwrap(), vec![7]);
    }
}
