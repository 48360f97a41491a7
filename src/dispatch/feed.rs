//! Feed driver: pumps transport frames into dispatchers.
//!
//! The transport (socket, reconnect, backoff) lives outside this crate and
//! only hands over frames through a channel.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::dispatcher::{EventDispatcher, StreamClosed};
use crate::core::StreamParser;

/// One frame from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Opened,
    Text(String),
    Closed { code: u16, reason: String, remote: bool },
    Error { cause: String, fatal: bool },
}

/// Connection-level callbacks shared by every stream on one socket
pub trait ConnectionSink: Send + Sync {
    fn on_open(&self);
    fn on_message(&self, raw: &str);
    fn on_close(&self, code: u16, reason: &str, remote: bool);
    fn on_error(&self, cause: &str, fatal: bool);
}

impl<P: StreamParser> ConnectionSink for EventDispatcher<P> {
    fn on_open(&self) {
        EventDispatcher::on_open(self)
    }

    fn on_message(&self, raw: &str) {
        EventDispatcher::on_message(self, raw)
    }

    fn on_close(&self, code: u16, reason: &str, remote: bool) {
        EventDispatcher::on_close(self, code, reason, remote)
    }

    fn on_error(&self, cause: &str, fatal: bool) {
        EventDispatcher::on_error(self, cause, fatal)
    }
}

/// Drive `sinks` until the connection ends; returns how it ended.
///
/// Every text frame goes to every sink, in arrival order. A dropped sender
/// counts as an abnormal close.
pub async fn run_feed(
    sinks: Vec<Arc<dyn ConnectionSink>>,
    mut frames: mpsc::Receiver<InboundFrame>,
) -> StreamClosed {
    let mut received: u64 = 0;

    while let Some(frame) = frames.recv().await {
        match frame {
            InboundFrame::Opened => {
                info!("Feed connected ({} streams)", sinks.len());
                sinks.iter().for_each(|s| s.on_open());
            }
            InboundFrame::Text(raw) => {
                received += 1;
                for sink in &sinks {
                    sink.on_message(&raw);
                }
            }
            InboundFrame::Error { cause, fatal } => {
                sinks.iter().for_each(|s| s.on_error(&cause, fatal));
                if fatal {
                    return StreamClosed { code: StreamClosed::ABNORMAL, reason: cause, remote: false };
                }
            }
            InboundFrame::Closed { code, reason, remote } => {
                info!("Feed closed after {} frames: {} {}", received, code, reason);
                sinks.iter().for_each(|s| s.on_close(code, &reason, remote));
                return StreamClosed { code, reason, remote };
            }
        }
    }

    warn!("Transport channel dropped after {} frames", received);
    let reason = "transport dropped".to_string();
    sinks
        .iter()
        .for_each(|s| s.on_close(StreamClosed::ABNORMAL, &reason, false));
    StreamClosed { code: StreamClosed::ABNORMAL, reason, remote: false }
}
