//! Motion device abstraction.
//!
//! The controller drives the machine through [`MotionDevice`] and hears back
//! through an [`EventSink`] handed to the device when it is created.

pub mod grbl;

use async_trait::async_trait;
use drawcut_core::ConnectionError;
use tokio::sync::mpsc;

use crate::controller::ControllerMessage;
use crate::event::CutterEvent;
use crate::telemetry::classify_console_line;

pub use grbl::{GrblConfig, GrblDevice, LineTransport, SerialTransport};

/// A GRBL-style motion controller.
#[async_trait]
pub trait MotionDevice: Send + Sync {
    /// Append a command to the pending stream.
    async fn queue_command(&self, command: &str) -> Result<(), ConnectionError>;

    /// Send every queued command; completion is reported as
    /// [`CutterEvent::StreamComplete`].
    async fn begin_streaming(&self) -> Result<(), ConnectionError>;

    async fn perform_homing_cycle(&self) -> Result<(), ConnectionError>;
}

/// Posts device notifications into the controller inbox.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<ControllerMessage>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<ControllerMessage>) -> Self {
        Self { tx }
    }

    /// Classify a console line and forward the resulting event, if any.
    pub fn console_line(&self, line: &str, verbose: bool) {
        tracing::debug!("console: {}", line.trim_end());
        if let Some(event) = classify_console_line(line, verbose) {
            self.emit(event);
        }
    }

    pub fn emit(&self, event: CutterEvent) {
        if self.tx.send(ControllerMessage::Event(event)).is_err() {
            tracing::warn!("Cutter controller stopped; dropping device event");
        }
    }
}
