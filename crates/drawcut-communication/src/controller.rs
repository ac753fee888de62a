//! Cutter Controller
//!
//! One tokio task owns the [`CalibrationSession`] and the motion device. It
//! drains a single inbox in arrival order: device events are folded into the
//! session and the resulting directives are carried out before the next
//! message is looked at. The current state is published on a watch channel.

use std::sync::Arc;

use drawcut_core::{ControllerError, MotionCommand};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::device::{EventSink, MotionDevice};
use crate::event::{CalibrationState, CutterEvent};
use crate::sequences::CalibrationSequences;
use crate::session::{CalibrationSession, Directive};

/// Everything the controller task reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerMessage {
    Event(CutterEvent),
    /// Stream a program once calibration is complete.
    SendProgram(Vec<String>),
    Shutdown,
}

/// Receiving end of the controller inbox, consumed by
/// [`CutterController::spawn`].
pub struct ControllerInbox {
    tx: mpsc::UnboundedSender<ControllerMessage>,
    rx: mpsc::UnboundedReceiver<ControllerMessage>,
}

impl ControllerInbox {
    /// Raw receiver, for driving the device without a controller task.
    pub fn into_receiver(self) -> mpsc::UnboundedReceiver<ControllerMessage> {
        self.rx
    }
}

/// Create the controller inbox and a sink for the device to post into.
pub fn controller_channel() -> (EventSink, ControllerInbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink::new(tx.clone()), ControllerInbox { tx, rx })
}

/// Queue every command, then start exactly one stream.
///
/// Device failures are logged and swallowed.
pub async fn send_sequence(device: &dyn MotionDevice, commands: &[String]) {
    for command in commands {
        if let Err(e) = device.queue_command(command).await {
            error!("Failed to queue '{}': {}", command, e);
            return;
        }
    }
    if let Err(e) = device.begin_streaming().await {
        error!("Failed to start streaming: {}", e);
    }
}

pub struct CutterController;

impl CutterController {
    /// Start the controller task.
    pub fn spawn(
        device: Arc<dyn MotionDevice>,
        sequences: CalibrationSequences,
        inbox: ControllerInbox,
    ) -> CutterHandle {
        let ControllerInbox { tx, mut rx } = inbox;
        let (state_tx, state_rx) = watch::channel(CalibrationState::NotConnected);

        let task = tokio::spawn(async move {
            let mut session = CalibrationSession::new(sequences);

            while let Some(message) = rx.recv().await {
                match message {
                    ControllerMessage::Event(event) => {
                        if let Some(directive) = session.apply(event) {
                            execute(device.as_ref(), directive).await;
                        }
                        state_tx.send_if_modified(|current| {
                            let changed = *current != session.state();
                            *current = session.state();
                            changed
                        });
                    }
                    ControllerMessage::SendProgram(lines) => {
                        if session.state() == CalibrationState::Ready {
                            info!("Streaming program of {} lines", lines.len());
                            send_sequence(device.as_ref(), &lines).await;
                        } else {
                            warn!(
                                "Cutter is {}; refusing to stream {} lines",
                                session.state(),
                                lines.len()
                            );
                        }
                    }
                    ControllerMessage::Shutdown => break,
                }
            }

            info!("Cutter controller stopped in state {}", session.state());
            session
        });

        CutterHandle {
            tx,
            state: state_rx,
            task,
        }
    }
}

async fn execute(device: &dyn MotionDevice, directive: Directive) {
    match directive {
        Directive::Home => {
            if let Err(e) = device.perform_homing_cycle().await {
                error!("Failed to start homing cycle: {}", e);
            }
        }
        Directive::Stream(commands) => {
            let lines: Vec<String> = commands.iter().map(MotionCommand::to_line).collect();
            send_sequence(device, &lines).await;
        }
    }
}

/// Handle to a running controller task.
pub struct CutterHandle {
    tx: mpsc::UnboundedSender<ControllerMessage>,
    state: watch::Receiver<CalibrationState>,
    task: JoinHandle<CalibrationSession>,
}

impl CutterHandle {
    pub fn state(&self) -> CalibrationState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<CalibrationState> {
        self.state.clone()
    }

    /// Another sink into the same inbox.
    pub fn sink(&self) -> EventSink {
        EventSink::new(self.tx.clone())
    }

    pub fn is_ready(&self) -> bool {
        self.state() == CalibrationState::Ready
    }

    pub fn send_program(&self, lines: Vec<String>) -> Result<(), ControllerError> {
        self.tx
            .send(ControllerMessage::SendProgram(lines))
            .map_err(|_| ControllerError::NotRunning)
    }

    /// Wait for calibration to end in `Ready` or `Failed`.
    pub async fn wait_until_settled(&self) -> CalibrationState {
        let mut rx = self.state.clone();
        let settled = rx.wait_for(|state| state.is_settled()).await.map(|s| *s);
        match settled {
            Ok(state) => state,
            Err(_) => *rx.borrow(),
        }
    }

    /// Stop the task once the messages already queued are handled.
    pub async fn shutdown(self) -> Result<CalibrationSession, ControllerError> {
        let _ = self.tx.send(ControllerMessage::Shutdown);
        self.task.await.map_err(|e| ControllerError::Device {
            message: e.to_string(),
        })
    }
}
