//! Calibration session state machine.
//!
//! [`CalibrationSession::apply`] is the single transition function: it folds
//! one [`CutterEvent`] into the session and returns what the device should do
//! next, if anything. The session never talks to the device itself.

use drawcut_core::{ControllerError, MotionCommand, Position, ProbeTelemetryError};
use tracing::{debug, info, warn};

use crate::event::{CalibrationState, CutterEvent};
use crate::sequences::CalibrationSequences;

/// Action requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Run the homing cycle.
    Home,
    /// Queue the commands and start one stream.
    Stream(Vec<MotionCommand>),
}

#[derive(Debug, Clone)]
pub struct CalibrationSession {
    state: CalibrationState,
    machine: Position,
    work: Position,
    status: Option<String>,
    probe_depth: Option<f64>,
    history: Vec<CalibrationState>,
    failure: Option<ControllerError>,
    sequences: CalibrationSequences,
}

impl CalibrationSession {
    pub fn new(sequences: CalibrationSequences) -> Self {
        Self {
            state: CalibrationState::NotConnected,
            machine: Position::default(),
            work: Position::default(),
            status: None,
            probe_depth: None,
            history: vec![CalibrationState::NotConnected],
            failure: None,
            sequences,
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Last reported machine coordinate.
    pub fn machine(&self) -> Position {
        self.machine
    }

    /// Last reported work coordinate.
    pub fn work(&self) -> Position {
        self.work
    }

    /// Last controller status text, e.g. `Idle`.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Machine Z of the last successful probe.
    pub fn probe_depth(&self) -> Option<f64> {
        self.probe_depth
    }

    /// Every state entered, in order, starting with `NotConnected`.
    pub fn history(&self) -> &[CalibrationState] {
        &self.history
    }

    /// Why the session failed.
    pub fn failure(&self) -> Option<&ControllerError> {
        self.failure.as_ref()
    }

    fn enter(&mut self, next: CalibrationState) {
        info!("Cutter calibration: {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    fn fail(&mut self, error: ControllerError) {
        tracing::error!("Cutter calibration failed in {}: {}", self.state, error);
        self.failure = Some(error);
        self.enter(CalibrationState::Failed);
    }

    /// Machine Z where probe 1 stopped: the probe report, else the last
    /// status report.
    fn first_contact(&self) -> Option<f64> {
        self.probe_depth
            .or_else(|| self.status.as_ref().map(|_| self.machine.z))
    }

    /// Fold one event into the session.
    pub fn apply(&mut self, event: CutterEvent) -> Option<Directive> {
        use CalibrationState::*;

        if self.state == Failed {
            debug!("Ignoring {:?} after failure", event);
            return None;
        }

        match event {
            CutterEvent::ConsoleError { text } => {
                self.fail(ControllerError::ControllerProtocol { line: text });
                None
            }
            CutterEvent::StatusUpdate {
                state,
                machine,
                work,
            } => {
                self.status = Some(state);
                self.machine = machine;
                self.work = work;
                None
            }
            CutterEvent::ProbeResult { z } => {
                debug!("Probe contact at Z{:.3}", z);
                self.probe_depth = Some(z);
                None
            }
            CutterEvent::Banner => {
                if self.state == NotConnected {
                    self.enter(Connected);
                }
                None
            }
            CutterEvent::Unlocked => {
                if self.state == Connected {
                    self.enter(Homing);
                    Some(Directive::Home)
                } else {
                    None
                }
            }
            CutterEvent::CommandCompleted => match self.state {
                NotConnected => {
                    self.enter(Connected);
                    None
                }
                Connected => {
                    self.enter(Homing);
                    Some(Directive::Home)
                }
                Homing => {
                    self.enter(Probing1);
                    Some(Directive::Stream(self.sequences.probe1()))
                }
                _ => None,
            },
            CutterEvent::StreamComplete { success: false } if self.state.is_streaming_stage() => {
                let stage = self.state.to_string();
                self.fail(ControllerError::StreamFailed { stage });
                None
            }
            CutterEvent::StreamComplete { success } => match self.state {
                Probing1 => match self.first_contact() {
                    Some(contact) => {
                        let start_z = contact + self.sequences.params().retract_distance;
                        self.enter(Probing2);
                        Some(Directive::Stream(self.sequences.probe2(start_z)))
                    }
                    None => {
                        self.fail(ProbeTelemetryError::MissingProbeDepth.into());
                        None
                    }
                },
                Probing2 => {
                    self.enter(Probing3);
                    Some(Directive::Stream(self.sequences.probe3()))
                }
                Probing3 => match self.probe_depth {
                    Some(depth) => {
                        self.enter(CoordinateReset);
                        Some(Directive::Stream(self.sequences.coordinate_reset(depth)))
                    }
                    None => {
                        self.fail(ProbeTelemetryError::MissingProbeDepth.into());
                        None
                    }
                },
                CoordinateReset => {
                    self.enter(Ready);
                    None
                }
                other => {
                    if !success {
                        warn!("Stream failed while {}", other);
                    }
                    None
                }
            },
        }
    }
}
