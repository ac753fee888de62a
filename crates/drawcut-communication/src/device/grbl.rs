//! GRBL Serial Device
//!
//! Runs the GRBL IO loop on its own tokio task. Commands are sent one at a
//! time and each `ok` or `error:` acknowledges the command in flight. The
//! loop polls `?` for status reports and forwards every other console line
//! to the [`EventSink`] for classification.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use drawcut_core::ConnectionError;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{EventSink, MotionDevice};
use crate::event::CutterEvent;
use crate::telemetry::CONNECTED_BANNER;

/// Byte-level access to the controller port.
pub trait LineTransport: Send {
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Real-time command byte, e.g. `?`.
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;

    /// Whatever bytes are available; `Ok(0)` when there are none.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Serial port connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrblConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Interval between `?` status queries.
    pub poll_interval_ms: u64,
}

impl Default for GrblConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: 115_200,
            poll_interval_ms: 200,
        }
    }
}

/// [`LineTransport`] over a `serialport` handle.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    pub fn open(config: &GrblConfig) -> Result<Self, ConnectionError> {
        if config.port.is_empty() {
            return Err(ConnectionError::NoPortConfigured);
        }
        // Short timeout keeps reads from stalling the IO loop.
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(Duration::from_millis(10))
            .open()
            .map_err(|e| {
                tracing::warn!("Failed to open serial port {}: {}", config.port, e);
                ConnectionError::FailedToOpen {
                    port: config.port.clone(),
                    reason: e.to_string(),
                }
            })?;
        Ok(Self { port })
    }
}

impl LineTransport for SerialTransport {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\n")?;
        self.port.flush()
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.port.write_all(&[byte])
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug)]
enum DeviceRequest {
    Queue(String),
    BeginStream,
    Home,
}

/// GRBL controller on a serial line.
pub struct GrblDevice {
    requests: mpsc::UnboundedSender<DeviceRequest>,
    io_task: JoinHandle<()>,
}

impl GrblDevice {
    /// Open the configured serial port and start the IO loop.
    pub fn open(config: &GrblConfig, sink: EventSink) -> Result<Self, ConnectionError> {
        let transport = SerialTransport::open(config)?;
        let banner = format!("{}{} @ {} baud", CONNECTED_BANNER, config.port, config.baud_rate);
        Ok(Self::with_transport(
            Box::new(transport),
            &banner,
            Duration::from_millis(config.poll_interval_ms),
            sink,
        ))
    }

    /// Run the IO loop over any transport, announcing `banner` first.
    pub fn with_transport(
        transport: Box<dyn LineTransport>,
        banner: &str,
        poll_interval: Duration,
        sink: EventSink,
    ) -> Self {
        tracing::info!("{}", banner.trim_start_matches('*').trim());
        sink.console_line(banner, false);

        let (requests, rx) = mpsc::unbounded_channel();
        let io_task = tokio::spawn(io_loop(transport, rx, sink, poll_interval));
        Self { requests, io_task }
    }

    fn request(&self, request: DeviceRequest) -> Result<(), ConnectionError> {
        self.requests
            .send(request)
            .map_err(|_| ConnectionError::ConnectionLost {
                reason: "GRBL IO loop has stopped".to_string(),
            })
    }

    /// Stop the IO loop.
    pub fn shutdown(&self) {
        self.io_task.abort();
    }
}

impl Drop for GrblDevice {
    fn drop(&mut self) {
        self.io_task.abort();
    }
}

#[async_trait]
impl MotionDevice for GrblDevice {
    async fn queue_command(&self, command: &str) -> Result<(), ConnectionError> {
        self.request(DeviceRequest::Queue(command.to_string()))
    }

    async fn begin_streaming(&self) -> Result<(), ConnectionError> {
        self.request(DeviceRequest::BeginStream)
    }

    async fn perform_homing_cycle(&self) -> Result<(), ConnectionError> {
        self.request(DeviceRequest::Home)
    }
}

/// Send/acknowledge bookkeeping of the IO loop.
#[derive(Debug, Default)]
struct StreamState {
    /// Queued but not yet part of a stream.
    queued: Vec<String>,
    /// Waiting to be written.
    outgoing: VecDeque<String>,
    in_flight: Option<String>,
    streaming: bool,
    stream_ok: bool,
}

impl StreamState {
    fn begin(&mut self) {
        self.outgoing.extend(self.queued.drain(..));
        self.streaming = true;
        self.stream_ok = true;
    }

    /// Drop everything not yet sent; a running stream completes as failed.
    fn abort(&mut self) {
        let dropped = self.outgoing.len() + self.queued.len();
        if dropped > 0 {
            tracing::warn!("Dropping {} unsent commands after error", dropped);
        }
        self.outgoing.clear();
        self.queued.clear();
        self.in_flight = None;
        self.stream_ok = false;
    }

    /// Completion of the running stream, once nothing is left to send.
    fn take_completion(&mut self) -> Option<bool> {
        if self.streaming && self.outgoing.is_empty() && self.in_flight.is_none() {
            self.streaming = false;
            Some(self.stream_ok)
        } else {
            None
        }
    }
}

async fn io_loop(
    mut transport: Box<dyn LineTransport>,
    mut requests: mpsc::UnboundedReceiver<DeviceRequest>,
    sink: EventSink,
    poll_interval: Duration,
) {
    let loop_delay = Duration::from_millis(10);
    let mut pending: Vec<u8> = Vec::new();
    let mut read_buf = [0u8; 256];
    let mut stream = StreamState::default();
    let mut last_poll = Instant::now();

    loop {
        // 1. Requests from the controller
        loop {
            match requests.try_recv() {
                Ok(DeviceRequest::Queue(command)) => stream.queued.push(command),
                Ok(DeviceRequest::BeginStream) => stream.begin(),
                Ok(DeviceRequest::Home) => stream.outgoing.push_back("$H".to_string()),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    tracing::debug!("GRBL device dropped; stopping IO loop");
                    return;
                }
            }
        }

        // 2. Read and reassemble lines
        match transport.read_available(&mut read_buf) {
            Ok(0) => {}
            Ok(n) => {
                pending.extend_from_slice(&read_buf[..n]);
                while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                    let raw: Vec<u8> = pending.drain(..=pos).collect();
                    let text = String::from_utf8_lossy(&raw);
                    let line = text.trim();
                    if line.is_empty() {
                        continue;
                    }

                    if line == "ok" {
                        stream.in_flight = None;
                        sink.emit(CutterEvent::CommandCompleted);
                    } else if line.starts_with("error:") {
                        if let Some(command) = stream.in_flight.take() {
                            tracing::error!("GRBL rejected '{}': {}", command, line);
                        }
                        stream.abort();
                        sink.console_line(line, false);
                    } else {
                        sink.console_line(line, false);
                    }
                }
            }
            Err(e) => {
                tracing::error!("GRBL read failed: {}", e);
                sink.emit(CutterEvent::ConsoleError {
                    text: format!("serial error: {}", e),
                });
                return;
            }
        }

        if let Some(success) = stream.take_completion() {
            sink.emit(CutterEvent::StreamComplete { success });
        }

        // 3. One command in flight at a time
        if stream.in_flight.is_none() {
            if let Some(command) = stream.outgoing.pop_front() {
                match transport.write_line(&command) {
                    Ok(()) => {
                        tracing::debug!("GRBL <- {}", command);
                        stream.in_flight = Some(command);
                    }
                    Err(e) => {
                        tracing::error!("GRBL write failed: {}", e);
                        stream.outgoing.push_front(command);
                    }
                }
            }
        }

        // 4. Status poll
        if last_poll.elapsed() >= poll_interval {
            if let Err(e) = transport.write_byte(b'?') {
                tracing::warn!("GRBL status poll failed: {}", e);
            }
            last_poll = Instant::now();
        }

        tokio::time::sleep(loop_delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{controller_channel, ControllerMessage};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Replies `ok` to every line and records what was written.
    #[derive(Clone, Default)]
    struct EchoOk {
        written: Arc<Mutex<Vec<String>>>,
        pending: Arc<Mutex<Vec<u8>>>,
        fail_on: Option<String>,
    }

    impl LineTransport for EchoOk {
        fn write_line(&mut self, line: &str) -> io::Result<()> {
            self.written.lock().push(line.to_string());
            let reply = if self.fail_on.as_deref() == Some(line) {
                "error:20\r\n"
            } else {
                "ok\r\n"
            };
            self.pending.lock().extend_from_slice(reply.as_bytes());
            Ok(())
        }

        fn write_byte(&mut self, _byte: u8) -> io::Result<()> {
            self.pending
                .lock()
                .extend_from_slice(b"<Idle|MPos:0.000,0.000,-1.000|WPos:0.000,0.000,0.000>\r\n");
            Ok(())
        }

        fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut pending = self.pending.lock();
            let n = pending.len().min(buf.len());
            buf[..n].copy_from_slice(&pending[..n]);
            pending.drain(..n);
            Ok(n)
        }
    }

    async fn next_event(
        inbox: &mut mpsc::UnboundedReceiver<ControllerMessage>,
    ) -> Option<CutterEvent> {
        loop {
            let message = tokio::time::timeout(Duration::from_secs(2), inbox.recv())
                .await
                .ok()??;
            match message {
                ControllerMessage::Event(CutterEvent::StatusUpdate { .. }) => continue,
                ControllerMessage::Event(event) => return Some(event),
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn test_stream_acknowledged_in_order() {
        let (sink, inbox) = controller_channel();
        let mut rx = inbox.into_receiver();
        let transport = EchoOk::default();
        let written = transport.written.clone();

        let device = GrblDevice::with_transport(
            Box::new(transport),
            "**** Connected to test @ 115200 baud",
            Duration::from_millis(50),
            sink,
        );
        assert_eq!(next_event(&mut rx).await, Some(CutterEvent::Banner));

        device.queue_command("G0 Z-5").await.unwrap();
        device.queue_command("G0 X-5").await.unwrap();
        device.begin_streaming().await.unwrap();

        assert_eq!(next_event(&mut rx).await, Some(CutterEvent::CommandCompleted));
        assert_eq!(next_event(&mut rx).await, Some(CutterEvent::CommandCompleted));
        assert_eq!(
            next_event(&mut rx).await,
            Some(CutterEvent::StreamComplete { success: true })
        );
        assert_eq!(*written.lock(), vec!["G0 Z-5", "G0 X-5"]);
    }

    #[tokio::test]
    async fn test_empty_stream_completes() {
        let (sink, inbox) = controller_channel();
        let mut rx = inbox.into_receiver();
        let device = GrblDevice::with_transport(
            Box::new(EchoOk::default()),
            "**** Connected to test @ 115200 baud",
            Duration::from_millis(50),
            sink,
        );
        assert_eq!(next_event(&mut rx).await, Some(CutterEvent::Banner));

        device.begin_streaming().await.unwrap();
        assert_eq!(
            next_event(&mut rx).await,
            Some(CutterEvent::StreamComplete { success: true })
        );
    }

    #[tokio::test]
    async fn test_error_reply_fails_stream() {
        let (sink, inbox) = controller_channel();
        let mut rx = inbox.into_receiver();
        let transport = EchoOk {
            fail_on: Some("G38.2 Z-105.000 F800.0".to_string()),
            ..EchoOk::default()
        };
        let device = GrblDevice::with_transport(
            Box::new(transport),
            "**** Connected to test @ 115200 baud",
            Duration::from_millis(50),
            sink,
        );
        assert_eq!(next_event(&mut rx).await, Some(CutterEvent::Banner));

        device.queue_command("G38.2 Z-105.000 F800.0").await.unwrap();
        device.begin_streaming().await.unwrap();
        assert_eq!(
            next_event(&mut rx).await,
            Some(CutterEvent::ConsoleError {
                text: "error:20".to_string()
            })
        );
        assert_eq!(
            next_event(&mut rx).await,
            Some(CutterEvent::StreamComplete { success: false })
        );
    }

    #[tokio::test]
    async fn test_error_reply_drops_rest_of_stream() {
        let (sink, inbox) = controller_channel();
        let mut rx = inbox.into_receiver();
        let transport = EchoOk {
            fail_on: Some("G0 X-2.500 Z-5.000".to_string()),
            ..EchoOk::default()
        };
        let written = transport.written.clone();
        let device = GrblDevice::with_transport(
            Box::new(transport),
            "**** Connected to test @ 115200 baud",
            Duration::from_millis(50),
            sink,
        );
        assert_eq!(next_event(&mut rx).await, Some(CutterEvent::Banner));

        for line in ["G0 X-2.500 Z-5.000", "G0 Z-35.000", "G38.2 Z-105.000 F800.0"] {
            device.queue_command(line).await.unwrap();
        }
        device.begin_streaming().await.unwrap();

        assert_eq!(
            next_event(&mut rx).await,
            Some(CutterEvent::ConsoleError {
                text: "error:20".to_string()
            })
        );
        assert_eq!(
            next_event(&mut rx).await,
            Some(CutterEvent::StreamComplete { success: false })
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*written.lock(), vec!["G0 X-2.500 Z-5.000"]);

        // The next stream starts clean.
        device.queue_command("G0 Z-5").await.unwrap();
        device.begin_streaming().await.unwrap();
        assert_eq!(next_event(&mut rx).await, Some(CutterEvent::CommandCompleted));
        assert_eq!(
            next_event(&mut rx).await,
            Some(CutterEvent::StreamComplete { success: true })
        );
    }

    /// Hands out one scripted chunk per read.
    struct Chunked {
        chunks: VecDeque<Vec<u8>>,
    }

    impl LineTransport for Chunked {
        fn write_line(&mut self, _line: &str) -> io::Result<()> {
            Ok(())
        }

        fn write_byte(&mut self, _byte: u8) -> io::Result<()> {
            Ok(())
        }

        fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.chunks.pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => Ok(0),
            }
        }
    }

    #[tokio::test]
    async fn test_multibyte_character_split_across_reads() {
        let (sink, inbox) = controller_channel();
        let mut rx = inbox.into_receiver();
        let transport = Chunked {
            chunks: VecDeque::from(vec![
                b"error:Temp\xC3".to_vec(),
                b"\xA9rature\r\n".to_vec(),
            ]),
        };
        let _device = GrblDevice::with_transport(
            Box::new(transport),
            "**** Connected to test @ 115200 baud",
            Duration::from_secs(60),
            sink,
        );
        assert_eq!(next_event(&mut rx).await, Some(CutterEvent::Banner));
        assert_eq!(
            next_event(&mut rx).await,
            Some(CutterEvent::ConsoleError {
                text: "error:Température".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_homing_is_not_a_stream() {
        let (sink, inbox) = controller_channel();
        let mut rx = inbox.into_receiver();
        let transport = EchoOk::default();
        let written = transport.written.clone();
        let device = GrblDevice::with_transport(
            Box::new(transport),
            "**** Connected to test @ 115200 baud",
            Duration::from_millis(50),
            sink,
        );
        assert_eq!(next_event(&mut rx).await, Some(CutterEvent::Banner));

        device.perform_homing_cycle().await.unwrap();
        assert_eq!(next_event(&mut rx).await, Some(CutterEvent::CommandCompleted));
        assert_eq!(*written.lock(), vec!["$H"]);
    }

    #[test]
    fn test_open_without_port() {
        let (sink, _inbox) = controller_channel();
        let err = GrblDevice::open(&GrblConfig::default(), sink).err();
        assert_eq!(err, Some(ConnectionError::NoPortConfigured));
    }
}
