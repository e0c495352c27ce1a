use crate::LinkError;
use crate::address::DeviceAddress;
use async_channel::{Receiver, Sender};
use serde::Serialize;
use serde_json::Value;
use std::io;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Error as WsError, Message, WebSocket};

pub const DEFAULT_PORT: u16 = 81;
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct SocketConfig {
    pub address: DeviceAddress,
    pub port: u16,
    pub reconnect_delay: Duration,
    /// Upper bound on how long the reader blocks before servicing outgoing messages.
    pub poll_interval: Duration,
}

impl SocketConfig {
    pub fn new(address: DeviceAddress) -> Self {
        Self {
            address,
            port: DEFAULT_PORT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// A message pushed by the device. Anything that is not valid JSON is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SocketMessage {
    Json { data: Value },
    Text { data: String, received_at: SystemTime },
}

impl SocketMessage {
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str(raw) {
            Ok(data) => Self::Json { data },
            Err(_) => Self::Text {
                data: raw.to_string(),
                received_at: SystemTime::now(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Connected,
    Message(SocketMessage),
    Disconnected,
    Error(String),
}

/// Streaming link to the device's WebSocket server.
///
/// A dedicated thread owns the connection; it reconnects after
/// [`SocketConfig::reconnect_delay`] whenever the connection drops, until
/// [`DeviceSocket::close`] is called or the handle is dropped.
#[derive(Debug)]
pub struct DeviceSocket {
    outgoing: Sender<String>,
    events: Receiver<SocketEvent>,
    connected: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl DeviceSocket {
    pub fn open(config: SocketConfig) -> Self {
        let (outgoing_tx, outgoing_rx) = async_channel::unbounded();
        let (events_tx, events_rx) = async_channel::unbounded();
        let connected = Arc::new(AtomicBool::new(false));
        let closed = Arc::new(AtomicBool::new(false));

        let worker = {
            let link = Worker {
                config,
                outgoing: outgoing_rx,
                events: events_tx,
                connected: connected.clone(),
                closed: closed.clone(),
            };
            thread::spawn(move || link.run())
        };

        Self {
            outgoing: outgoing_tx,
            events: events_rx,
            connected,
            closed,
            worker: Some(worker),
        }
    }

    pub fn events(&self) -> &Receiver<SocketEvent> {
        &self.events
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn send(&self, text: impl Into<String>) -> Result<(), LinkError> {
        if !self.is_connected() {
            return Err(LinkError::SocketNotConnected);
        }
        self.outgoing
            .try_send(text.into())
            .map_err(|_| LinkError::SocketNotConnected)
    }

    pub fn send_json(&self, value: &Value) -> Result<(), LinkError> {
        self.send(value.to_string())
    }

    /// Closes the connection and stops reconnecting. Blocks until the worker exits.
    pub fn close(mut self) {
        self.closed.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            log::error!("WebSocket worker panicked");
        }
    }
}

impl Drop for DeviceSocket {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

struct Worker {
    config: SocketConfig,
    outgoing: Receiver<String>,
    events: Sender<SocketEvent>,
    connected: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl Worker {
    fn run(self) {
        let url = self.config.address.ws_url(self.config.port);

        while !self.is_closed() {
            match tungstenite::connect(url.as_str()) {
                Ok((mut socket, _)) => {
                    if let MaybeTlsStream::Plain(stream) = socket.get_mut()
                        && let Err(e) = stream.set_read_timeout(Some(self.config.poll_interval))
                    {
                        log::warn!("Failed to set WebSocket read timeout: {}", e);
                    }
                    log::info!("WebSocket connected to {}", url);
                    self.connected.store(true, Ordering::Release);
                    self.emit(SocketEvent::Connected);

                    self.pump(&mut socket);

                    self.connected.store(false, Ordering::Release);
                    if self.is_closed() {
                        let _ = socket.close(None);
                        let _ = socket.flush();
                        break;
                    }
                    log::info!("WebSocket to {} closed", url);
                    self.emit(SocketEvent::Disconnected);
                }
                Err(e) => {
                    log::debug!("WebSocket connection to {} failed: {}", url, e);
                    self.emit(SocketEvent::Error(format!("Connection error: {e}")));
                }
            }
            self.wait_before_reconnect();
        }
    }

    /// Shuttles messages until the connection ends or the socket is closed locally.
    fn pump(&self, socket: &mut Socket) {
        loop {
            if self.is_closed() {
                return;
            }

            while let Ok(text) = self.outgoing.try_recv() {
                if let Err(e) = socket.send(Message::text(text)) {
                    self.emit(SocketEvent::Error(format!("Failed to send message: {e}")));
                    return;
                }
            }

            match socket.read() {
                Ok(Message::Text(text)) => {
                    self.emit(SocketEvent::Message(SocketMessage::parse(text.as_str())));
                }
                Ok(Message::Binary(bytes)) => {
                    let text = String::from_utf8_lossy(&bytes);
                    self.emit(SocketEvent::Message(SocketMessage::parse(&text)));
                }
                Ok(Message::Close(frame)) => {
                    log::debug!("WebSocket close frame: {:?}", frame);
                }
                Ok(_) => {}
                Err(WsError::Io(e))
                    if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return,
                Err(e) => {
                    log::error!("WebSocket error: {}", e);
                    self.emit(SocketEvent::Error("WebSocket error occurred".to_string()));
                    return;
                }
            }
        }
    }

    fn wait_before_reconnect(&self) {
        let step = Duration::from_millis(25);
        let mut waited = Duration::ZERO;
        while waited < self.config.reconnect_delay && !self.is_closed() {
            thread::sleep(step);
            waited += step;
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.events.is_closed()
    }

    fn emit(&self, event: SocketEvent) {
        let _ = self.events.send_blocking(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::net::TcpListener;
    use std::time::Instant;

    fn next_event(socket: &DeviceSocket) -> SocketEvent {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Ok(event) = socket.events().try_recv() {
                return event;
            }
            assert!(Instant::now() < deadline, "timed out waiting for socket event");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_parse_json_and_text() {
        assert_eq!(
            SocketMessage::parse(r#"{"button":3,"pressed":true}"#),
            SocketMessage::Json {
                data: json!({ "button": 3, "pressed": true })
            }
        );

        match SocketMessage::parse("hello device") {
            SocketMessage::Text { data, .. } => assert_eq!(data, "hello device"),
            other => panic!("expected text message, got {other:?}"),
        }
    }

    #[test]
    fn test_send_before_connect_is_rejected() {
        let mut config = SocketConfig::new(DeviceAddress::from("127.0.0.1"));
        // Nothing listens on port 1.
        config.port = 1;
        config.reconnect_delay = Duration::from_millis(50);
        let socket = DeviceSocket::open(config);

        assert!(matches!(
            socket.send("x"),
            Err(LinkError::SocketNotConnected)
        ));
        socket.close();
    }

    #[test]
    fn test_round_trip_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut ws = tungstenite::accept(stream).unwrap();
            ws.send(Message::text(r#"{"status":"ready"}"#)).unwrap();
            ws.send(Message::text("raw line")).unwrap();
            let reply = ws.read().unwrap();
            ws.close(None).unwrap();
            while ws.read().is_ok() {}
            reply.into_text().unwrap().to_string()
        });

        let mut config = SocketConfig::new(DeviceAddress::from("127.0.0.1"));
        config.port = port;
        config.reconnect_delay = Duration::from_millis(50);
        let socket = DeviceSocket::open(config);

        assert_eq!(next_event(&socket), SocketEvent::Connected);
        assert_eq!(
            next_event(&socket),
            SocketEvent::Message(SocketMessage::Json {
                data: json!({ "status": "ready" })
            })
        );
        match next_event(&socket) {
            SocketEvent::Message(SocketMessage::Text { data, .. }) => assert_eq!(data, "raw line"),
            other => panic!("expected raw text, got {other:?}"),
        }

        socket.send_json(&json!({ "slot": 2 })).unwrap();
        assert_eq!(server.join().unwrap(), r#"{"slot":2}"#);
        assert_eq!(next_event(&socket), SocketEvent::Disconnected);

        socket.close();
    }
}
