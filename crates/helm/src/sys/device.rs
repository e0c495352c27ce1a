use crate::config::DeviceSettings;
use crate::events::{AppEvent, LinkRequest};
use crate::interaction::PlacementMap;
use async_channel::{Receiver, Sender};
use esplink::{
    ConnectionState, DeviceClient, DeviceSocket, Endpoint, LinkError, SocketConfig, SocketEvent,
};
use serde_json::json;

/// Owns the HTTP client and the optional WebSocket for the lifetime of the app.
pub async fn run_device_link(
    settings: DeviceSettings,
    requests: Receiver<LinkRequest>,
    events: Sender<AppEvent>,
) {
    let mut link = match Link::new(settings, events) {
        Ok(link) => link,
        Err(e) => {
            log::error!("Device link unavailable: {}", e);
            return;
        }
    };

    if link.settings.auto_connect {
        link.connect().await;
    }

    loop {
        tokio::select! {
            request = requests.recv() => match request {
                Ok(request) => link.handle(request).await,
                Err(_) => break,
            },
            Some(event) = next_socket_event(link.socket.as_ref()) => {
                if link.events.send(AppEvent::Socket(event)).await.is_err() {
                    break;
                }
            }
        }
    }

    link.close_socket();
}

async fn next_socket_event(socket: Option<&DeviceSocket>) -> Option<SocketEvent> {
    match socket {
        Some(socket) => socket.events().recv().await.ok(),
        None => std::future::pending().await,
    }
}

struct Link {
    settings: DeviceSettings,
    client: DeviceClient,
    socket: Option<DeviceSocket>,
    events: Sender<AppEvent>,
}

impl Link {
    fn new(settings: DeviceSettings, events: Sender<AppEvent>) -> Result<Self, LinkError> {
        Ok(Self {
            client: DeviceClient::new(settings.timeout())?,
            settings,
            socket: None,
            events,
        })
    }

    async fn handle(&mut self, request: LinkRequest) {
        match request {
            LinkRequest::Connect => self.connect().await,
            LinkRequest::Disconnect => {
                self.client.disconnect();
                self.close_socket();
                log::info!("Disconnected from device");
                self.report().await;
            }
            LinkRequest::Test => {
                match self.client.send_test().await {
                    Ok(body) => log::info!("Test command answered: {}", body),
                    Err(e) => log::warn!("{}", e),
                }
                self.report().await;
            }
            LinkRequest::Push(map) => self.push(&map).await,
            LinkRequest::Configure(settings) => self.configure(settings).await,
        }
    }

    async fn connect(&mut self) {
        self.close_socket();
        let state = self.client.connect(self.settings.address()).await;
        if state == ConnectionState::Connected
            && self.settings.websocket
            && let Some(address) = self.client.address().cloned()
        {
            let mut config = SocketConfig::new(address);
            config.port = self.settings.ws_port;
            config.reconnect_delay = self.settings.reconnect_delay();
            self.socket = Some(DeviceSocket::open(config));
        }
        self.report().await;
    }

    /// Pushes are best effort: skipped while disconnected, failures only logged.
    async fn push(&mut self, map: &PlacementMap) {
        if self.client.state() != ConnectionState::Connected {
            log::debug!("Not connected, placement push skipped");
            return;
        }
        let payload = json!({ "slots": map });
        if let Err(e) = self.client.send(&Endpoint::set_state(), Some(&payload)).await {
            log::warn!("Placement push failed: {}", e);
            self.report().await;
        }
    }

    async fn configure(&mut self, settings: DeviceSettings) {
        if settings == self.settings {
            return;
        }
        let reconnect = settings.address != self.settings.address
            || settings.timeout_ms != self.settings.timeout_ms
            || settings.ws_port != self.settings.ws_port;
        let was_connected = self.client.state() == ConnectionState::Connected;

        if reconnect {
            match DeviceClient::new(settings.timeout()) {
                Ok(client) => {
                    self.close_socket();
                    self.client = client;
                }
                Err(e) => {
                    log::error!("Keeping previous device settings: {}", e);
                    return;
                }
            }
        }
        self.settings = settings;
        log::info!("Device settings updated");

        if reconnect && (was_connected || self.settings.auto_connect) {
            self.connect().await;
        } else if reconnect {
            self.report().await;
        }
    }

    fn close_socket(&mut self) {
        if let Some(socket) = self.socket.take() {
            tokio::task::spawn_blocking(move || socket.close());
        }
    }

    async fn report(&self) {
        let _ = self.events.send(AppEvent::LinkStatus(self.client.status())).await;
    }
}
