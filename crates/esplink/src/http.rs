use crate::LinkError;
use crate::address::{ConnectionState, DeviceAddress, Endpoint, LinkStatus};
use reqwest::header::ACCEPT;
use serde_json::{Value, json};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Request/response client for the device's HTTP command server.
///
/// Mirrors the device's view of a "connection": there is no persistent socket, a
/// successful `GET /ping` is what moves the client to [`ConnectionState::Connected`].
#[derive(Debug)]
pub struct DeviceClient {
    http: reqwest::Client,
    address: Option<DeviceAddress>,
    state: ConnectionState,
    last_error: Option<String>,
    last_response: Option<Value>,
}

impl DeviceClient {
    pub fn new(timeout: Duration) -> Result<Self, LinkError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("esplink/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(LinkError::Client)?;

        Ok(Self {
            http,
            address: None,
            state: ConnectionState::Disconnected,
            last_error: None,
            last_response: None,
        })
    }

    pub fn address(&self) -> Option<&DeviceAddress> {
        self.address.as_ref()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn last_response(&self) -> Option<&Value> {
        self.last_response.as_ref()
    }

    pub fn status(&self) -> LinkStatus {
        LinkStatus::new(self.state, self.last_error.clone())
    }

    /// Pings `address` and records the outcome. Never fails: the result is the new state,
    /// with the reason available through [`DeviceClient::status`].
    pub async fn connect(&mut self, address: Option<DeviceAddress>) -> ConnectionState {
        let Some(address) = address else {
            self.last_error = Some(LinkError::MissingAddress.to_string());
            return self.state;
        };

        self.address = Some(address);
        self.state = ConnectionState::Connecting;
        self.last_error = None;

        match self.ping().await {
            Ok(body) => {
                log::info!("Device answered ping: {}", body);
                self.state = ConnectionState::Connected;
                self.last_response = Some(body);
            }
            Err(e) => {
                log::warn!("Device ping failed: {}", e);
                self.state = ConnectionState::Error;
                self.last_error = Some(e.to_string());
            }
        }
        self.state
    }

    pub async fn ping(&self) -> Result<Value, LinkError> {
        let address = self.address.as_ref().ok_or(LinkError::MissingAddress)?;
        let response = self
            .http
            .get(address.http_url(&Endpoint::ping()))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(LinkError::Connect)?;

        Self::read_json(response).await.map_err(|e| match e {
            LinkError::Command(inner) => LinkError::Connect(inner),
            other => other,
        })
    }

    /// POSTs `payload` as JSON when given, otherwise issues a GET.
    pub async fn send(
        &mut self,
        endpoint: &Endpoint,
        payload: Option<&Value>,
    ) -> Result<Value, LinkError> {
        let result = self.request(endpoint, payload).await;
        match &result {
            Ok(body) => {
                self.last_error = None;
                self.last_response = Some(body.clone());
            }
            Err(e) => self.last_error = Some(e.to_string()),
        }
        result
    }

    pub async fn send_test(&mut self) -> Result<Value, LinkError> {
        self.send(&Endpoint::set_state(), Some(&json!({ "test": true })))
            .await
    }

    pub fn disconnect(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.last_response = None;
    }

    async fn request(
        &self,
        endpoint: &Endpoint,
        payload: Option<&Value>,
    ) -> Result<Value, LinkError> {
        if self.state != ConnectionState::Connected {
            return Err(LinkError::NotConnected);
        }
        let address = self.address.as_ref().ok_or(LinkError::MissingAddress)?;
        let url = address.http_url(endpoint);

        let request = match payload {
            Some(body) => self.http.post(url).json(body),
            None => self.http.get(url),
        };

        let response = request
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(LinkError::Command)?;

        Self::read_json(response).await
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, LinkError> {
        let status = response.status();
        if !status.is_success() {
            return Err(LinkError::Status(status));
        }
        response.json::<Value>().await.map_err(LinkError::Command)
    }
}
