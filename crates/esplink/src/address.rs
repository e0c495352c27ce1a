use derive_more::{AsRef, Deref, Display, From, Into};
use serde::{Deserialize, Serialize};
use strum::{Display as StrumDisplay, EnumString};

/// Host (or `host:port`) of the device's HTTP server, without scheme.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Deref, From, Into, AsRef,
)]
#[serde(transparent)]
pub struct DeviceAddress(String);

crate::impl_string_newtype!(DeviceAddress);

impl DeviceAddress {
    /// Strips whitespace, a leading scheme and trailing slashes; `None` when nothing is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let host = raw
            .trim()
            .trim_start_matches("http://")
            .trim_start_matches("ws://")
            .trim_end_matches('/');
        (!host.is_empty()).then(|| Self::new(host))
    }

    pub fn http_url(&self, endpoint: &Endpoint) -> String {
        format!("http://{}/{}", self.0, endpoint.trim_start_matches('/'))
    }

    pub fn ws_url(&self, port: u16) -> String {
        format!("ws://{}:{}/ws", self.0, port)
    }
}

/// Named command endpoint on the device, e.g. `ping` or `setState`.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Deref, From, Into, AsRef,
)]
#[serde(transparent)]
pub struct Endpoint(String);

crate::impl_string_newtype!(Endpoint);

impl Endpoint {
    pub fn ping() -> Self {
        Self::new("ping")
    }

    pub fn set_state() -> Self {
        Self::new("setState")
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize, EnumString, StrumDisplay,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Connection-status / error-message pair reported to the application layer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LinkStatus {
    pub state: ConnectionState,
    pub error: Option<String>,
}

impl LinkStatus {
    pub fn new(state: ConnectionState, error: Option<String>) -> Self {
        Self { state, error }
    }
}
