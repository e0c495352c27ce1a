//! Connectivity to the steering-wheel button controller: HTTP ping/command exchange and a
//! reconnecting WebSocket stream.

pub mod macros;
pub mod address;
pub mod http;
pub mod socket;

pub use address::{ConnectionState, DeviceAddress, Endpoint, LinkStatus};
pub use http::DeviceClient;
pub use socket::{DeviceSocket, SocketConfig, SocketEvent, SocketMessage};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Please enter an IP address")]
    MissingAddress,
    #[error("Please connect to the device first")]
    NotConnected,
    #[error("WebSocket is not connected")]
    SocketNotConnected,
    #[error("Error: {0}")]
    Status(reqwest::StatusCode),
    #[error("Connection failed: {0}")]
    Connect(#[source] reqwest::Error),
    #[error("Command failed: {0}")]
    Command(#[source] reqwest::Error),
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}
