use clap::{Parser, Subcommand};
use esplink::socket::{DEFAULT_PORT, DEFAULT_RECONNECT_DELAY};
use esplink::{
    ConnectionState, DeviceAddress, DeviceClient, DeviceSocket, Endpoint, LinkError,
    SocketConfig, SocketEvent,
};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "esplink", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Request timeout in milliseconds
    #[arg(short = 't', long, default_value_t = 5000)]
    timeout_ms: u64,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Check that the device answers on /ping.
    Ping { address: String },
    /// Send a command to a named endpoint (POST when --data is given, GET otherwise).
    Send {
        address: String,
        endpoint: String,
        /// JSON payload
        #[arg(short = 'd', long)]
        data: Option<String>,
    },
    /// Stream messages from the device's WebSocket until interrupted.
    Listen {
        address: String,
        #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let timeout = Duration::from_millis(cli.timeout_ms);

    match cli.command {
        Commands::Ping { address } => {
            let mut client = DeviceClient::new(timeout)?;
            connect(&mut client, &address).await?;
            if let Some(body) = client.last_response() {
                println!("{}", serde_json::to_string_pretty(body)?);
            }
            Ok(())
        }
        Commands::Send {
            address,
            endpoint,
            data,
        } => {
            let payload = data
                .as_deref()
                .map(serde_json::from_str::<serde_json::Value>)
                .transpose()?;
            let mut client = DeviceClient::new(timeout)?;
            connect(&mut client, &address).await?;
            let body = client
                .send(&Endpoint::new(endpoint), payload.as_ref())
                .await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        }
        Commands::Listen { address, port } => listen(&address, port).await,
    }
}

async fn connect(client: &mut DeviceClient, address: &str) -> anyhow::Result<()> {
    match client.connect(DeviceAddress::parse(address)).await {
        ConnectionState::Connected => Ok(()),
        state => anyhow::bail!(
            "{} ({})",
            client.status().error.unwrap_or_default(),
            state
        ),
    }
}

async fn listen(address: &str, port: u16) -> anyhow::Result<()> {
    let address = DeviceAddress::parse(address).ok_or(LinkError::MissingAddress)?;
    let socket = DeviceSocket::open(SocketConfig {
        port,
        reconnect_delay: DEFAULT_RECONNECT_DELAY,
        ..SocketConfig::new(address)
    });

    while let Ok(event) = socket.events().recv().await {
        match event {
            SocketEvent::Message(message) => println!("{}", serde_json::to_string(&message)?),
            SocketEvent::Connected => log::info!("connected"),
            SocketEvent::Disconnected => log::warn!("disconnected, reconnecting"),
            SocketEvent::Error(e) => log::error!("{}", e),
        }
    }
    Ok(())
}
