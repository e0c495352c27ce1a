use crate::config::Config;
use crate::events::{AppEvent, LinkRequest};
use async_channel::{Receiver, Sender};
use std::thread;
use tokio::runtime::Runtime;

/// Runs the control socket, the config watcher and the device link on their own
/// multi-thread runtime, off the interaction thread.
pub fn start_background_services(
    config: &Config,
    tx: Sender<AppEvent>,
    link_rx: Receiver<LinkRequest>,
) {
    let socket_path = config.server.socket_path.clone();
    let device = config.device.clone();

    thread::spawn(move || {
        let rt = match Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                log::error!("Failed to create Tokio runtime: {}", e);
                return;
            }
        };

        rt.block_on(async {
            {
                let tx = tx.clone();
                tokio::spawn(async move {
                    crate::sys::server::run_server(socket_path, tx).await;
                });
            }

            {
                let tx = tx.clone();
                tokio::spawn(async move {
                    crate::config::run_async_watcher(tx).await;
                });
            }

            {
                let tx = tx.clone();
                tokio::spawn(async move {
                    crate::sys::device::run_device_link(device, link_rx, tx).await;
                });
            }

            std::future::pending::<()>().await;
        });
    });
}
