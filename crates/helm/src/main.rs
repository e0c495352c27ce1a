use helm::app::{self, AppModel};
use helm::config;
use helm::sys::runtime;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = config::load_or_setup();

    let (tx, rx) = async_channel::bounded(32);
    let (link_tx, link_rx) = async_channel::bounded(16);

    // Start Background Services
    runtime::start_background_services(&config, tx.clone(), link_rx);

    let model = AppModel::new(config, link_tx);

    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?
        .block_on(app::run(model, rx));

    Ok(())
}
