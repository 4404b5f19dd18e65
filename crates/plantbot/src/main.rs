use std::sync::Arc;

use anyhow::Context;

use plantbot_core::{
    actuator::Actuator,
    config::Config,
    dispatch::{Dispatcher, PollSettings},
};
use plantbot_gpio::GpioPin;
use plantbot_telegram::TelegramClient;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    plantbot_core::logging::init("plantbot")?;

    let cfg = Config::load()?;
    tracing::info!(config = ?cfg, "starting plantbot");

    let pin = GpioPin::open(cfg.pin_number)
        .with_context(|| format!("failed to acquire gpio pin {}", cfg.pin_number))?;

    let api = Arc::new(TelegramClient::new(&cfg).context("failed to build telegram client")?);
    let mut dispatcher = Dispatcher::new(api, Actuator::new(pin), PollSettings::from(&cfg));

    let res = dispatcher.run().await;
    if let Err(e) = &res {
        tracing::error!(error = %e, offset = dispatcher.offset().0, "polling stopped");
    }
    res.context("fetching updates failed")
}
