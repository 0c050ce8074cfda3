use anyhow::Result;
use std::fs::{self, File};
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sifriya_core::Config;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

const DEFAULT_LOG_FILTER: &str = "sifriya_core=info,sifriya_tui=info";

/// The terminal belongs to the UI, so logs go to `<config_dir>/sifriya/sifriya.log`
fn init_logging() -> Result<()> {
    let dir = Config::config_dir()?;
    fs::create_dir_all(&dir)?;
    let file = File::create(dir.join("sifriya.log"))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging is best effort; the reader works without it
    let logging = init_logging();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "falling back to default config");
            Config::new()
        }
    };
    info!(base_url = %config.base_url, "starting");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let mut app = App::new(config, events.sender());
    app.load_library();
    if let Err(err) = logging {
        app.status = Some(format!("Logging disabled: {}", err));
    }

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(&mut app, event);
        }
    }

    tui::restore()?;
    Ok(())
}
