use anyhow::{Context, Result};
use clap::Parser;
use immo_scout::bot::Bot;
use immo_scout::config::{AppConfig, DEFAULT_CONFIG_PATH};
use immo_scout::notify::{LogNotifier, Notifier, TelegramNotifier};
use immo_scout::renderer::ChromeLauncher;
use immo_scout::scrapers::build_sources;
use immo_scout::store::JsonFileBackend;
use immo_scout::{ListingId, Session};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Watch property portals and report new listings
#[derive(Parser, Debug)]
#[command(name = "immo-scout", version)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Poll once and exit
    #[arg(long)]
    once: bool,

    /// Forget these listing ids in every source and exit
    #[arg(long, value_name = "ID", num_args = 1..)]
    forget: Vec<ListingId>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(&args.config)?;

    // RUST_LOG wins over the configured level
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.logging.level).context("invalid logging.level")?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(config = %args.config.display(), "Starting immo-scout");

    let backend = Arc::new(JsonFileBackend::new(config.general.store_dir.clone()));
    let launcher = Arc::new(ChromeLauncher::from_config(&config.general));
    let mut sources = build_sources(&config, backend, launcher);
    if sources.is_empty() {
        warn!("No source enabled, nothing to do");
        return Ok(());
    }

    let notifier: Box<dyn Notifier> = match &config.telegram {
        Some(telegram) => Box::new(TelegramNotifier::new(telegram)),
        None => {
            warn!("No [telegram] section, new listings are only logged");
            Box::new(LogNotifier)
        }
    };
    let bot = Bot::new(notifier, config.bot.frequency());

    let mut session = Session::open(&mut sources).context("opening sources")?;
    let outcome = if !args.forget.is_empty() {
        session.forget(&args.forget).context("forgetting listings")
    } else if args.once {
        bot.poll(&mut *session).await.map(|sent| info!(sent, "Single poll done"))
    } else {
        bot.run(&mut *session).await
    };

    session.close().context("closing sources")?;
    outcome
}
