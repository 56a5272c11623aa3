/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Forkey IRC bot.
//!
//! Usage: `forkey [config.json]`. Without an argument the path comes from
//! `FORKEY_CONFIG`, falling back to `config.json` in the working directory.
//! Log verbosity follows `RUST_LOG` and defaults to `info`.

use anyhow::Context;
use forkey_engine::config::{CONFIG_ENV, resolve_config_path};
use forkey_engine::{Bot, BotConfig, EngineBuilder, YoutubeFetcher};
use forkey_worker::{FetchDispatcher, HttpFetcher};
use tracing::{error, info};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let path = resolve_config_path(std::env::args().nth(1), std::env::var(CONFIG_ENV).ok());
    let config = BotConfig::load(&path).with_context(|| format!("loading {path}"))?;

    let reactor = EngineBuilder::from_config(&config)
        .build()
        .context("configuring tls")?;
    let dispatcher = FetchDispatcher::spawn(
        || HttpFetcher::new().map(YoutubeFetcher::new),
        reactor.handle(),
    )
    .context("starting fetch worker")?;
    let mut bot = Bot::new(&config).with_fetches(dispatcher.submitter());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building runtime")?;

    info!(server = %config.irc.server, port = config.irc.port, "starting");
    let handle = reactor.handle();
    let result = runtime.block_on(async {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupted");
                handle.shutdown();
            }
        });
        reactor.run(&mut bot).await
    });
    info!("stopped");

    dispatcher.shutdown();

    if let Err(e) = &result {
        error!(error = %e, "session ended with error");
    }
    result.context("irc session failed")
}
