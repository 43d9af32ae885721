use crate::config::Config;
use anyhow::Context;
use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing_subscriber::fmt::writer::MakeWriterExt;

mod api;
mod cache;
mod config;
mod error;
mod parse;
mod player;
mod scrape;

#[tokio::main]
async fn main() {
    // 로깅 초기화: 콘솔 + 일별 로테이션 파일
    let file_appender = tracing_appender::rolling::Builder::new()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix("scraper")
        .filename_suffix("log")
        .build("logs")
        .expect("initializing rolling file appender failed");

    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr.and(non_blocking))
        .with_ansi(true)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let config_path = if args.is_empty() {
        Cow::from("./config.toml")
    } else {
        Cow::from(args.remove(0))
    };

    let config = match get_config(&*config_path).await {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return;
        }
    };

    if let Err(e) = run(config).await {
        tracing::error!("Scrape failed: {}", e);
        tracing::error!("  {:?}", e);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let timeout = Duration::from_secs(config.scraper.timeout_secs);
    let http = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("could not create http client")?;

    // 크롤 시작 전에 전부 준비돼야 하는 것들. 하나라도 실패하면 큐에
    // 아무것도 넣지 않고 여기서 중단한다.
    let vehicles = api::catalog::get_vehicle_catalog(&http, &config.api.ucp_url).await?;
    let items = api::catalog::get_item_catalog(&http, &config.api.base_url).await?;
    let roster =
        api::roster::fetch_roster(&http, &config.api.base_url, &config.storage.roster_file)
            .await?;
    let token = api::client::load_token(&config.api.token_path).await?;

    let cache = Arc::new(cache::PlayerCache::new(&config.storage.db_file));
    cache.load().await;
    cache.set_item_catalog(items).await;

    let fetcher = api::client::ProfileClient::new(&config.api.base_url, token, timeout)?;
    let scraper = scrape::Scraper::new(fetcher, Arc::clone(&cache), vehicles, &config.scraper);

    let summary = scraper.scrape_all(roster).await?;
    tracing::info!(
        "done: {} processed, {} failed",
        summary.processed,
        summary.failed.len()
    );
    Ok(())
}

async fn get_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let mut f = File::open(path)
        .await
        .context("could not open config file")?;
    let mut toml = String::new();
    f.read_to_string(&mut toml)
        .await
        .context("could not read config file")?;
    let config = toml::from_str(&toml).context("could not parse config file")?;

    Ok(config)
}
