//! Tatkham server binary.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tatkham::config::ProxyConfig;
use tatkham::proxy::{SearchProxy, serve};

/// Segmentation-aware Thai search proxy.
#[derive(Debug, Parser)]
#[command(name = "tatkham", version, about)]
struct Args {
    /// Path to a JSON configuration file.
    #[arg(short, long, env = "TATKHAM_CONFIG")]
    config: Option<PathBuf>,

    /// Backend search API base URL.
    #[arg(long, env = "TATKHAM_BACKEND_URL")]
    backend_url: Option<String>,

    /// Backend API key.
    #[arg(long, env = "TATKHAM_BACKEND_API_KEY")]
    backend_api_key: Option<String>,

    /// Path to the compound dictionary JSON file.
    #[arg(short, long, env = "TATKHAM_DICTIONARY")]
    dictionary: Option<PathBuf>,

    /// Listen host.
    #[arg(long, env = "TATKHAM_HOST")]
    host: Option<String>,

    /// Listen port.
    #[arg(short, long, env = "TATKHAM_PORT")]
    port: Option<u16>,
}

impl Args {
    /// Resolve the effective configuration: file first, flags on top.
    fn resolve(&self) -> anyhow::Result<ProxyConfig> {
        let mut config = match &self.config {
            Some(path) => ProxyConfig::load(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(url) = &self.backend_url {
            config.backend.url = url.clone();
        }
        if let Some(key) = &self.backend_api_key {
            config.backend.api_key = Some(key.clone());
        }
        if let Some(path) = &self.dictionary {
            config.segmenter.dictionary_path = path.display().to_string();
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tatkham=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(error) = run(Args::parse()).await {
        tracing::error!("{error:#}");
        process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = args.resolve()?;
    tracing::info!(
        backend = %config.backend.url,
        dictionary = %config.segmenter.dictionary_path,
        "starting tatkham"
    );

    let proxy = Arc::new(SearchProxy::from_config(config)?);
    serve(proxy).await?;
    Ok(())
}
