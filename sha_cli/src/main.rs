use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sha_core::{
    amis_client::AmisClient, chart, config::Config, overview::render_all_halls,
    store::LocalStore,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Fetch sports hall availability images and plot a weekly overview per hall.
#[derive(Debug, Parser)]
pub struct Arguments {
    /// the configuration JSON file
    #[arg(default_value = "configs/template.json")]
    pub config: PathBuf,
    /// only plot the images already in the image directory
    #[arg(long)]
    pub no_fetch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Arguments::parse();
    let config = Config::load(&args.config)?;
    let client = AmisClient::from_config(&config).context("cannot build the HTTP client")?;
    let store = LocalStore::new(&config.img_dir);
    if !args.no_fetch {
        for &hall_id in &config.hall_ids {
            match store
                .save_run(
                    &client,
                    hall_id,
                    &config.days_of_week,
                    config.start_date,
                    config.end_date,
                )
                .await
            {
                Ok(summary) => info!(
                    hall_id,
                    saved = summary.saved,
                    failed = summary.failed,
                    "fetched availability images"
                ),
                Err(err) => warn!(hall_id, error = %err, "failed to store availability images"),
            }
        }
    }
    let with_text = chart::load_font(config.font_path.as_deref());
    let summary = render_all_halls(&store, &client, with_text).await?;
    info!(
        rendered = summary.rendered,
        failed = summary.failed,
        "finished rendering overviews"
    );
    Ok(())
}
