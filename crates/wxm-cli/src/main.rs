use anyhow::{Context, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Observability
    wxm_obs::init("wxmerge");

    // Config
    let cfg = wxm_config::AppConfig::load().context("Failed to load configuration")?;
    let reference = cfg
        .reference_timestamp()?
        .unwrap_or_else(|| chrono::Utc::now().timestamp());

    let mut sink = wxm_cli::output_sink(&cfg)?;
    let forecast = wxm_cli::run(&cfg, wxm_cli::configured_sources(&cfg), reference).await?;
    sink.emit(&forecast).await.context("Failed to emit forecast")?;

    Ok(())
}
