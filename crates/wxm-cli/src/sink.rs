use anyhow::{Context, Result};
use std::fs::create_dir_all;
use std::io::Write;
use std::path::{Path, PathBuf};
use wxm_reconcile::Forecast;

/// Destination for a finished forecast
#[async_trait::async_trait]
pub trait ForecastSink: Send {
    async fn emit(&mut self, forecast: &Forecast) -> Result<()>;
}

fn render(forecast: &Forecast, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(forecast)?
    } else {
        serde_json::to_string(forecast)?
    };
    Ok(json)
}

/// Replaces the target file on every emit
pub struct FileSink {
    file: PathBuf,
    pretty: bool,
}

impl FileSink {
    pub fn new<P: AsRef<Path>>(file: P, pretty: bool) -> Result<Self> {
        let file = file.as_ref().to_path_buf();
        if let Some(dir) = file.parent().filter(|d| !d.as_os_str().is_empty()) {
            create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(Self { file, pretty })
    }
}

#[async_trait::async_trait]
impl ForecastSink for FileSink {
    async fn emit(&mut self, forecast: &Forecast) -> Result<()> {
        let mut body = render(forecast, self.pretty)?;
        body.push('\n');
        tokio::fs::write(&self.file, body)
            .await
            .with_context(|| format!("Failed to write {}", self.file.display()))?;
        tracing::info!(path = %self.file.display(), "Forecast written");
        Ok(())
    }
}

pub struct StdoutSink {
    pretty: bool,
}

impl StdoutSink {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

#[async_trait::async_trait]
impl ForecastSink for StdoutSink {
    async fn emit(&mut self, forecast: &Forecast) -> Result<()> {
        let body = render(forecast, self.pretty)?;
        write_stdout(&body)?;
        Ok(())
    }
}

fn write_stdout(body: &str) -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    out.write_all(body.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()
}
