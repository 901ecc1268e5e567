use anyhow::{Context, Result};
use std::path::PathBuf;
use wxm_core::{ReadingSource, SourcePayload};

/// Provider payload stored as a JSON file
pub struct FileSource {
    id: String,
    path: PathBuf,
}

impl FileSource {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }
}

#[async_trait::async_trait]
impl ReadingSource for FileSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch(&self) -> Result<SourcePayload> {
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let payload = serde_json::from_str(&body)
            .with_context(|| format!("Invalid payload in {}", self.path.display()))?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_payload_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noaa.json");
        std::fs::write(
            &path,
            r#"{"readings":[{"field":"temperature","validTime":"2020-04-10T16:00:00Z/PT1H","value":20,"unit":"celsius"}]}"#,
        )
        .unwrap();

        let source = FileSource::new("noaa", &path);
        let payload = source.fetch().await.unwrap();
        assert_eq!(source.id(), "noaa");
        assert_eq!(payload.readings.len(), 1);
        assert!(payload.alerts.is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let source = FileSource::new("noaa", "/nonexistent/noaa.json");
        let err = source.fetch().await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to read"));
    }
}
