use anyhow::Result;

use crate::SourcePayload;

/// A provider adapter: one weather service, already mapped onto the common
/// field names and units.
#[async_trait::async_trait]
pub trait ReadingSource: Send + Sync {
    /// Stable provider identifier used in priority lists
    fn id(&self) -> &str;

    /// Fetch and fully materialize this provider's readings
    async fn fetch(&self) -> Result<SourcePayload>;
}
