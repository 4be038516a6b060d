use super::contract::SpawnRequest;
use nameplate_common::Result;
use std::path::Path;
use tracing::debug;

/// Write a spawn request where a freshly started worker will find it
pub async fn write_bootstrap(path: &Path, request: &SpawnRequest) -> Result<()> {
    let bytes = request.to_bytes()?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Read and consume a bootstrap file
///
/// The file is deleted immediately after reading, before the contents
/// are even decoded; a bootstrap handoff is single-use.
pub async fn read_bootstrap(path: &Path) -> Result<SpawnRequest> {
    let bytes = tokio::fs::read(path).await?;
    tokio::fs::remove_file(path).await?;
    debug!("consumed bootstrap file {}", path.display());

    SpawnRequest::from_bytes(&bytes)
}
