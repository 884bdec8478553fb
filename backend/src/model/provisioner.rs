use std::path::Path;

use futures_util::StreamExt;
use log::info;
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
    #[error("model download failed: {0}")]
    Download(#[from] reqwest::Error),
    #[error("model download failed: server returned {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to write model artifact: {0}")]
    Write(#[from] std::io::Error),
}

/// Ensure the model artifact exists at `path`, downloading it from
/// `remote_url` if absent. The body is streamed into `<path>.partial` and
/// renamed only once fully written, so an interrupted download is never
/// mistaken for a complete artifact on the next start. No checksum, no
/// retries.
pub async fn ensure_model_present(path: &Path, remote_url: &str) -> Result<(), ProvisioningError> {
    if path.exists() {
        return Ok(());
    }

    info!(
        "Model not found at {}. Downloading from remote storage...",
        path.display()
    );

    let response = reqwest::get(remote_url).await?;
    if !response.status().is_success() {
        return Err(ProvisioningError::Status(response.status()));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let partial_path = path.with_extension("partial");
    let mut file = fs::File::create(&partial_path).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    drop(file);

    fs::rename(&partial_path, path).await?;
    info!("Model downloaded to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn existing_artifact_is_left_untouched() {
        let path = std::env::temp_dir().join("classifier-provisioner-test.pt");
        std::fs::write(&path, b"weights").unwrap();

        // The remote URL is unroutable; reaching the network would fail.
        ensure_model_present(&path, "http://invalid.invalid/model.pt")
            .await
            .unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"weights");
        std::fs::remove_file(&path).unwrap();
    }
}
