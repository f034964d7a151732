use crate::error::{IngestError, Result};
use crate::models::Station;
use crate::settings::FetchSettings;
use crate::utils::filename::{fallback_file_name, file_url, primary_file_name};
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A downloaded observation file.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub file_name: String,
    pub saved_to: PathBuf,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
enum AttemptError {
    Status(StatusCode),
    Transport(reqwest::Error),
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::Status(status) => write!(f, "{}", status),
            AttemptError::Transport(e) => write!(f, "{}", e),
        }
    }
}

/// Downloads `{base_url}/{id}_-BEOB.csv`, falling back to `{id}-BEOB.csv`.
pub struct PoiFetcher {
    client: Client,
    base_url: String,
    save_dir: PathBuf,
}

impl PoiFetcher {
    /// Build the client and make sure the save directory exists.
    pub fn new(base_url: &str, save_dir: &Path, settings: &FetchSettings) -> Result<Self> {
        ensure_save_dir(save_dir)?;

        let client = Client::builder()
            .timeout(settings.timeout())
            .user_agent(settings.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            save_dir: save_dir.to_path_buf(),
        })
    }

    pub async fn fetch(&self, station: &Station) -> Result<FetchedFile> {
        let candidates = [primary_file_name(&station.id), fallback_file_name(&station.id)];
        let mut attempts = Vec::with_capacity(candidates.len());

        for file_name in candidates {
            match self.download(&file_name).await {
                Ok(bytes) => {
                    let saved_to = self.save_dir.join(&file_name);
                    tokio::fs::write(&saved_to, &bytes).await?;
                    info!(
                        file = %file_name,
                        path = %saved_to.display(),
                        bytes = bytes.len(),
                        "downloaded observation file"
                    );
                    return Ok(FetchedFile {
                        file_name,
                        saved_to,
                        bytes,
                    });
                }
                Err(e) => {
                    debug!(file = %file_name, error = %e, "download attempt failed");
                    attempts.push(format!("{}: {}", file_name, e));
                }
            }
        }

        warn!(attempts = ?attempts, "no observation file available");
        Err(IngestError::FetchFailed {
            station_id: station.id.clone(),
            attempts,
        })
    }

    async fn download(&self, file_name: &str) -> std::result::Result<Vec<u8>, AttemptError> {
        let url = file_url(&self.base_url, file_name);
        debug!(url = %url, "requesting observation file");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(AttemptError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status));
        }

        let body = response.bytes().await.map_err(AttemptError::Transport)?;
        Ok(body.to_vec())
    }
}

/// Create the save directory if needed. Failure is fatal for the run.
pub fn ensure_save_dir(save_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(save_dir).map_err(|source| IngestError::SaveDirectory {
        path: save_dir.to_path_buf(),
        source,
    })
}
