//! Background track selection and download.
//!
//! A track is picked uniformly at random from the mood's catalog entry and
//! streamed to the attempt directory. Any failure here is reported to the
//! caller, which treats music as optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use rand::prelude::IndexedRandom;
use reel_models::{Mood, MusicCatalog};
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{MediaError, MediaResult};
use crate::stages::MusicSource;

/// Default [`MusicSource`]: random pick from a [`MusicCatalog`], fetched over HTTP.
#[derive(Debug, Clone)]
pub struct AudioSelector {
    client: Client,
    catalog: MusicCatalog,
}

impl AudioSelector {
    /// Create a selector whose downloads give up after `timeout`.
    pub fn new(catalog: MusicCatalog, timeout: Duration) -> MediaResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MediaError::download_failed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, catalog })
    }

    pub fn catalog(&self) -> &MusicCatalog {
        &self.catalog
    }

    /// Uniform random choice among the mood's tracks.
    pub fn pick(&self, mood: Mood) -> Option<&Url> {
        self.catalog.tracks(mood).choose(&mut rand::rng())
    }

    async fn download(&self, url: &Url, dest: &Path) -> MediaResult<u64> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| MediaError::download_failed(format!("{}: {}", url, e)))?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| MediaError::download_failed(format!("{}: {}", url, e)))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        if written == 0 {
            return Err(MediaError::download_failed(format!("{}: empty response body", url)));
        }

        Ok(written)
    }
}

#[async_trait]
impl MusicSource for AudioSelector {
    async fn fetch(&self, mood: Mood, dest: &Path) -> MediaResult<PathBuf> {
        let url = self
            .pick(mood)
            .ok_or_else(|| MediaError::download_failed(format!("No tracks for mood {}", mood)))?;

        debug!(mood = %mood, url = %url, "Fetching background track");

        match self.download(url, dest).await {
            Ok(bytes) => {
                info!(mood = %mood, url = %url, bytes, "Downloaded background track");
                Ok(dest.to_path_buf())
            }
            Err(e) => {
                warn!(mood = %mood, url = %url, error = %e, "Background track download failed");
                let _ = tokio::fs::remove_file(dest).await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_pick_is_member_of_mood_catalog() {
        let selector = AudioSelector::new(MusicCatalog::default(), Duration::from_secs(5)).unwrap();
        for mood in Mood::ALL {
            let tracks = selector.catalog().tracks(*mood);
            for _ in 0..10 {
                let picked = selector.pick(*mood).unwrap();
                assert!(tracks.contains(picked));
            }
        }
    }

    #[test]
    fn test_pick_empty_catalog_entry() {
        let catalog = MusicCatalog::default()
            .with_tracks(Mood::Calm, Vec::new())
            .with_tracks(Mood::default(), Vec::new());
        let selector = AudioSelector::new(catalog, Duration::from_secs(5)).unwrap();
        assert!(selector.pick(Mood::Calm).is_none());
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_fails_cleanly() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("music.mp3");
        let catalog = MusicCatalog::from_base_url("http://127.0.0.1:1/music/").unwrap();
        let selector = AudioSelector::new(catalog, Duration::from_secs(2)).unwrap();

        let err = selector.fetch(Mood::Upbeat, &dest).await.unwrap_err();
        assert!(matches!(err, MediaError::DownloadFailed { .. }));
        assert!(!dest.exists());
    }
}
