use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::future::join_all;
use log::{debug, warn};
use reqwest::Client;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;

use crate::util::progress_percent;

/// One file the download engine should fetch.
#[derive(Clone, Debug)]
pub struct DownloadJob {
    pub url: String,
    pub dest: PathBuf,
}

/// Streaming download engine with a bounded number of in-flight transfers.
#[derive(Clone)]
pub struct NetworkClient {
    client: Client,
    max_concurrent: usize,
}

impl NetworkClient {
    pub fn new(max_concurrent: usize) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|err| {
                warn!("network client: falling back to default HTTP client configuration ({err})");
                Client::new()
            });
        Self {
            client,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Download every job, at most `max_concurrent` at a time, reporting
    /// overall progress across the batch as a percentage in [0, 100].
    ///
    /// # Errors
    /// Returns the first error string if any transfer fails or ends short.
    pub async fn download_all<F>(&self, jobs: Vec<DownloadJob>, progress: F) -> Result<(), String>
    where
        F: Fn(f32) + Send + Sync,
    {
        if jobs.is_empty() {
            return Ok(());
        }

        // Size the batch up front so progress stays monotonic across files.
        let mut total: u64 = 0;
        for job in &jobs {
            total += self.content_length(&job.url).await?.unwrap_or(0);
        }

        let downloaded = Arc::new(AtomicU64::new(0));
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let progress = &progress;

        let transfers = jobs.iter().map(|job| {
            let downloaded = Arc::clone(&downloaded);
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| "download engine shut down".to_owned())?;
                self.fetch_one(job, move |chunk_len| {
                    let done = downloaded.fetch_add(chunk_len, Ordering::SeqCst) + chunk_len;
                    if total > 0 {
                        progress(progress_percent(done, Some(total)));
                    }
                })
                .await
            }
        });

        for result in join_all(transfers).await {
            result?;
        }
        if total == 0 {
            // Sizes were unknown; report completion at least once.
            progress(100.0);
        }
        Ok(())
    }

    async fn fetch_one<F: FnMut(u64)>(
        &self,
        job: &DownloadJob,
        mut on_chunk: F,
    ) -> Result<(), String> {
        debug!("downloading {} -> {}", job.url, job.dest.display());
        let response = self
            .client
            .get(&job.url)
            .send()
            .await
            .map_err(|e| format!("download request failed: {e}"))?
            .error_for_status()
            .map_err(|e| format!("download status error: {e}"))?;

        if let Some(parent) = job.dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("failed to create download dir: {e}"))?;
        }
        let mut file = File::create(&job.dest)
            .await
            .map_err(|e| format!("failed to create file: {e}"))?;

        let expected = response.content_length();
        let mut stream = response.bytes_stream();
        let mut received: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| format!("stream error: {e}"))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| format!("write error: {e}"))?;
            received += chunk.len() as u64;
            on_chunk(chunk.len() as u64);
        }

        file.flush().await.map_err(|e| format!("flush error: {e}"))?;

        if let Some(expected) = expected
            && received < expected
        {
            return Err(format!(
                "download incomplete: received {received} of {expected} bytes"
            ));
        }

        Ok(())
    }

    async fn content_length(&self, url: &str) -> Result<Option<u64>, String> {
        let resp = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| format!("HEAD {url} failed: {e}"))?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        Ok(resp.content_length())
    }

    /// Fetch the published SHA-256 for a downloaded artifact and compare.
    ///
    /// # Errors
    /// Returns an error string if the listing is unreadable or the digest
    /// does not match.
    pub async fn verify_checksum(&self, artifact: &Path, checksum_url: &str) -> Result<(), String> {
        let listing = self
            .client
            .get(checksum_url)
            .send()
            .await
            .map_err(|e| format!("checksum request failed: {e}"))?
            .text()
            .await
            .map_err(|e| format!("checksum response unreadable: {e}"))?;

        let expected = expected_from_listing(&listing)
            .ok_or_else(|| "published checksum file is empty".to_owned())?;

        let bytes = tokio::fs::read(artifact)
            .await
            .map_err(|e| format!("unable to read downloaded artifact: {e}"))?;
        let actual = sha256_hex(&bytes);

        if actual != expected {
            return Err(format!("checksum mismatch: expected {expected}, got {actual}"));
        }
        debug!("checksum verified for {}", artifact.display());
        Ok(())
    }
}

/// First token of a checksum listing ("<hex>  <filename>" or bare "<hex>").
fn expected_from_listing(listing: &str) -> Option<String> {
    listing
        .split_whitespace()
        .next()
        .map(|token| token.to_lowercase())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
