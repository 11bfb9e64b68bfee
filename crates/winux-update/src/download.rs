//! Streaming asset download with progress tracking
//!
//! The response body is written chunk by chunk to the destination file, so
//! memory use does not grow with the payload. Progress callbacks are rate
//! limited and the transfer can be aborted through a cancellation token.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use winux_core::UpdaterConfig;
//! use winux_update::{CancellationToken, DownloadProgress, Downloader};
//!
//! #[tokio::main]
//! async fn main() -> winux_update::Result<()> {
//!     let downloader = Downloader::new(&UpdaterConfig::default())?;
//!     let cancel = CancellationToken::new();
//!     let bytes = downloader
//!         .download(
//!             "https://example.com/winux.exe",
//!             Path::new("/tmp/winux.exe"),
//!             &mut |p: &DownloadProgress| println!("{}/{}", p.downloaded_bytes, p.total_bytes),
//!             &cancel,
//!         )
//!         .await?;
//!     println!("Downloaded {} bytes", bytes);
//!     Ok(())
//! }
//! ```

use futures_util::StreamExt;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use winux_core::types::UpdaterConfig;

use crate::error::{Result, UpdateError};

/// Download progress information
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    /// Total bytes to download, 0 when the server did not say
    pub total_bytes: u64,

    /// Bytes downloaded so far
    pub downloaded_bytes: u64,

    /// When progress was last handed to the sink
    pub last_emitted: Option<Instant>,
}

impl DownloadProgress {
    /// Create a new progress tracker
    pub fn new(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            downloaded_bytes: 0,
            last_emitted: None,
        }
    }

    /// Record newly received bytes
    pub fn advance(&mut self, bytes: u64) {
        self.downloaded_bytes += bytes;
    }

    /// Progress percentage (0-100), if the total is known
    pub fn percentage(&self) -> Option<f64> {
        (self.total_bytes > 0)
            .then(|| (self.downloaded_bytes as f64 / self.total_bytes as f64) * 100.0)
    }

    /// Check if download is complete
    pub fn is_complete(&self) -> bool {
        self.total_bytes > 0 && self.downloaded_bytes >= self.total_bytes
    }

    /// Whether an emission at `now` respects the rate limit. Records the
    /// emission time when it does.
    pub fn should_emit(&mut self, now: Instant, interval: Duration) -> bool {
        let due = match self.last_emitted {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= interval,
        };
        if due {
            self.last_emitted = Some(now);
        }
        due
    }
}

/// Streams remote assets to local files
pub struct Downloader {
    client: reqwest::Client,
    progress_interval: Duration,
}

impl Downloader {
    /// Create a downloader using the configured download timeout
    pub fn new(config: &UpdaterConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.network.user_agent)
            .timeout(Duration::from_secs(config.network.download_timeout_secs))
            .connect_timeout(Duration::from_secs(config.network.connect_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            progress_interval: Duration::from_millis(config.network.progress_interval_ms),
        })
    }

    /// Download `url` into `dest`, returning the number of bytes written.
    ///
    /// On failure a partial file may remain at `dest`; callers must only
    /// point this at a scratch location.
    pub async fn download(
        &self,
        url: &str,
        dest: &Path,
        on_progress: &mut (dyn FnMut(&DownloadProgress) + Send),
        cancel: &CancellationToken,
    ) -> Result<u64> {
        debug!("Downloading {} -> {:?}", url, dest);

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UpdateError::Cancelled),
            response = self.client.get(url).send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        let mut progress = DownloadProgress::new(response.content_length().unwrap_or(0));
        let mut file = File::create(dest)
            .await
            .map_err(|e| UpdateError::io_with_path("create", dest, e))?;
        let mut stream = response.bytes_stream();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(UpdateError::Cancelled),
                next = stream.next() => next,
            };
            let Some(chunk_result) = next else {
                break;
            };
            let chunk: bytes::Bytes = chunk_result?;
            file.write_all(&chunk)
                .await
                .map_err(|e| UpdateError::io_with_path("write", dest, e))?;

            progress.advance(chunk.len() as u64);
            // The final update is never rate limited
            if progress.is_complete() || progress.should_emit(Instant::now(), self.progress_interval)
            {
                on_progress(&progress);
            }
        }

        file.flush()
            .await
            .map_err(|e| UpdateError::io_with_path("flush", dest, e))?;
        file.sync_all()
            .await
            .map_err(|e| UpdateError::io_with_path("sync", dest, e))?;

        if progress.total_bytes > 0 && progress.downloaded_bytes != progress.total_bytes {
            return Err(UpdateError::SizeMismatch {
                expected: progress.total_bytes,
                actual: progress.downloaded_bytes,
            });
        }

        debug!(
            "Downloaded {} ({})",
            url,
            human_readable_size(progress.downloaded_bytes)
        );
        Ok(progress.downloaded_bytes)
    }
}

/// Format bytes with binary units and one decimal place
pub fn human_readable_size(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const PREFIXES: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT && exp < PREFIXES.len() - 1 {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    format!("{:.1} {}B", bytes as f64 / div as f64, PREFIXES[exp])
}
