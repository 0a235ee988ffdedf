//! Async download with streaming SHA256 verification.
//!
//! Bytes are written to a `.part` file while the hasher runs over the same
//! chunks. The file only gets its final name once the digest matches.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::{Client, StatusCode, Url};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::Reporter;
use crate::config::RetryPolicy;
use tapbin_schema::{PackageName, ReleaseEntry, Sha256Digest, Version};

/// Errors from fetching and verifying an artifact.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Transport-level failure (connect, TLS, timeout, body).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// Status received.
        status: StatusCode,
    },

    /// Local filesystem failure while writing the download.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The downloaded bytes do not hash to the expected digest.
    #[error("Checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Requested URL.
        url: String,
        /// Digest recorded in the formula.
        expected: Sha256Digest,
        /// Digest of the bytes received.
        actual: Sha256Digest,
    },
}

impl DownloadError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_body(),
            Self::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Io(_) | Self::ChecksumMismatch { .. } => false,
        }
    }
}

/// An artifact on disk whose bytes match the formula's checksum.
#[derive(Debug, Clone)]
pub struct VerifiedArtifact {
    /// Location of the verified file.
    pub path: PathBuf,
    /// Digest of its content (equal to the expected one).
    pub sha256: Sha256Digest,
    /// Size in bytes.
    pub size: u64,
    /// File name taken from the URL path; decides how it is unpacked.
    pub asset: String,
}

/// File name of the artifact behind `url`.
///
/// The last non-empty path segment, so query strings and fragments never
/// reach format detection. `None` for unparseable URLs or a bare host.
pub fn asset_name(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let last = url.path_segments()?.rfind(|segment| !segment.is_empty())?;
    Some(last.to_string())
}

/// Request for a download operation
pub struct DownloadRequest<'a, R: Reporter + ?Sized> {
    /// HTTP client to use.
    pub client: &'a Client,
    /// Package name, for progress reporting.
    pub pkg_name: &'a PackageName,
    /// Package version, for progress reporting.
    pub version: &'a Version,
    /// Entry to fetch.
    pub entry: &'a ReleaseEntry,
    /// Directory the artifact is written into.
    pub dest_dir: &'a Path,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
    /// Progress sink.
    pub reporter: &'a R,
}

impl<R: Reporter + ?Sized> std::fmt::Debug for DownloadRequest<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadRequest")
            .field("url", &self.entry.url)
            .field("dest_dir", &self.dest_dir)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl<R: Reporter + ?Sized> DownloadRequest<'_, R> {
    /// Execute the download with retries.
    ///
    /// # Errors
    ///
    /// See [`fetch_and_verify`].
    pub async fn execute(self) -> Result<VerifiedArtifact, DownloadError> {
        fetch_and_verify(&self).await
    }
}

/// Download `req.entry` and verify it against its recorded checksum.
///
/// Transient failures are retried per `req.retry`. A checksum mismatch is
/// final: the partial file is removed and the error returned immediately.
///
/// # Errors
///
/// [`DownloadError::ChecksumMismatch`] when the digest differs, otherwise
/// the transport, status or IO error of the last attempt.
pub async fn fetch_and_verify<R: Reporter + ?Sized>(
    req: &DownloadRequest<'_, R>,
) -> Result<VerifiedArtifact, DownloadError> {
    let attempts = req.retry.attempts();
    let mut attempt = 1;

    loop {
        match download_once(req).await {
            Ok(artifact) => return Ok(artifact),
            Err(e) if e.is_transient() && attempt < attempts => {
                let delay = req.retry.backoff_for(attempt);
                warn!(
                    url = %req.entry.url,
                    attempt,
                    ?delay,
                    error = %e,
                    "download failed, retrying"
                );
                req.reporter.warning(&format!(
                    "download attempt {attempt}/{attempts} failed ({e}), retrying"
                ));
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                let reason = match &e {
                    DownloadError::ChecksumMismatch { .. } => "checksum mismatch".to_string(),
                    other => other.to_string(),
                };
                req.reporter.failed(req.pkg_name, req.version, &reason);
                return Err(e);
            }
        }
    }
}

async fn download_once<R: Reporter + ?Sized>(
    req: &DownloadRequest<'_, R>,
) -> Result<VerifiedArtifact, DownloadError> {
    let url = req.entry.url.as_str();
    let asset = asset_name(url).unwrap_or_else(|| "artifact".to_string());
    let dest = req.dest_dir.join(&asset);
    let part = req.dest_dir.join(format!("{asset}.part"));

    debug!(%url, dest = %dest.display(), "starting download");

    let response = req.client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status,
        });
    }

    let total_size = response.content_length();
    req.reporter
        .downloading(req.pkg_name, req.version, 0, total_size);

    let result = stream_to_file(req, response, &part, total_size).await;
    let (actual, downloaded) = match result {
        Ok(done) => done,
        Err(e) => {
            tokio::fs::remove_file(&part).await.ok();
            return Err(e);
        }
    };

    if actual != req.entry.sha256 {
        tokio::fs::remove_file(&part).await.ok();
        return Err(DownloadError::ChecksumMismatch {
            url: url.to_string(),
            expected: req.entry.sha256.clone(),
            actual,
        });
    }

    tokio::fs::rename(&part, &dest).await?;
    debug!(%url, sha256 = %actual, bytes = downloaded, "download verified");

    Ok(VerifiedArtifact {
        path: dest,
        sha256: actual,
        size: downloaded,
        asset,
    })
}

async fn stream_to_file<R: Reporter + ?Sized>(
    req: &DownloadRequest<'_, R>,
    response: reqwest::Response,
    part: &Path,
    total_size: Option<u64>,
) -> Result<(Sha256Digest, u64), DownloadError> {
    let mut file = File::create(part).await?;
    let mut stream = response.bytes_stream();
    let mut hasher = Sha256::new();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
        downloaded += chunk.len() as u64;
        req.reporter
            .downloading(req.pkg_name, req.version, downloaded, total_size);
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok((Sha256Digest::from_hasher(hasher), downloaded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullReporter;
    use mockito::Server;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tapbin_schema::{CpuArch, Os};

    fn entry_for(url: String, body: &[u8]) -> ReleaseEntry {
        ReleaseEntry {
            os: Os::Linux,
            arch: CpuArch::Intel,
            bits: None,
            url,
            sha256: Sha256Digest::compute(body),
        }
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
        }
    }

    async fn fetch(
        entry: &ReleaseEntry,
        dest_dir: &Path,
        retry: RetryPolicy,
    ) -> Result<VerifiedArtifact, DownloadError> {
        let client = Client::new();
        let name = PackageName::new("demo");
        let version = Version::new("1.0.0");
        DownloadRequest {
            client: &client,
            pkg_name: &name,
            version: &version,
            entry,
            dest_dir,
            retry,
            reporter: &NullReporter,
        }
        .execute()
        .await
    }

    #[tokio::test]
    async fn matching_digest_keeps_bytes_intact() {
        let mut server = Server::new_async().await;
        let body: Vec<u8> = (0..=255u8).cycle().take(200_000).collect();
        let _m = server
            .mock("GET", "/demo_1.0.0_Linux_x86_64.tar.gz")
            .with_status(200)
            .with_body(&body)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let entry = entry_for(
            format!("{}/demo_1.0.0_Linux_x86_64.tar.gz", server.url()),
            &body,
        );

        let artifact = fetch(&entry, dir.path(), RetryPolicy::none()).await.unwrap();
        assert_eq!(artifact.size, body.len() as u64);
        assert_eq!(artifact.sha256, entry.sha256);
        assert_eq!(artifact.asset, "demo_1.0.0_Linux_x86_64.tar.gz");
        assert_eq!(std::fs::read(&artifact.path).unwrap(), body);
        assert!(!dir.path().join("demo_1.0.0_Linux_x86_64.tar.gz.part").exists());
    }

    #[tokio::test]
    async fn mismatched_digest_fails_for_any_size() {
        let mut server = Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();

        for size in [0usize, 1, 4096, 300_000] {
            let body = vec![7u8; size];
            let path = format!("/blob-{size}");
            let m = server
                .mock("GET", path.as_str())
                .with_status(200)
                .with_body(&body)
                .expect(1)
                .create_async()
                .await;

            let mut entry = entry_for(format!("{}{path}", server.url()), &body);
            entry.sha256 = Sha256Digest::compute(b"something else entirely");

            let err = fetch(&entry, dir.path(), fast_retry(3)).await.unwrap_err();
            assert!(
                matches!(err, DownloadError::ChecksumMismatch { .. }),
                "size {size}: {err}"
            );
            // Never retried, never left behind.
            m.assert_async().await;
            assert!(!dir.path().join(format!("blob-{size}")).exists());
            assert!(!dir.path().join(format!("blob-{size}.part")).exists());
        }
    }

    #[tokio::test]
    async fn server_errors_are_retried_up_to_the_policy() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/flaky.tar.gz")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let entry = entry_for(format!("{}/flaky.tar.gz", server.url()), b"x");
        let err = fetch(&entry, dir.path(), fast_retry(3)).await.unwrap_err();

        assert!(matches!(
            err,
            DownloadError::Status { status, .. } if status == StatusCode::SERVICE_UNAVAILABLE
        ));
        m.assert_async().await;
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/missing.tar.gz")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let entry = entry_for(format!("{}/missing.tar.gz", server.url()), b"x");
        let err = fetch(&entry, dir.path(), fast_retry(5)).await.unwrap_err();

        assert!(!err.is_transient());
        assert!(err.to_string().contains("404"));
        m.assert_async().await;
    }

    #[test]
    fn asset_name_ignores_query_and_fragment() {
        assert_eq!(
            asset_name("https://host/dl/tool.tar.gz?dl=1#top").as_deref(),
            Some("tool.tar.gz")
        );
        assert_eq!(
            asset_name("https://host/releases/tool_linux/").as_deref(),
            Some("tool_linux")
        );
        assert_eq!(asset_name("https://host").as_deref(), None);
        assert_eq!(asset_name("not a url"), None);
    }

    #[derive(Default)]
    struct CountingReporter {
        warnings: AtomicUsize,
    }

    impl Reporter for CountingReporter {
        fn section(&self, _: &str) {}
        fn downloading(&self, _: &PackageName, _: &Version, _: u64, _: Option<u64>) {}
        fn verified(&self, _: &PackageName, _: &Version, _: &Sha256Digest) {}
        fn installing(&self, _: &PackageName, _: &Version) {}
        fn done(&self, _: &PackageName, _: &Version, _: &str, _: Option<u64>) {}
        fn failed(&self, _: &PackageName, _: &Version, _: &str) {}
        fn info(&self, _: &str) {}
        fn warning(&self, _: &str) {
            self.warnings.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn connection_refused_is_retried_as_transport_error() {
        // Bind then drop to get a port nothing listens on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let dir = tempfile::tempdir().unwrap();
        let entry = entry_for(format!("http://127.0.0.1:{port}/tool.tar.gz"), b"x");
        let client = Client::new();
        let name = PackageName::new("demo");
        let version = Version::new("1.0.0");
        let reporter = CountingReporter::default();

        let err = DownloadRequest {
            client: &client,
            pkg_name: &name,
            version: &version,
            entry: &entry,
            dest_dir: dir.path(),
            retry: fast_retry(3),
            reporter: &reporter,
        }
        .execute()
        .await
        .unwrap_err();

        assert!(matches!(err, DownloadError::Http(_)), "{err}");
        assert!(err.is_transient());
        // One warning per retried attempt.
        assert_eq!(reporter.warnings.load(Ordering::SeqCst), 2);
        assert!(!dir.path().join("tool.tar.gz.part").exists());
    }
}
