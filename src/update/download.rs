//! Streaming an update artifact to disk.
//!
//! The body is written to a uniquely named temporary file next to the
//! destination and only renamed into place once every chunk has arrived
//! and the declared size and digest check out. Any error or cancellation
//! drops the temporary file, so the destination never holds a partial
//! artifact.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::utils::validation::{is_valid_hex_digest, MD5_HEX_LEN, SHA256_HEX_LEN};

use super::metadata::Asset;
use super::transport::{Transport, TransportError};
use super::UpdateError;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Size mismatch: expected {expected} bytes, received {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("Digest mismatch: expected {expected}, computed {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("Unsupported digest '{0}' (expected sha256:<hex> or md5:<hex>)")]
    UnsupportedDigest(String),
}

/// How a download ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownloadOutcome {
    Complete { path: PathBuf, bytes: u64 },
    Cancelled,
}

/// Digest an asset declares, as `algorithm:hex`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedDigest {
    Sha256(String),
    Md5(String),
}

impl ExpectedDigest {
    /// # Errors
    ///
    /// Returns `DownloadError::UnsupportedDigest` for unknown algorithms or
    /// malformed hex.
    pub fn parse(spec: &str) -> Result<Self, DownloadError> {
        let unsupported = || DownloadError::UnsupportedDigest(spec.to_string());
        let (algorithm, hex_digest) = spec.trim().split_once(':').ok_or_else(unsupported)?;
        let hex_digest = hex_digest.to_ascii_lowercase();
        match algorithm.to_ascii_lowercase().as_str() {
            "sha256" if is_valid_hex_digest(&hex_digest, SHA256_HEX_LEN) => {
                Ok(Self::Sha256(hex_digest))
            }
            "md5" if is_valid_hex_digest(&hex_digest, MD5_HEX_LEN) => Ok(Self::Md5(hex_digest)),
            _ => Err(unsupported()),
        }
    }

    fn hasher(&self) -> Hasher {
        match self {
            Self::Sha256(_) => Hasher::Sha256(Sha256::new()),
            Self::Md5(_) => Hasher::Md5(md5::Context::new()),
        }
    }

    fn hex(&self) -> &str {
        match self {
            Self::Sha256(hex) | Self::Md5(hex) => hex,
        }
    }
}

impl std::fmt::Display for ExpectedDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sha256(hex) => write!(f, "sha256:{hex}"),
            Self::Md5(hex) => write!(f, "md5:{hex}"),
        }
    }
}

enum Hasher {
    Sha256(Sha256),
    Md5(md5::Context),
}

impl Hasher {
    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Md5(ctx) => ctx.consume(data),
        }
    }

    fn finish(self) -> String {
        match self {
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Md5(ctx) => format!("{:x}", ctx.compute()),
        }
    }
}

/// Stream `asset` to `dest`, reporting `(bytes_done, total)` as chunks
/// arrive. `total` is `None` when neither the asset nor the server
/// announces a length.
///
/// # Errors
///
/// Returns `UpdateError::Download` for transport, I/O, size and digest
/// failures and `UpdateError::Timeout` when the server goes quiet for
/// longer than `read_timeout`. The destination is untouched in every
/// error case.
pub async fn download_asset<F>(
    transport: &dyn Transport,
    asset: &Asset,
    dest: &Path,
    read_timeout: Duration,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> Result<DownloadOutcome, UpdateError>
where
    F: FnMut(u64, Option<u64>) + Send,
{
    let fail = |source: DownloadError| UpdateError::Download {
        asset: asset.name.clone(),
        source,
    };
    let io_fail = |path: &Path, source: io::Error| {
        fail(DownloadError::Io {
            path: path.to_path_buf(),
            source,
        })
    };
    let transport_fail = |e: TransportError| {
        UpdateError::from_transport("download", e, |other| fail(other.into()))
    };
    let timed_out = || UpdateError::Timeout {
        operation: format!("download of {}", asset.name),
        after: read_timeout,
    };

    let expected_digest = asset
        .digest
        .as_deref()
        .map(ExpectedDigest::parse)
        .transpose()
        .map_err(fail)?;
    let mut hasher = expected_digest.as_ref().map(ExpectedDigest::hasher);

    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| io_fail(dir, e))?;

    // Deleted on drop unless persisted
    let (file, temp_path) = tempfile::Builder::new()
        .prefix(".download-")
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(|e| io_fail(dir, e))?
        .into_parts();
    let mut file = tokio::fs::File::from_std(file);

    if cancel.is_cancelled() {
        return Ok(DownloadOutcome::Cancelled);
    }

    info!("Downloading {} from {}", asset.name, asset.download_url);
    let mut stream = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(DownloadOutcome::Cancelled),
        opened = tokio::time::timeout(read_timeout, transport.stream(&asset.download_url)) => {
            opened.map_err(|_| timed_out())?.map_err(transport_fail)?
        }
    };

    let announced = stream.content_length();
    let total = asset.size_bytes.or(announced);
    let mut done: u64 = 0;
    on_progress(done, total);

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Download of {} cancelled after {} bytes", asset.name, done);
                return Ok(DownloadOutcome::Cancelled);
            }
            next = tokio::time::timeout(read_timeout, stream.next_chunk()) => next,
        };
        let Some(chunk) = next.map_err(|_| timed_out())?.map_err(transport_fail)? else {
            break;
        };

        if let Some(hasher) = hasher.as_mut() {
            hasher.update(&chunk);
        }
        file.write_all(&chunk)
            .await
            .map_err(|e| io_fail(&temp_path, e))?;
        done += chunk.len() as u64;
        on_progress(done, total);
    }

    file.flush().await.map_err(|e| io_fail(&temp_path, e))?;
    file.sync_all().await.map_err(|e| io_fail(&temp_path, e))?;
    drop(file);

    for expected in [asset.size_bytes, announced].into_iter().flatten() {
        if expected != done {
            return Err(fail(DownloadError::SizeMismatch {
                expected,
                actual: done,
            }));
        }
    }

    if let (Some(expected), Some(hasher)) = (expected_digest, hasher) {
        let actual = hasher.finish();
        if actual != expected.hex() {
            return Err(fail(DownloadError::DigestMismatch {
                expected: expected.to_string(),
                actual,
            }));
        }
        debug!("Verified digest {}", expected);
    }

    temp_path
        .persist(dest)
        .map_err(|e| io_fail(dest, e.error))?;
    info!("Saved {} ({} bytes) to {}", asset.name, done, dest.display());

    Ok(DownloadOutcome::Complete {
        path: dest.to_path_buf(),
        bytes: done,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::transport::ByteStream;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Serves a fixed list of chunks, optionally failing after them
    struct ChunkTransport {
        chunks: Vec<Vec<u8>>,
        content_length: Option<u64>,
        fail_at_end: bool,
    }

    struct ChunkStream {
        chunks: VecDeque<Vec<u8>>,
        content_length: Option<u64>,
        fail_at_end: bool,
    }

    #[async_trait]
    impl Transport for ChunkTransport {
        async fn get(&self, _url: &str) -> Result<Vec<u8>, TransportError> {
            Ok(self.chunks.concat())
        }

        async fn stream(&self, _url: &str) -> Result<Box<dyn ByteStream>, TransportError> {
            Ok(Box::new(ChunkStream {
                chunks: self.chunks.clone().into(),
                content_length: self.content_length,
                fail_at_end: self.fail_at_end,
            }))
        }
    }

    #[async_trait]
    impl ByteStream for ChunkStream {
        fn content_length(&self) -> Option<u64> {
            self.content_length
        }

        async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
            match self.chunks.pop_front() {
                Some(chunk) => Ok(Some(chunk)),
                None if self.fail_at_end => Err(TransportError::Interrupted {
                    url: "test://asset".to_string(),
                    message: "connection reset".to_string(),
                }),
                None => Ok(None),
            }
        }
    }

    fn asset(size: Option<u64>, digest: Option<String>) -> Asset {
        Asset {
            name: "tool-shelf-linux.tar.gz".to_string(),
            download_url: "test://asset".to_string(),
            size_bytes: size,
            digest,
        }
    }

    fn transport(chunks: &[&[u8]]) -> ChunkTransport {
        ChunkTransport {
            chunks: chunks.iter().map(|c| c.to_vec()).collect(),
            content_length: None,
            fail_at_end: false,
        }
    }

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_download_reports_progress_and_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested/out/tool-shelf.tar.gz");
        let progress = Mutex::new(Vec::new());

        let outcome = download_asset(
            &transport(&[b"hello ", b"world"]),
            &asset(Some(11), None),
            &dest,
            Duration::from_secs(5),
            &CancellationToken::new(),
            |done, total| progress.lock().unwrap().push((done, total)),
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            DownloadOutcome::Complete {
                path: dest.clone(),
                bytes: 11
            }
        );
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");
        assert_eq!(
            *progress.lock().unwrap(),
            [(0, Some(11)), (6, Some(11)), (11, Some(11))]
        );
    }

    #[tokio::test]
    async fn test_unknown_total_is_reported_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut totals = Vec::new();
        download_asset(
            &transport(&[b"abc"]),
            &asset(None, None),
            &dir.path().join("a.bin"),
            Duration::from_secs(5),
            &CancellationToken::new(),
            |_, total| totals.push(total),
        )
        .await
        .unwrap();
        assert!(totals.iter().all(Option::is_none));
    }

    #[tokio::test]
    async fn test_interrupted_stream_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.bin");
        let mut failing = transport(&[b"partial"]);
        failing.fail_at_end = true;

        let err = download_asset(
            &failing,
            &asset(Some(100), None),
            &dest,
            Duration::from_secs(5),
            &CancellationToken::new(),
            |_, _| {},
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            UpdateError::Download {
                source: DownloadError::Transport(TransportError::Interrupted { .. }),
                ..
            }
        ));
        assert!(!dest.exists());
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_short_body_is_a_size_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.bin");
        let err = download_asset(
            &transport(&[b"1234"]),
            &asset(Some(10), None),
            &dest,
            Duration::from_secs(5),
            &CancellationToken::new(),
            |_, _| {},
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            UpdateError::Download {
                source: DownloadError::SizeMismatch {
                    expected: 10,
                    actual: 4
                },
                ..
            }
        ));
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_digest_verification() {
        let dir = tempfile::tempdir().unwrap();
        let good = format!("sha256:{}", hex::encode(Sha256::digest(b"payload")));
        download_asset(
            &transport(&[b"pay", b"load"]),
            &asset(None, Some(good)),
            &dir.path().join("good.bin"),
            Duration::from_secs(5),
            &CancellationToken::new(),
            |_, _| {},
        )
        .await
        .unwrap();

        let md5_good = format!("MD5:{:x}", md5::compute(b"payload"));
        download_asset(
            &transport(&[b"payload"]),
            &asset(None, Some(md5_good)),
            &dir.path().join("md5.bin"),
            Duration::from_secs(5),
            &CancellationToken::new(),
            |_, _| {},
        )
        .await
        .unwrap();

        let bad = format!("sha256:{}", "0".repeat(64));
        let err = download_asset(
            &transport(&[b"payload"]),
            &asset(None, Some(bad)),
            &dir.path().join("bad.bin"),
            Duration::from_secs(5),
            &CancellationToken::new(),
            |_, _| {},
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            UpdateError::Download {
                source: DownloadError::DigestMismatch { .. },
                ..
            }
        ));
        assert!(!dir.path().join("bad.bin").exists());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = download_asset(
            &transport(&[b"data"]),
            &asset(None, None),
            &dir.path().join("a.bin"),
            Duration::from_secs(5),
            &cancel,
            |_, _| {},
        )
        .await
        .unwrap();
        assert_eq!(outcome, DownloadOutcome::Cancelled);
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn test_cancelled_between_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let outcome = download_asset(
            &transport(&[b"one", b"two", b"three"]),
            &asset(None, None),
            &dir.path().join("a.bin"),
            Duration::from_secs(5),
            &cancel,
            |done, _| {
                if done > 0 {
                    cancel.cancel();
                }
            },
        )
        .await
        .unwrap();
        assert_eq!(outcome, DownloadOutcome::Cancelled);
        assert!(dir_is_empty(dir.path()));
    }

    #[test]
    fn test_expected_digest_parse() {
        let sha = format!("sha256:{}", "a".repeat(64));
        assert!(matches!(ExpectedDigest::parse(&sha), Ok(ExpectedDigest::Sha256(_))));
        assert!(ExpectedDigest::parse("sha1:abcd").is_err());
        assert!(ExpectedDigest::parse("sha256:zz").is_err());
        assert!(ExpectedDigest::parse("nodigest").is_err());
    }
}
