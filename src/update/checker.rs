use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::utils::validation::validate_filename;

use super::download::{download_asset, DownloadOutcome};
use super::metadata::{parse_release, Asset, UpdateInfo};
use super::platform::{select_asset, Platform};
use super::transport::{HttpTransport, Transport};
use super::version::Version;
use super::UpdateError;

/// Bound on the whole metadata request
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(15);

/// Longest pause allowed between two chunks of a download
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for one update checker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateConfig {
    /// Metadata URL: a static manifest or a release-listing API
    pub endpoint: String,
    /// Version of the running application
    pub current_version: String,
    /// Platform whose asset is selected; `None` means the build platform
    pub platform: Option<Platform>,
    pub metadata_timeout: Duration,
    pub read_timeout: Duration,
    pub connect_timeout: Duration,
    /// Honor `HTTP_PROXY`/`HTTPS_PROXY`/`NO_PROXY` from the environment
    pub system_proxy: bool,
}

impl UpdateConfig {
    /// Defaults for everything but the endpoint, comparing against this
    /// crate's version
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            current_version: env!("CARGO_PKG_VERSION").to_string(),
            platform: None,
            metadata_timeout: DEFAULT_METADATA_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            system_proxy: true,
        }
    }

    #[must_use]
    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = version.into();
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    #[must_use]
    pub fn with_system_proxy(mut self, enabled: bool) -> Self {
        self.system_proxy = enabled;
        self
    }

    #[must_use]
    pub fn with_timeouts(mut self, metadata: Duration, read: Duration) -> Self {
        self.metadata_timeout = metadata;
        self.read_timeout = read;
        self
    }
}

/// Result of a check that did not fail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckOutcome {
    Available(UpdateInfo),
    UpToDate { current: String, remote: String },
    Cancelled,
}

/// Talks to the update endpoint. Holds no state between calls.
#[derive(Clone)]
pub struct UpdateChecker {
    config: UpdateConfig,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for UpdateChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateChecker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl UpdateChecker {
    /// Checker using HTTP(S)
    ///
    /// # Errors
    ///
    /// Returns `UpdateError::Check` if the HTTP client cannot be built.
    pub fn new(config: UpdateConfig) -> Result<Self, UpdateError> {
        let transport = if config.system_proxy {
            HttpTransport::new(config.connect_timeout)
        } else {
            HttpTransport::direct(config.connect_timeout)
        }
        .map_err(UpdateError::Check)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: UpdateConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    #[must_use]
    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    /// Fetch release metadata and decide whether it is newer than the
    /// running version.
    ///
    /// # Errors
    ///
    /// - `UpdateError::Check` / `Metadata` / `Version` when the endpoint
    ///   cannot be reached or its answer cannot be understood
    /// - `UpdateError::Timeout` when the request exceeds the metadata timeout
    /// - `UpdateError::NoMatchingAsset` when a newer release has nothing for
    ///   this platform
    pub async fn check_for_update(
        &self,
        cancel: &CancellationToken,
    ) -> Result<CheckOutcome, UpdateError> {
        // Fail on a bad local version before touching the network
        let current = Version::parse(&self.config.current_version)?;

        if cancel.is_cancelled() {
            return Ok(CheckOutcome::Cancelled);
        }

        debug!("Checking {} for updates", self.config.endpoint);
        let body = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(CheckOutcome::Cancelled),
            fetched = tokio::time::timeout(
                self.config.metadata_timeout,
                self.transport.get(&self.config.endpoint),
            ) => fetched
                .map_err(|_| UpdateError::Timeout {
                    operation: format!("update check against {}", self.config.endpoint),
                    after: self.config.metadata_timeout,
                })?
                .map_err(|e| UpdateError::from_transport("update check", e, UpdateError::Check))?,
        };

        if cancel.is_cancelled() {
            return Ok(CheckOutcome::Cancelled);
        }

        let release = parse_release(&body)?;
        let remote = Version::parse(&release.version)?;
        if remote <= current {
            info!("Up to date ({} is the latest release)", release.version);
            return Ok(CheckOutcome::UpToDate {
                current: self.config.current_version.clone(),
                remote: release.version,
            });
        }

        let platform = self.platform()?;
        let asset = select_asset(&release.assets, platform)?.clone();
        info!(
            "Update available: {} -> {} ({})",
            self.config.current_version, release.version, asset.name
        );
        Ok(CheckOutcome::Available(release.into_update_info(asset)))
    }

    /// Stream `asset` to `dest`, see [`download_asset`].
    ///
    /// # Errors
    ///
    /// Returns `UpdateError::Download` or `UpdateError::Timeout`; `dest` is
    /// never left holding a partial file.
    pub async fn download<F>(
        &self,
        asset: &Asset,
        dest: &Path,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> Result<DownloadOutcome, UpdateError>
    where
        F: FnMut(u64, Option<u64>) + Send,
    {
        download_asset(
            self.transport.as_ref(),
            asset,
            dest,
            self.config.read_timeout,
            cancel,
            on_progress,
        )
        .await
    }

    fn platform(&self) -> Result<Platform, UpdateError> {
        self.config
            .platform
            .or_else(Platform::current)
            .ok_or_else(|| UpdateError::UnsupportedPlatform(std::env::consts::OS.to_string()))
    }
}

/// Where an asset lands inside `dir`, using its published name.
///
/// # Errors
///
/// Returns `UpdateError::InvalidAssetName` if the name could escape `dir`
/// or is otherwise not a plain file name.
pub fn asset_destination(dir: &Path, asset: &Asset) -> Result<PathBuf, UpdateError> {
    let name = validate_filename(&asset.name).map_err(UpdateError::InvalidAssetName)?;
    Ok(dir.join(name))
}

/// Where an update session stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    Checking,
    UpdateAvailable(UpdateInfo),
    UpToDate { remote: String },
    CheckFailed(String),
    Downloading { asset: String },
    DownloadComplete { path: PathBuf, bytes: u64 },
    DownloadFailed(String),
    Cancelled,
}

impl UpdateState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Checking => "checking",
            Self::UpdateAvailable(_) => "update available",
            Self::UpToDate { .. } => "up to date",
            Self::CheckFailed(_) => "check failed",
            Self::Downloading { .. } => "downloading",
            Self::DownloadComplete { .. } => "download complete",
            Self::DownloadFailed(_) => "download failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// No further transition is possible from this state
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::UpToDate { .. }
                | Self::CheckFailed(_)
                | Self::DownloadComplete { .. }
                | Self::DownloadFailed(_)
                | Self::Cancelled
        )
    }
}

/// One check, optionally followed by one download.
///
/// `Idle -> Checking -> {UpdateAvailable | UpToDate | CheckFailed | Cancelled}`,
/// then `UpdateAvailable -> Downloading -> {DownloadComplete | DownloadFailed | Cancelled}`.
/// A new check needs a new session.
#[derive(Debug)]
pub struct UpdateSession<'a> {
    checker: &'a UpdateChecker,
    state: UpdateState,
}

impl<'a> UpdateSession<'a> {
    #[must_use]
    pub fn new(checker: &'a UpdateChecker) -> Self {
        Self {
            checker,
            state: UpdateState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> &UpdateState {
        &self.state
    }

    fn transition(&mut self, next: UpdateState) {
        debug!("Update session: {} -> {}", self.state.name(), next.name());
        self.state = next;
    }

    /// Run the check.
    ///
    /// # Errors
    ///
    /// Returns `UpdateError::InvalidState` unless the session is idle, and
    /// otherwise the errors of [`UpdateChecker::check_for_update`] (after
    /// moving to `CheckFailed`).
    pub async fn check(&mut self, cancel: &CancellationToken) -> Result<CheckOutcome, UpdateError> {
        if self.state != UpdateState::Idle {
            return Err(UpdateError::InvalidState {
                action: "check for updates",
                state: self.state.name(),
            });
        }
        self.transition(UpdateState::Checking);

        match self.checker.check_for_update(cancel).await {
            Ok(outcome) => {
                let next = match &outcome {
                    CheckOutcome::Available(info) => UpdateState::UpdateAvailable(info.clone()),
                    CheckOutcome::UpToDate { remote, .. } => UpdateState::UpToDate {
                        remote: remote.clone(),
                    },
                    CheckOutcome::Cancelled => UpdateState::Cancelled,
                };
                self.transition(next);
                Ok(outcome)
            }
            Err(e) => {
                self.transition(UpdateState::CheckFailed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Download the asset found by [`UpdateSession::check`] into `dir`.
    ///
    /// # Errors
    ///
    /// Returns `UpdateError::InvalidState` unless an update is available,
    /// and otherwise the errors of [`UpdateChecker::download`] (after moving
    /// to `DownloadFailed`).
    pub async fn download<F>(
        &mut self,
        dir: &Path,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> Result<DownloadOutcome, UpdateError>
    where
        F: FnMut(u64, Option<u64>) + Send,
    {
        let UpdateState::UpdateAvailable(info) = &self.state else {
            return Err(UpdateError::InvalidState {
                action: "download an update",
                state: self.state.name(),
            });
        };
        let asset = info.asset.clone();

        let dest = match asset_destination(dir, &asset) {
            Ok(dest) => dest,
            Err(e) => {
                self.transition(UpdateState::DownloadFailed(e.to_string()));
                return Err(e);
            }
        };

        self.transition(UpdateState::Downloading {
            asset: asset.name.clone(),
        });
        match self.checker.download(&asset, &dest, cancel, on_progress).await {
            Ok(outcome) => {
                let next = match &outcome {
                    DownloadOutcome::Complete { path, bytes } => UpdateState::DownloadComplete {
                        path: path.clone(),
                        bytes: *bytes,
                    },
                    DownloadOutcome::Cancelled => UpdateState::Cancelled,
                };
                self.transition(next);
                Ok(outcome)
            }
            Err(e) => {
                self.transition(UpdateState::DownloadFailed(e.to_string()));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::transport::{ByteStream, TransportError};
    use async_trait::async_trait;

    /// Answers every GET with the same body
    struct StaticTransport {
        body: Result<Vec<u8>, u16>,
    }

    struct OneChunk(Option<Vec<u8>>);

    #[async_trait]
    impl ByteStream for OneChunk {
        fn content_length(&self) -> Option<u64> {
            self.0.as_ref().map(|c| c.len() as u64)
        }

        async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
            Ok(self.0.take())
        }
    }

    #[async_trait]
    impl Transport for StaticTransport {
        async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
            self.body.clone().map_err(|status| TransportError::Status {
                url: url.to_string(),
                status,
            })
        }

        async fn stream(&self, _url: &str) -> Result<Box<dyn ByteStream>, TransportError> {
            Ok(Box::new(OneChunk(Some(b"artifact".to_vec()))))
        }
    }

    /// Never answers
    struct SilentTransport;

    #[async_trait]
    impl Transport for SilentTransport {
        async fn get(&self, _url: &str) -> Result<Vec<u8>, TransportError> {
            std::future::pending().await
        }

        async fn stream(&self, _url: &str) -> Result<Box<dyn ByteStream>, TransportError> {
            std::future::pending().await
        }
    }

    /// Fails every request with a client-side timeout
    struct TimingOutTransport;

    #[async_trait]
    impl Transport for TimingOutTransport {
        async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
            Err(TransportError::Timeout {
                url: url.to_string(),
                after: DEFAULT_CONNECT_TIMEOUT,
            })
        }

        async fn stream(&self, url: &str) -> Result<Box<dyn ByteStream>, TransportError> {
            Err(TransportError::Timeout {
                url: url.to_string(),
                after: DEFAULT_CONNECT_TIMEOUT,
            })
        }
    }

    const MANIFEST: &str = r#"{
        "version": "v1.4.0",
        "release_notes": "Faster search",
        "assets": [
            {"name": "tool-shelf-win.zip", "url": "https://dl.example/win.zip"},
            {"name": "tool-shelf-linux.tar.gz", "url": "https://dl.example/linux.tar.gz", "size": 8}
        ]
    }"#;

    fn checker(body: Result<&str, u16>, current: &str, platform: Platform) -> UpdateChecker {
        let config = UpdateConfig::new("https://updates.example/latest.json")
            .with_current_version(current)
            .with_platform(platform);
        UpdateChecker::with_transport(
            config,
            Arc::new(StaticTransport {
                body: body.map(|b| b.as_bytes().to_vec()),
            }),
        )
    }

    #[tokio::test]
    async fn test_update_available_selects_platform_asset() {
        let checker = checker(Ok(MANIFEST), "1.3.2", Platform::Linux);
        let outcome = checker
            .check_for_update(&CancellationToken::new())
            .await
            .unwrap();
        let CheckOutcome::Available(info) = outcome else {
            panic!("expected an update, got {outcome:?}");
        };
        assert_eq!(info.version, "v1.4.0");
        assert_eq!(info.release_notes, "Faster search");
        assert_eq!(info.asset.name, "tool-shelf-linux.tar.gz");
        assert_eq!(info.asset.size_bytes, Some(8));
    }

    #[tokio::test]
    async fn test_same_version_is_up_to_date() {
        let checker = checker(Ok(MANIFEST), "1.4.0", Platform::Linux);
        let outcome = checker
            .check_for_update(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            CheckOutcome::UpToDate {
                current: "1.4.0".to_string(),
                remote: "v1.4.0".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_newer_release_without_platform_asset_fails() {
        let checker = checker(Ok(MANIFEST), "1.0", Platform::MacOs);
        let err = checker
            .check_for_update(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UpdateError::NoMatchingAsset {
                platform: Platform::MacOs,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_check_errors_are_typed() {
        let err = checker(Err(503), "1.0", Platform::Linux)
            .check_for_update(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UpdateError::Check(TransportError::Status { status: 503, .. })
        ));

        let err = checker(Ok(r#"{"version": "one", "assets": []}"#), "1.0", Platform::Linux)
            .check_for_update(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::Version(_)));

        let err = checker(Ok("not json"), "1.0", Platform::Linux)
            .check_for_update(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::Metadata(_)));
    }

    #[tokio::test]
    async fn test_cancel_before_request() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = checker(Ok(MANIFEST), "1.0", Platform::Linux)
            .check_for_update(&cancel)
            .await
            .unwrap();
        assert_eq!(outcome, CheckOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_metadata_timeout() {
        let limit = Duration::from_millis(50);
        let config = UpdateConfig::new("https://updates.example/latest.json")
            .with_timeouts(limit, limit);
        let checker = UpdateChecker::with_transport(config, Arc::new(SilentTransport));
        let err = checker
            .check_for_update(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::Timeout { after, .. } if after == limit));
    }

    #[tokio::test]
    async fn test_transport_timeouts_surface_as_timeout() {
        let checker = UpdateChecker::with_transport(
            UpdateConfig::new("https://updates.example/latest.json"),
            Arc::new(TimingOutTransport),
        );
        let cancel = CancellationToken::new();

        let err = checker.check_for_update(&cancel).await.unwrap_err();
        assert!(matches!(
            err,
            UpdateError::Timeout { after, .. } if after == DEFAULT_CONNECT_TIMEOUT
        ));

        let asset = Asset {
            name: "tool-shelf-linux.tar.gz".to_string(),
            download_url: "https://dl.example/linux.tar.gz".to_string(),
            size_bytes: None,
            digest: None,
        };
        let dir = tempfile::tempdir().unwrap();
        let err = checker
            .download(&asset, &dir.path().join(&asset.name), &cancel, |_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::Timeout { .. }));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_session_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let checker = checker(Ok(MANIFEST), "1.0", Platform::Linux);
        let mut session = UpdateSession::new(&checker);
        let cancel = CancellationToken::new();

        // Nothing to download yet
        let err = session.download(dir.path(), &cancel, |_, _| {}).await.unwrap_err();
        assert!(matches!(err, UpdateError::InvalidState { state: "idle", .. }));

        session.check(&cancel).await.unwrap();
        assert!(matches!(session.state(), UpdateState::UpdateAvailable(_)));

        let outcome = session.download(dir.path(), &cancel, |_, _| {}).await.unwrap();
        let expected = dir.path().join("tool-shelf-linux.tar.gz");
        assert_eq!(
            outcome,
            DownloadOutcome::Complete {
                path: expected.clone(),
                bytes: 8
            }
        );
        assert_eq!(std::fs::read(&expected).unwrap(), b"artifact");
        assert!(session.state().is_terminal());

        // Terminal: a second check needs a new session
        assert!(matches!(
            session.check(&cancel).await,
            Err(UpdateError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_session_records_check_failure() {
        let checker = checker(Err(404), "1.0", Platform::Linux);
        let mut session = UpdateSession::new(&checker);
        assert!(session.check(&CancellationToken::new()).await.is_err());
        assert!(matches!(session.state(), UpdateState::CheckFailed(_)));
    }

    #[test]
    fn test_asset_destination_rejects_traversal() {
        let asset = Asset {
            name: "../evil.sh".to_string(),
            download_url: "https://dl.example/evil".to_string(),
            size_bytes: None,
            digest: None,
        };
        assert!(matches!(
            asset_destination(Path::new("/tmp"), &asset),
            Err(UpdateError::InvalidAssetName(_))
        ));
    }
}
