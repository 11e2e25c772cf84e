//! Snapshot sources and the live-then-fallback loader.

use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::config::Config;
use crate::error::SourceError;
use crate::logging::{error, info, obj, v_bool, v_num, v_str, warn, Domain};
use crate::model::{Mode, Snapshot};

#[async_trait]
pub trait DataSource: Send + Sync {
    /// Human-readable location, used in logs and errors.
    fn describe(&self) -> String;
    async fn fetch(&self) -> Result<Snapshot, SourceError>;
}

/// `GET` a snapshot over HTTP. Non-2xx is a transport failure.
pub struct HttpSource {
    client: Client,
    url: Url,
}

impl HttpSource {
    pub fn new(url: Url, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            url,
        }
    }
}

#[async_trait]
impl DataSource for HttpSource {
    fn describe(&self) -> String {
        self.url.to_string()
    }

    async fn fetch(&self) -> Result<Snapshot, SourceError> {
        let resp = self
            .client
            .get(self.url.clone())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SourceError::transport(self.describe(), e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::transport(self.describe(), status));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| SourceError::transport(self.describe(), e))?;
        Snapshot::from_json(&body).map_err(|e| SourceError::parse(self.describe(), e))
    }
}

/// Read a snapshot from a JSON file on disk.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DataSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Snapshot, SourceError> {
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SourceError::transport(self.describe(), e))?;
        Snapshot::from_json(&body).map_err(|e| SourceError::parse(self.describe(), e))
    }
}

/// Connectivity indicator plus status text shown in the status region.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivityStatus {
    pub api_online: bool,
    pub text: String,
}

impl ConnectivityStatus {
    pub const CONNECTED: &'static str = "API connected";
    pub const DEMO: &'static str = "Demo mode active";
    pub const DEMO_UNAVAILABLE: &'static str = "Could not load demo data";
    pub const LOADING: &'static str = "Connecting...";

    pub fn loading() -> Self {
        Self {
            api_online: false,
            text: Self::LOADING.to_string(),
        }
    }

    pub fn indicator(&self) -> &'static str {
        if self.api_online {
            "● LIVE"
        } else {
            "● DEMO"
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub snapshot: Snapshot,
    pub mode: Mode,
    pub status: ConnectivityStatus,
    /// Set only when both sources failed.
    pub error: Option<SourceError>,
}

pub struct SnapshotLoader {
    primary: Box<dyn DataSource>,
    fallback: Box<dyn DataSource>,
}

impl SnapshotLoader {
    pub fn new(primary: Box<dyn DataSource>, fallback: Box<dyn DataSource>) -> Self {
        Self { primary, fallback }
    }

    pub fn from_config(cfg: &Config) -> Result<Self, SourceError> {
        let live = Url::parse(&cfg.live_url).map_err(|e| SourceError::transport(cfg.live_url.clone(), e))?;
        let primary = Box::new(HttpSource::new(live.clone(), cfg.fetch_timeout()));
        let fallback = fallback_source(&live, &cfg.fallback, cfg.fetch_timeout())?;
        Ok(Self::new(primary, fallback))
    }

    /// Live first, then fallback, then empty. Never fails.
    pub async fn load(&self) -> LoadOutcome {
        let primary_err = match self.primary.fetch().await {
            Ok(snapshot) => {
                info(
                    Domain::Source,
                    "loaded",
                    obj(&[
                        ("mode", v_str(Mode::Live.as_str())),
                        ("source", v_str(&self.primary.describe())),
                        ("transactions", v_num(snapshot.transactions.len() as f64)),
                        ("fingerprint", v_str(&snapshot.fingerprint())),
                    ]),
                );
                return LoadOutcome {
                    snapshot,
                    mode: Mode::Live,
                    status: ConnectivityStatus {
                        api_online: true,
                        text: ConnectivityStatus::CONNECTED.to_string(),
                    },
                    error: None,
                };
            }
            Err(e) => e,
        };
        warn(
            Domain::Source,
            "primary_failed",
            obj(&[
                ("msg", v_str("api unavailable, switching to demo mode")),
                ("kind", v_str(primary_err.kind())),
                ("error", v_str(&primary_err.to_string())),
            ]),
        );

        match self.fallback.fetch().await {
            Ok(snapshot) => {
                info(
                    Domain::Source,
                    "loaded",
                    obj(&[
                        ("mode", v_str(Mode::Demo.as_str())),
                        ("source", v_str(&self.fallback.describe())),
                        ("transactions", v_num(snapshot.transactions.len() as f64)),
                        ("fingerprint", v_str(&snapshot.fingerprint())),
                    ]),
                );
                LoadOutcome {
                    snapshot,
                    mode: Mode::Demo,
                    status: ConnectivityStatus {
                        api_online: false,
                        text: ConnectivityStatus::DEMO.to_string(),
                    },
                    error: None,
                }
            }
            Err(fallback_err) => {
                let err = SourceError::Fallback {
                    primary: Box::new(primary_err),
                    fallback: Box::new(fallback_err),
                };
                error(
                    Domain::Source,
                    "fallback_failed",
                    obj(&[("error", v_str(&err.to_string())), ("api_online", v_bool(false))]),
                );
                LoadOutcome {
                    snapshot: Snapshot::empty(),
                    mode: Mode::Demo,
                    status: ConnectivityStatus {
                        api_online: false,
                        text: ConnectivityStatus::DEMO_UNAVAILABLE.to_string(),
                    },
                    error: Some(err),
                }
            }
        }
    }
}

/// Absolute http(s) URL, `file://` URL, or a local path.
///
/// A plain path is read from disk, so the demo snapshot stays reachable when
/// the live host is down. `live` is only used in error context.
pub fn fallback_source(live: &Url, spec: &str, timeout: Duration) -> Result<Box<dyn DataSource>, SourceError> {
    match Url::parse(spec) {
        Ok(url) if url.scheme() == "file" => {
            let path = url
                .to_file_path()
                .map_err(|_| SourceError::transport(spec, "not a local file path"))?;
            Ok(Box::new(FileSource::new(path)))
        }
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
            Ok(Box::new(HttpSource::new(url, timeout)))
        }
        Ok(url) => Err(SourceError::transport(spec, format!("unsupported scheme {}", url.scheme()))),
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Box::new(FileSource::new(spec))),
        Err(e) => Err(SourceError::transport(
            spec,
            format!("invalid fallback for {}: {}", live, e),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct Fixed(Result<Snapshot, SourceError>);

    #[async_trait]
    impl DataSource for Fixed {
        fn describe(&self) -> String {
            "fixed".to_string()
        }

        async fn fetch(&self) -> Result<Snapshot, SourceError> {
            self.0.clone()
        }
    }

    fn one_tx() -> Snapshot {
        Snapshot::from_json(
            r#"{"metrics":[{"title":"X","value":1}],
                "transactions":[{"id":"1","product":"P","date":"2024-01-01T00:00:00Z","amount":10}]}"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_primary_success_is_live() {
        let loader = SnapshotLoader::new(
            Box::new(Fixed(Ok(one_tx()))),
            Box::new(Fixed(Err(SourceError::transport("demo", "unused")))),
        );
        let out = loader.load().await;
        assert_eq!(out.mode, Mode::Live);
        assert!(out.status.api_online);
        assert_eq!(out.status.indicator(), "● LIVE");
        assert!(out.error.is_none());
    }

    #[tokio::test]
    async fn test_primary_failure_uses_fallback() {
        let loader = SnapshotLoader::new(
            Box::new(Fixed(Err(SourceError::parse("api", "trailing garbage")))),
            Box::new(Fixed(Ok(one_tx()))),
        );
        let out = loader.load().await;
        assert_eq!(out.mode, Mode::Demo);
        assert!(!out.status.api_online);
        assert_eq!(out.status.text, ConnectivityStatus::DEMO);
        assert_eq!(out.snapshot, one_tx());
        assert!(out.error.is_none());
    }

    #[tokio::test]
    async fn test_both_failing_yields_empty_demo() {
        let loader = SnapshotLoader::new(
            Box::new(Fixed(Err(SourceError::transport("api", "connection refused")))),
            Box::new(Fixed(Err(SourceError::transport("demo", "not found")))),
        );
        let out = loader.load().await;
        assert_eq!(out.mode, Mode::Demo);
        assert_eq!(out.snapshot, Snapshot::empty());
        assert_eq!(out.status.text, ConnectivityStatus::DEMO_UNAVAILABLE);
        assert!(matches!(out.error, Some(SourceError::Fallback { .. })));
    }

    #[tokio::test]
    async fn test_file_source_reads_and_rejects_garbage() {
        let mut good = tempfile::NamedTempFile::new().unwrap();
        write!(good, r#"{{"transactions":[{{"id":"a","amount":1}}]}}"#).unwrap();
        let snap = FileSource::new(good.path()).fetch().await.unwrap();
        assert_eq!(snap.transactions.len(), 1);

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, "not json").unwrap();
        let err = FileSource::new(bad.path()).fetch().await.unwrap_err();
        assert_eq!(err.kind(), "parse");

        let err = FileSource::new("/definitely/missing.json").fetch().await.unwrap_err();
        assert_eq!(err.kind(), "transport");
    }

    #[test]
    fn test_fallback_resolution() {
        let live = Url::parse("http://127.0.0.1:3000/dashboard").unwrap();
        let t = Duration::from_secs(1);
        assert_eq!(
            fallback_source(&live, "dashboard/data.json", t).unwrap().describe(),
            "dashboard/data.json"
        );
        assert_eq!(
            fallback_source(&live, "./data.json", t).unwrap().describe(),
            "./data.json"
        );
        assert_eq!(
            fallback_source(&live, "https://cdn.example/demo.json", t).unwrap().describe(),
            "https://cdn.example/demo.json"
        );
        assert_eq!(
            fallback_source(&live, "file:///tmp/demo.json", t).unwrap().describe(),
            "/tmp/demo.json"
        );
        assert!(fallback_source(&live, "ftp://host/demo.json", t).is_err());
    }
}
