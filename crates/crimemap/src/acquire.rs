//! Downloading the source data.
//!
//! The incident CSV is fetched into memory on every start. The shapefile
//! archive is fetched and extracted once; an existing cache directory is
//! taken as proof that extraction already happened.

use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};

/// A source of remote bytes.
///
/// The production implementation is [`HttpFetcher`]; tests substitute an
/// in-memory table.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the full body at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server does not answer
    /// with a success status.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetches over HTTP(S) with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher from the source settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(&config.sources.user_agent);

        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        if config.sources.accept_invalid_certs {
            warn!("TLS certificate verification is disabled for source downloads");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(|source| Error::Http {
            url: String::new(),
            source,
        })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let http = |source: reqwest::Error| Error::Http {
            url: url.to_string(),
            source,
        };

        debug!(%url, "GET");
        let response = self.client.get(url).send().await.map_err(http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(http)?;
        debug!(%url, bytes = body.len(), "Download complete");
        Ok(body.to_vec())
    }
}

/// Download the incident CSV.
///
/// # Errors
///
/// Returns an error if the download fails.
pub async fn fetch_incidents(fetcher: &dyn Fetcher, url: &str) -> Result<Vec<u8>> {
    info!(%url, "Downloading incident data");
    fetcher.fetch(url).await
}

/// Make sure the shapefile archive has been extracted into `dir`.
///
/// Returns `true` if a download happened and `false` if `dir` already
/// existed. When the download or extraction fails, the directory created
/// by this call is removed again so the next start retries.
///
/// # Errors
///
/// Returns an error if the directory cannot be created, the download fails,
/// or the archive cannot be extracted.
pub async fn ensure_shapefile(fetcher: &dyn Fetcher, url: &str, dir: &Path) -> Result<bool> {
    if dir.exists() {
        debug!("Shapefile cache present at {}", dir.display());
        return Ok(false);
    }

    std::fs::create_dir_all(dir).map_err(|source| Error::DirectoryCreate {
        path: dir.to_path_buf(),
        source,
    })?;

    info!(%url, "Downloading boundary shapefile");
    let result = match fetcher.fetch(url).await {
        Ok(archive) => {
            let target = dir.to_path_buf();
            tokio::task::spawn_blocking(move || extract_archive(&archive, &target))
                .await
                .map_err(|e| Error::internal(format!("extraction task failed: {e}")))
                .and_then(|r| r)
        }
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        if let Err(cleanup) = std::fs::remove_dir_all(dir) {
            warn!(error = %cleanup, "Failed to remove incomplete shapefile cache");
        }
        return Err(e);
    }

    info!("Extracted shapefile into {}", dir.display());
    Ok(true)
}

/// Extract a ZIP archive held in memory into `dir`.
///
/// # Errors
///
/// Returns an error if the bytes are not a valid archive or a file cannot
/// be written.
pub fn extract_archive(archive: &[u8], dir: &Path) -> Result<()> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))?;
    debug!(entries = zip.len(), "Extracting archive");
    zip.extract(dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves canned bodies and counts requests.
    #[derive(Debug, Default)]
    struct MemoryFetcher {
        bodies: HashMap<String, Vec<u8>>,
        calls: AtomicUsize,
    }

    impl MemoryFetcher {
        fn with(url: &str, body: Vec<u8>) -> Self {
            let mut bodies = HashMap::new();
            bodies.insert(url.to_string(), body);
            Self {
                bodies,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for MemoryFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.bodies.get(url).cloned().ok_or(Error::HttpStatus {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    fn archive_with(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            let options = zip::write::SimpleFileOptions::default();
            for (name, contents) in files {
                writer.start_file(*name, options).unwrap();
                writer.write_all(contents).unwrap();
            }
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    const SHP_URL: &str = "https://example.com/zcta.zip";

    #[tokio::test]
    async fn test_fetch_incidents_returns_body() {
        let fetcher = MemoryFetcher::with("https://example.com/rows.csv", b"zip\n98101\n".to_vec());
        let body = fetch_incidents(&fetcher, "https://example.com/rows.csv")
            .await
            .unwrap();
        assert_eq!(body, b"zip\n98101\n");
    }

    #[tokio::test]
    async fn test_fetch_incidents_propagates_failure() {
        let fetcher = MemoryFetcher::default();
        let result = fetch_incidents(&fetcher, "https://example.com/missing.csv").await;
        assert!(matches!(result, Err(Error::HttpStatus { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_ensure_shapefile_downloads_and_extracts() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("shapefiles");
        let archive = archive_with(&[("zcta.shp", b"shp"), ("zcta.dbf", b"dbf")]);
        let fetcher = MemoryFetcher::with(SHP_URL, archive);

        let downloaded = ensure_shapefile(&fetcher, SHP_URL, &dir).await.unwrap();

        assert!(downloaded);
        assert_eq!(std::fs::read(dir.join("zcta.shp")).unwrap(), b"shp");
        assert_eq!(std::fs::read(dir.join("zcta.dbf")).unwrap(), b"dbf");
    }

    #[tokio::test]
    async fn test_ensure_shapefile_skips_existing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = MemoryFetcher::with(SHP_URL, archive_with(&[("a.shp", b"x")]));

        let downloaded = ensure_shapefile(&fetcher, SHP_URL, tmp.path())
            .await
            .unwrap();

        assert!(!downloaded);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_ensure_shapefile_second_run_is_cached() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("shapefiles");
        let fetcher = MemoryFetcher::with(SHP_URL, archive_with(&[("a.shp", b"x")]));

        assert!(ensure_shapefile(&fetcher, SHP_URL, &dir).await.unwrap());
        assert!(!ensure_shapefile(&fetcher, SHP_URL, &dir).await.unwrap());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_ensure_shapefile_failed_download_removes_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("shapefiles");
        let fetcher = MemoryFetcher::default();

        let result = ensure_shapefile(&fetcher, SHP_URL, &dir).await;

        assert!(result.is_err());
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_ensure_shapefile_corrupt_archive_removes_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("shapefiles");
        let fetcher = MemoryFetcher::with(SHP_URL, b"not a zip archive".to_vec());

        let result = ensure_shapefile(&fetcher, SHP_URL, &dir).await;

        assert!(matches!(result, Err(Error::Archive(_))));
        assert!(!dir.exists());
    }

    #[test]
    fn test_http_fetcher_from_default_config() {
        assert!(HttpFetcher::from_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_http_fetcher_accepts_insecure_option() {
        let mut config = Config::default();
        config.sources.accept_invalid_certs = true;
        config.sources.timeout_secs = Some(5);
        assert!(HttpFetcher::from_config(&config).is_ok());
    }
}
