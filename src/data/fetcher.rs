// ============================================================
// Layer 4 — Dataset Fetcher
// ============================================================
// Downloads the StatLib California housing archive on first use
// and keeps the extracted `cal_housing.data` in a local data
// directory. Later runs read the cached file without touching
// the network.
//
//   data_home/cal_housing.data present?
//       yes → parse it
//       no  → GET cal_housing.tgz
//             → gunzip + untar CaliforniaHousing/cal_housing.data
//             → write data_home/cal_housing.data (tmp + rename)
//             → parse it
//
// Parsing is the raw StatLib layout of CsvDatasetLoader.

use flate2::read::GzDecoder;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::data::loader::CsvDatasetLoader;
use crate::domain::dataset::Dataset;
use crate::domain::traits::DatasetSource;
use crate::error::{PredictorError, Result};

/// StatLib archive mirror used by scikit-learn's fetcher
pub const ARCHIVE_URL: &str = "https://ndownloader.figshare.com/files/5976036";

/// Path of the data file inside the archive
pub const ARCHIVE_MEMBER: &str = "CaliforniaHousing/cal_housing.data";

/// Name of the extracted file inside the data directory
pub const CACHED_FILE: &str = "cal_housing.data";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

// ─── Transport ────────────────────────────────────────────────────────────────
/// Fetches the raw bytes behind a URL.
pub trait Transport: Send + Sync {
    fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP(S) GET.
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { agent: ureq::AgentBuilder::new().timeout(timeout).build() }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(DOWNLOAD_TIMEOUT)
    }
}

impl Transport for HttpTransport {
    fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| PredictorError::Dataset(format!("download of '{url}' failed: {e}")))?;

        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| PredictorError::Dataset(format!("download of '{url}' was cut short: {e}")))?;
        Ok(body)
    }
}

// ─── StatLibFetcher ───────────────────────────────────────────────────────────
pub struct StatLibFetcher {
    data_home: PathBuf,
    url:       String,
    transport: Box<dyn Transport>,
}

impl StatLibFetcher {
    pub fn new(data_home: impl Into<PathBuf>) -> Self {
        Self {
            data_home: data_home.into(),
            url:       ARCHIVE_URL.to_string(),
            transport: Box::new(HttpTransport::default()),
        }
    }

    pub fn with_transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Where the extracted data file lives once downloaded
    pub fn cached_path(&self) -> PathBuf {
        self.data_home.join(CACHED_FILE)
    }

    fn download_to(&self, target: &Path) -> Result<()> {
        tracing::info!(
            "Downloading California housing from {} to '{}'",
            self.url,
            self.data_home.display()
        );
        let archive = self.transport.download(&self.url)?;
        let data = extract_member(&archive, ARCHIVE_MEMBER)?;

        fs::create_dir_all(&self.data_home)?;
        let tmp = target.with_extension("data.tmp");
        if let Err(e) = fs::write(&tmp, &data).and_then(|()| fs::rename(&tmp, target)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        tracing::info!("Cached {} bytes at '{}'", data.len(), target.display());
        Ok(())
    }
}

impl DatasetSource for StatLibFetcher {
    fn fetch(&self) -> Result<Dataset> {
        let cached = self.cached_path();
        if cached.is_file() {
            tracing::debug!("Using cached dataset '{}'", cached.display());
        } else {
            self.download_to(&cached)?;
        }
        CsvDatasetLoader::new(cached).fetch()
    }
}

/// Read one member out of a gzip-compressed tar archive
fn extract_member(archive: &[u8], member: &str) -> Result<Vec<u8>> {
    let archive_error = |e: std::io::Error| {
        PredictorError::Dataset(format!("cannot unpack dataset archive: {e}"))
    };

    let mut tar = tar::Archive::new(GzDecoder::new(archive));
    for entry in tar.entries().map_err(archive_error)? {
        let mut entry = entry.map_err(archive_error)?;
        let is_member = entry.path().map_err(archive_error)? == Path::new(member);
        if is_member {
            let mut data = Vec::new();
            entry.read_to_end(&mut data).map_err(archive_error)?;
            return Ok(data);
        }
    }
    Err(PredictorError::Dataset(format!("dataset archive has no member '{member}'")))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    const ROWS: &str = "-122.23,37.88,41,880,129,322,126,8.3252,452600\n\
                        -122.22,37.86,21,7099,1106,2401,1138,8.3014,358500\n";

    fn archive(member: &str, contents: &[u8]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, member, contents).unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    /// Serves fixed bytes and counts requests
    struct Canned {
        body:  std::result::Result<Vec<u8>, String>,
        calls: Arc<AtomicUsize>,
    }

    impl Transport for Canned {
        fn download(&self, _url: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.body.clone().map_err(PredictorError::Dataset)
        }
    }

    fn fetcher(dir: &Path, body: std::result::Result<Vec<u8>, String>) -> (StatLibFetcher, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = StatLibFetcher::new(dir)
            .with_transport(Box::new(Canned { body, calls: calls.clone() }));
        (fetcher, calls)
    }

    #[test]
    fn test_downloads_once_then_reads_cache() {
        let dir = tempdir().unwrap();
        let (fetcher, calls) = fetcher(dir.path(), Ok(archive(ARCHIVE_MEMBER, ROWS.as_bytes())));

        let first = fetcher.fetch().unwrap();
        assert_eq!(first.len(), 2);
        assert!((first.targets[0] - 4.526).abs() < 1e-12);
        assert_eq!(fs::read_to_string(fetcher.cached_path()).unwrap(), ROWS);

        let second = fetcher.fetch().unwrap();
        assert_eq!(second, first);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_existing_cache_skips_download() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CACHED_FILE), ROWS).unwrap();
        let (fetcher, calls) = fetcher(dir.path(), Err("offline".into()));

        assert_eq!(fetcher.fetch().unwrap().len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_download_failure_is_fatal_and_caches_nothing() {
        let dir = tempdir().unwrap();
        let (fetcher, _) = fetcher(dir.path(), Err("connection refused".into()));

        let err = fetcher.fetch().unwrap_err();
        assert!(matches!(err, PredictorError::Dataset(_)));
        assert!(err.to_string().contains("connection refused"));
        assert!(!fetcher.cached_path().exists());
    }

    #[test]
    fn test_archive_without_member_is_fatal() {
        let dir = tempdir().unwrap();
        let (fetcher, _) = fetcher(dir.path(), Ok(archive("README", b"nothing here")));

        let err = fetcher.fetch().unwrap_err();
        assert!(err.to_string().contains(ARCHIVE_MEMBER));
        assert!(!fetcher.cached_path().exists());
    }

    #[test]
    fn test_non_gzip_body_is_fatal() {
        let dir = tempdir().unwrap();
        let (fetcher, _) = fetcher(dir.path(), Ok(b"<html>rate limited</html>".to_vec()));
        assert!(matches!(fetcher.fetch().unwrap_err(), PredictorError::Dataset(_)));
    }
}
