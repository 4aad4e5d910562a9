// ============================================================
// Layer 6 — Model Artifact Store
// ============================================================
// Persists the fitted pipeline as a single binary blob that both
// the training entry point and the serving side read.
//
// File layout (little-endian):
//
//   offset  size  field
//   0       4     magic  b"HPPM"
//   4       2     format version
//   6       4     CRC-32 of the payload
//   10      8     payload length in bytes
//   18      n     bincode-encoded FittedPipeline
//
// Writes go to a `.tmp` sibling which is then renamed over the
// target, so readers never observe a half-written artifact.
//
// Loading distinguishes three outcomes:
//   Loaded  → the model, ready to predict
//   Absent  → no file at the path
//   Corrupt → a file exists but cannot be trusted
//             (bad magic/version/checksum/payload, or a feature
//             schema that differs from the one compiled in)

use anyhow::Context;
use crc32fast::Hasher;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::domain::features::FEATURE_NAMES;
use crate::error::{PredictorError, Result};
use crate::ml::pipeline::FittedPipeline;

const MAGIC: &[u8; 4] = b"HPPM";
pub const FORMAT_VERSION: u16 = 1;
const HEADER_LEN: usize = 4 + 2 + 4 + 8;

/// Result of reading the artifact path
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Box<FittedPipeline>),
    Absent,
    Corrupt(String),
}

pub struct ArtifactStore {
    path: PathBuf,
}

impl ArtifactStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the model, replacing any existing artifact.
    pub fn save(&self, model: &FittedPipeline) -> anyhow::Result<()> {
        let payload = bincode::encode_to_vec(model, bincode::config::standard())
            .map_err(|e| PredictorError::Serialization(e.to_string()))?;

        let mut hasher = Hasher::new();
        hasher.update(&payload);
        let checksum = hasher.finalize();

        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&checksum.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&payload);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
        }

        let temp_path = self.sibling("tmp");
        if let Err(e) = self.write_then_swap(&temp_path, &bytes) {
            // Never leave a half-written sibling behind
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        tracing::debug!(
            "Saved model artifact to '{}' ({} bytes, crc32 {:08x})",
            self.path.display(),
            bytes.len(),
            checksum
        );
        Ok(())
    }

    /// Read and verify the artifact. Only unexpected I/O failures are errors.
    pub fn load(&self) -> Result<LoadOutcome> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LoadOutcome::Absent),
            Err(e) => return Err(PredictorError::Io(e)),
        };

        Ok(match decode(&bytes) {
            Ok(model) => LoadOutcome::Loaded(Box::new(model)),
            Err(reason) => LoadOutcome::Corrupt(reason),
        })
    }

    /// Load for serving, where a missing or corrupt artifact is fatal
    pub fn load_required(&self) -> Result<FittedPipeline> {
        match self.load()? {
            LoadOutcome::Loaded(model) => Ok(*model),
            LoadOutcome::Absent => Err(PredictorError::ArtifactAbsent { path: self.path.clone() }),
            LoadOutcome::Corrupt(reason) => Err(PredictorError::ArtifactCorrupt {
                path: self.path.clone(),
                reason,
            }),
        }
    }

    /// Move a corrupt artifact aside to `<path>.corrupt` and return the new path
    pub fn quarantine(&self) -> Result<PathBuf> {
        let target = self.sibling("corrupt");
        fs::rename(&self.path, &target)?;
        Ok(target)
    }

    fn write_then_swap(&self, temp_path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
        {
            let mut file = File::create(temp_path)
                .with_context(|| format!("Cannot create '{}'", temp_path.display()))?;
            file.write_all(bytes)
                .with_context(|| format!("Cannot write '{}'", temp_path.display()))?;
            file.sync_all()?;
        }
        fs::rename(temp_path, &self.path).with_context(|| {
            format!("Cannot move artifact into place at '{}'", self.path.display())
        })
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".");
        name.push(suffix);
        PathBuf::from(name)
    }
}

fn decode(bytes: &[u8]) -> std::result::Result<FittedPipeline, String> {
    if bytes.len() < HEADER_LEN {
        return Err(format!("file is {} bytes, shorter than the header", bytes.len()));
    }
    let (header, payload) = bytes.split_at(HEADER_LEN);

    if &header[0..4] != MAGIC {
        return Err("not a model artifact (bad magic)".to_string());
    }
    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != FORMAT_VERSION {
        return Err(format!("unsupported format version {version}"));
    }
    let checksum = u32::from_le_bytes([header[6], header[7], header[8], header[9]]);
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&header[10..18]);
    let expected_len = u64::from_le_bytes(len_bytes);

    if payload.len() as u64 != expected_len {
        return Err(format!(
            "payload is {} bytes, header says {expected_len}",
            payload.len()
        ));
    }

    let mut hasher = Hasher::new();
    hasher.update(payload);
    if hasher.finalize() != checksum {
        return Err("checksum mismatch".to_string());
    }

    let (model, read): (FittedPipeline, usize) =
        bincode::decode_from_slice(payload, bincode::config::standard())
            .map_err(|e| format!("cannot decode payload: {e}"))?;
    if read != payload.len() {
        return Err(format!("{} trailing bytes after the model", payload.len() - read));
    }

    if !model.feature_names().iter().map(String::as_str).eq(FEATURE_NAMES) {
        return Err(format!(
            "feature schema {:?} does not match {:?}",
            model.feature_names(),
            FEATURE_NAMES
        ));
    }
    Ok(model)
}
