use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::artifact::{self, ArtifactManifest, MANIFEST_FILE};

/// Environment variable overriding the cache root; models live in `$SPAMSIFT_CACHE/models`
pub const CACHE_ENV_VAR: &str = "SPAMSIFT_CACHE";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),
    #[error("Verification failed for {0}")]
    VerificationFailed(String),
    #[error("Hash mismatch: expected {expected}, got {actual} for {file}")]
    HashMismatch {
        file: String,
        expected: String,
        actual: String,
    },
}

/// Computes the lowercase hex SHA-256 digest of a file
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(sha256_hex(&bytes))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// A local directory holding one spam classifier artifact
#[derive(Clone, Debug)]
pub struct ModelStore {
    models_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ModelStore {
    /// Creates a new ModelStore with the default models directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_models_dir())
    }

    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        Self::models_dir_from(env::var(CACHE_ENV_VAR).ok())
    }

    fn models_dir_from(cache_override: Option<String>) -> PathBuf {
        // 1. Explicit cache directory
        if let Some(path) = cache_override {
            return PathBuf::from(path).join("models");
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("spamsift").join("models");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("spamsift").join("models");
        }

        // 4. If all else fails, use system temp directory
        env::temp_dir().join("spamsift").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.models_dir.join(MANIFEST_FILE)
    }

    pub fn is_artifact_present(&self) -> bool {
        let manifest_path = self.manifest_path();
        log::info!("Checking for model artifact at {:?} (exists: {})", manifest_path, manifest_path.exists());
        manifest_path.exists()
    }

    pub fn verify_file(&self, path: &Path, expected_hash: &str) -> Result<bool, StoreError> {
        log::info!("Verifying file: {:?}", path);
        let hash = sha256_file(path)?;
        log::info!("Calculated hash: {}", hash);
        log::info!("Expected hash:   {}", expected_hash);
        Ok(hash.eq_ignore_ascii_case(expected_hash))
    }

    /// Checks that the manifest parses and every referenced file exists and matches its declared hash
    pub fn verify_artifact(&self) -> Result<bool, StoreError> {
        if !self.is_artifact_present() {
            log::info!("No manifest in {:?}", self.models_dir);
            return Ok(false);
        }
        let manifest = self.read_manifest()?;
        for (file, hash) in manifest.referenced_files() {
            let path = artifact::resolve(&self.models_dir, file);
            if !path.exists() {
                log::info!("Referenced file {:?} does not exist", path);
                return Ok(false);
            }
            if let Some(expected) = hash {
                if !self.verify_file(&path, expected)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    fn read_manifest(&self) -> Result<ArtifactManifest, StoreError> {
        ArtifactManifest::from_file(self.manifest_path())
            .map_err(|e| StoreError::InvalidManifest(e.to_string()))
    }

    /// Downloads `{base_url}/manifest.json` and every file it references into the store.
    /// Referenced files with a declared hash are verified before they are written. On
    /// failure every file written by this call is removed again.
    pub async fn download_artifact(&self, base_url: &str) -> Result<(), StoreError> {
        let _lock = self.download_lock.lock().await;
        let base_url = base_url.trim_end_matches('/');

        fs::create_dir_all(&self.models_dir)?;
        let mut written = Vec::new();
        let result = self.download_all(base_url, &mut written).await;
        if let Err(e) = &result {
            log::error!("Failed to download model artifact: {}", e);
            Self::discard(&written);
        }
        result
    }

    async fn download_all(&self, base_url: &str, written: &mut Vec<PathBuf>) -> Result<(), StoreError> {
        let manifest_url = format!("{}/{}", base_url, MANIFEST_FILE);
        let manifest_bytes = Self::fetch(&manifest_url).await?;
        let manifest: ArtifactManifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| StoreError::InvalidManifest(e.to_string()))?;

        for (file, hash) in manifest.referenced_files() {
            if Path::new(file).is_absolute() || file.contains("..") {
                return Err(StoreError::InvalidManifest(format!("Refusing to download to {}", file)));
            }
            let url = format!("{}/{}", base_url, file);
            let path = self.models_dir.join(file);
            self.download_and_verify_file(&url, &path, hash, written).await?;
        }

        // Written last so a partial download never looks like a complete artifact
        fs::write(self.manifest_path(), &manifest_bytes)?;
        log::info!("Model artifact '{}' ready in {:?}", manifest.name, self.models_dir);
        Ok(())
    }

    fn discard(written: &[PathBuf]) {
        for path in written {
            match fs::remove_file(path) {
                Ok(()) => log::info!("Removed partial download {:?}", path),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Could not remove partial download {:?}: {}", path, e),
            }
        }
    }

    async fn fetch(url: &str) -> Result<Vec<u8>, StoreError> {
        log::info!("Downloading {}", url);
        let response = reqwest::get(url).await?.error_for_status()?;
        log::info!("Download response status: {}", response.status());
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }

    async fn download_and_verify_file(
        &self,
        url: &str,
        path: &Path,
        expected_hash: Option<&str>,
        written: &mut Vec<PathBuf>,
    ) -> Result<(), StoreError> {
        let bytes = Self::fetch(url).await?;

        if let Some(expected) = expected_hash {
            let hash = sha256_hex(&bytes);
            if !hash.eq_ignore_ascii_case(expected) {
                log::error!("Hash mismatch for {}: expected {}, got {}", url, expected, hash);
                return Err(StoreError::HashMismatch {
                    file: path.display().to_string(),
                    expected: expected.to_string(),
                    actual: hash,
                });
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        log::info!("Writing {} bytes to {:?}", bytes.len(), path);
        written.push(path.to_path_buf());
        fs::write(path, &bytes)?;

        if let Some(expected) = expected_hash {
            if !self.verify_file(path, expected)? {
                return Err(StoreError::VerificationFailed(path.display().to_string()));
            }
        }
        Ok(())
    }

    /// Removes the manifest and the files it references
    pub fn remove_artifact(&self) -> Result<(), StoreError> {
        if let Ok(manifest) = self.read_manifest() {
            for (file, _) in manifest.referenced_files() {
                let path = artifact::resolve(&self.models_dir, file);
                if path.exists() {
                    fs::remove_file(&path)?;
                }
            }
        }
        let manifest_path = self.manifest_path();
        if manifest_path.exists() {
            fs::remove_file(&manifest_path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONNX_MANIFEST: &str = r#"{
        "name": "spam-test",
        "backend": {
            "kind": "onnx",
            "model_file": "model.onnx",
            "tokenizer_file": "tokenizer.json",
            "model_sha256": "HASH",
            "capability": {"kind": "labels", "output": "label"}
        }
    }"#;

    #[test]
    fn test_default_models_dir() {
        let path = ModelStore::models_dir_from(Some("/tmp/test-spamsift-cache".into()));
        assert_eq!(path, PathBuf::from("/tmp/test-spamsift-cache/models"));

        let path = ModelStore::models_dir_from(None);
        assert!(path.ends_with("spamsift/models"));
    }

    #[test]
    fn test_discard_removes_written_files() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let written = vec![dir.path().join("model.onnx"), dir.path().join("never-written.json")];
        fs::write(&written[0], b"partial")?;

        ModelStore::discard(&written);
        assert_eq!(fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_sha256() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_verify_artifact() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let store = ModelStore::new(dir.path())?;
        assert!(!store.is_artifact_present());
        assert!(!store.verify_artifact()?);

        fs::write(dir.path().join("model.onnx"), b"model bytes")?;
        fs::write(dir.path().join("tokenizer.json"), b"{}")?;
        let hash = sha256_hex(b"model bytes");
        fs::write(store.manifest_path(), ONNX_MANIFEST.replace("HASH", &hash))?;
        assert!(store.verify_artifact()?);

        // Corrupt file and verify
        fs::write(dir.path().join("model.onnx"), b"corrupted data")?;
        assert!(!store.verify_artifact()?);

        store.remove_artifact()?;
        assert!(!store.is_artifact_present());
        assert!(!dir.path().join("model.onnx").exists());
        assert!(!dir.path().join("tokenizer.json").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_download_from_unreachable_host() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let store = ModelStore::new(dir.path())?;
        let result = store.download_artifact("http://127.0.0.1:9/spam-model").await;
        assert!(matches!(result, Err(StoreError::DownloadError(_))));
        assert!(!store.is_artifact_present());
        Ok(())
    }
}
